use sqlx::{PgConnection, PgPool};
use time::PrimitiveDateTime;

use crate::db::models::{TaskCompletion, VideoCompletion};

/// Returns true when the record did not exist before.
pub(crate) async fn upsert_video_completion(
    conn: &mut PgConnection,
    user_id: &str,
    video_id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "INSERT INTO video_completions (user_id, video_id, completed_at)
         VALUES ($1,$2,$3)
         ON CONFLICT (user_id, video_id) DO UPDATE SET completed_at = EXCLUDED.completed_at
         RETURNING (xmax = 0)",
    )
    .bind(user_id)
    .bind(video_id)
    .bind(now)
    .fetch_one(conn)
    .await
}

pub(crate) async fn upsert_task_completion(
    conn: &mut PgConnection,
    user_id: &str,
    task_id: &str,
    score: Option<i32>,
    total: Option<i32>,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "INSERT INTO task_completions (user_id, task_id, score, total, completed_at)
         VALUES ($1,$2,$3,$4,$5)
         ON CONFLICT (user_id, task_id) DO UPDATE
         SET score = EXCLUDED.score,
             total = EXCLUDED.total,
             completed_at = EXCLUDED.completed_at
         RETURNING (xmax = 0)",
    )
    .bind(user_id)
    .bind(task_id)
    .bind(score)
    .bind(total)
    .bind(now)
    .fetch_one(conn)
    .await
}

pub(crate) async fn list_video_completions(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<VideoCompletion>, sqlx::Error> {
    sqlx::query_as::<_, VideoCompletion>(
        "SELECT user_id, video_id, completed_at
         FROM video_completions
         WHERE user_id = $1
         ORDER BY completed_at",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_task_completions(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<TaskCompletion>, sqlx::Error> {
    sqlx::query_as::<_, TaskCompletion>(
        "SELECT user_id, task_id, score, total, completed_at
         FROM task_completions
         WHERE user_id = $1
         ORDER BY completed_at",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn is_video_completed(
    pool: &PgPool,
    user_id: &str,
    video_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM video_completions WHERE user_id = $1 AND video_id = $2)",
    )
    .bind(user_id)
    .bind(video_id)
    .fetch_one(pool)
    .await
}
