use sqlx::PgPool;

use crate::db::models::{Task, TaskQuestion};

const COLUMNS: &str =
    "id, title, description, task_type, allow_resubmission, requires_approval, created_at";
const QUESTION_COLUMNS: &str = "id, task_id, question, options, correct_answer, order_index";

pub(crate) async fn find_by_id(pool: &PgPool, task_id: &str) -> Result<Option<Task>, sqlx::Error> {
    sqlx::query_as::<_, Task>(&format!("SELECT {COLUMNS} FROM tasks WHERE id = $1"))
        .bind(task_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_questions(
    pool: &PgPool,
    task_id: &str,
) -> Result<Vec<TaskQuestion>, sqlx::Error> {
    sqlx::query_as::<_, TaskQuestion>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM task_questions WHERE task_id = $1 ORDER BY order_index, id"
    ))
    .bind(task_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_linked_video_ids(
    pool: &PgPool,
    task_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT video_id FROM task_videos WHERE task_id = $1 ORDER BY video_id",
    )
    .bind(task_id)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct LinkedTask {
    pub(crate) video_id: String,
    #[sqlx(flatten)]
    pub(crate) task: Task,
}

pub(crate) async fn list_for_videos(
    pool: &PgPool,
    video_ids: &[String],
) -> Result<Vec<LinkedTask>, sqlx::Error> {
    sqlx::query_as::<_, LinkedTask>(
        "SELECT tv.video_id,
                t.id, t.title, t.description, t.task_type,
                t.allow_resubmission, t.requires_approval, t.created_at
         FROM task_videos tv
         JOIN tasks t ON t.id = tv.task_id
         WHERE tv.video_id = ANY($1)
         ORDER BY tv.video_id, t.created_at, t.id",
    )
    .bind(video_ids)
    .fetch_all(pool)
    .await
}
