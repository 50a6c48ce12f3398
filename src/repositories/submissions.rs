use std::collections::HashMap;

use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use time::PrimitiveDateTime;

use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;

const COLUMNS: &str = "\
    id, user_id, task_id, attempt_number, is_current, status, answers, text_content, \
    file_key, file_name, file_size, file_sha256, mime_type, score, total, feedback, \
    reviewed_by, reviewed_at, submitted_at, updated_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    submission_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(submission_id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_current_for_tasks(
    pool: &PgPool,
    user_id: &str,
    task_ids: &[String],
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions
         WHERE user_id = $1 AND task_id = ANY($2) AND is_current"
    ))
    .bind(user_id)
    .bind(task_ids)
    .fetch_all(pool)
    .await
}

pub(crate) async fn lock_current(
    conn: &mut PgConnection,
    user_id: &str,
    task_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions
         WHERE user_id = $1 AND task_id = $2 AND is_current
         FOR UPDATE"
    ))
    .bind(user_id)
    .bind(task_id)
    .fetch_optional(conn)
    .await
}

pub(crate) async fn lock_by_id(
    conn: &mut PgConnection,
    submission_id: &str,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions WHERE id = $1 FOR UPDATE"
    ))
    .bind(submission_id)
    .fetch_optional(conn)
    .await
}

pub(crate) async fn retire(
    conn: &mut PgConnection,
    submission_id: &str,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE submissions SET is_current = FALSE, updated_at = $1 WHERE id = $2")
        .bind(now)
        .bind(submission_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub(crate) struct CreateSubmission<'a> {
    pub(crate) id: &'a str,
    pub(crate) user_id: &'a str,
    pub(crate) task_id: &'a str,
    pub(crate) attempt_number: i32,
    pub(crate) status: SubmissionStatus,
    pub(crate) answers: Option<&'a HashMap<String, i32>>,
    pub(crate) text_content: Option<&'a str>,
    pub(crate) file_key: Option<&'a str>,
    pub(crate) file_name: Option<&'a str>,
    pub(crate) file_size: Option<i64>,
    pub(crate) file_sha256: Option<&'a str>,
    pub(crate) mime_type: Option<&'a str>,
    pub(crate) score: Option<i32>,
    pub(crate) total: Option<i32>,
    pub(crate) submitted_at: PrimitiveDateTime,
}

pub(crate) async fn insert(
    conn: &mut PgConnection,
    params: CreateSubmission<'_>,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "INSERT INTO submissions (
            id, user_id, task_id, attempt_number, is_current, status, answers, text_content,
            file_key, file_name, file_size, file_sha256, mime_type, score, total,
            submitted_at, updated_at
         ) VALUES ($1,$2,$3,$4,TRUE,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$15)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.task_id)
    .bind(params.attempt_number)
    .bind(params.status)
    .bind(params.answers.map(Json))
    .bind(params.text_content)
    .bind(params.file_key)
    .bind(params.file_name)
    .bind(params.file_size)
    .bind(params.file_sha256)
    .bind(params.mime_type)
    .bind(params.score)
    .bind(params.total)
    .bind(params.submitted_at)
    .fetch_one(conn)
    .await
}

pub(crate) async fn record_review(
    conn: &mut PgConnection,
    submission_id: &str,
    status: SubmissionStatus,
    feedback: Option<&str>,
    reviewer_id: &str,
    now: PrimitiveDateTime,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions
         SET status = $1, feedback = $2, reviewed_by = $3, reviewed_at = $4, updated_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}"
    ))
    .bind(status)
    .bind(feedback)
    .bind(reviewer_id)
    .bind(now)
    .bind(submission_id)
    .fetch_one(conn)
    .await
}

pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
    task_id: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<(Vec<Submission>, i64), sqlx::Error> {
    let items = sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions
         WHERE user_id = $1 AND ($2::varchar IS NULL OR task_id = $2)
         ORDER BY submitted_at DESC, attempt_number DESC
         OFFSET $3 LIMIT $4"
    ))
    .bind(user_id)
    .bind(task_id)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM submissions WHERE user_id = $1 AND ($2::varchar IS NULL OR task_id = $2)",
    )
    .bind(user_id)
    .bind(task_id)
    .fetch_one(pool)
    .await?;

    Ok((items, total))
}

pub(crate) async fn list_pending(
    pool: &PgPool,
    skip: i64,
    limit: i64,
) -> Result<(Vec<Submission>, i64), sqlx::Error> {
    let items = sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions
         WHERE status = $1 AND is_current
         ORDER BY submitted_at
         OFFSET $2 LIMIT $3"
    ))
    .bind(SubmissionStatus::Pending)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM submissions WHERE status = $1 AND is_current",
    )
    .bind(SubmissionStatus::Pending)
    .fetch_one(pool)
    .await?;

    Ok((items, total))
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct TaskStatsRow {
    pub(crate) total: i64,
    pub(crate) pending: i64,
    pub(crate) approved: i64,
    pub(crate) rejected: i64,
    pub(crate) average_percent: Option<f64>,
}

/// Counts cover current attempts only; superseded history is ignored.
pub(crate) async fn task_stats(pool: &PgPool, task_id: &str) -> Result<TaskStatsRow, sqlx::Error> {
    sqlx::query_as::<_, TaskStatsRow>(
        "SELECT COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'approved') AS approved,
                COUNT(*) FILTER (WHERE status = 'rejected') AS rejected,
                AVG(score::float8 * 100.0 / total::float8)
                    FILTER (WHERE score IS NOT NULL AND total > 0) AS average_percent
         FROM submissions
         WHERE task_id = $1 AND is_current",
    )
    .bind(task_id)
    .fetch_one(pool)
    .await
}
