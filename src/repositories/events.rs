use sqlx::{PgConnection, PgPool};
use time::PrimitiveDateTime;

use crate::db::models::EngineEvent;
use crate::db::types::EventSubject;

pub(crate) struct NewEvent<'a> {
    pub(crate) user_id: &'a str,
    pub(crate) subject: EventSubject,
    pub(crate) subject_id: &'a str,
    pub(crate) submission_id: Option<&'a str>,
    pub(crate) old_state: Option<&'a str>,
    pub(crate) new_state: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn append(conn: &mut PgConnection, event: NewEvent<'_>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO engine_events (
            user_id, subject, subject_id, submission_id, old_state, new_state, created_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7)
         RETURNING id",
    )
    .bind(event.user_id)
    .bind(event.subject)
    .bind(event.subject_id)
    .bind(event.submission_id)
    .bind(event.old_state)
    .bind(event.new_state)
    .bind(event.created_at)
    .fetch_one(conn)
    .await
}

pub(crate) async fn list_after(
    pool: &PgPool,
    after_id: i64,
    limit: i64,
) -> Result<Vec<EngineEvent>, sqlx::Error> {
    sqlx::query_as::<_, EngineEvent>(
        "SELECT id, user_id, subject, subject_id, submission_id, old_state, new_state, created_at
         FROM engine_events
         WHERE id > $1
         ORDER BY id
         LIMIT $2",
    )
    .bind(after_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
