use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::event::{EventPage, EventResponse, EventsQuery};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(list_events))
}

/// Outbox feed for the notification fan-out. Callers resume from `next_after_id`.
async fn list_events(
    Query(params): Query<EventsQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<EventPage>, ApiError> {
    let after_id = params.after_id.max(0);
    let limit = params.limit.clamp(1, 1000);

    let events = repositories::events::list_after(state.db(), after_id, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch events"))?;
    let next_after_id = events.last().map_or(after_id, |event| event.id);

    Ok(Json(EventPage {
        items: events.into_iter().map(EventResponse::from_db).collect(),
        next_after_id,
    }))
}
