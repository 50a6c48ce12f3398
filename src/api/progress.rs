use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::format_primitive;
use crate::schemas::progress::{
    CategoryProgressResponse, ProgressSnapshotResponse, VideoCompletionResponse,
};
use crate::services::engine;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_my_progress))
        .route("/videos/:video_id/complete", post(complete_video))
        .route("/categories/:category_id", get(get_category_progress))
}

async fn complete_video(
    Path(video_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<VideoCompletionResponse>, ApiError> {
    let outcome = engine::mark_video_completed(&state, &user, &video_id).await?;
    Ok(Json(VideoCompletionResponse {
        video_id: outcome.video_id,
        newly_completed: outcome.newly_completed,
        completed_at: format_primitive(outcome.completed_at),
    }))
}

async fn get_my_progress(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ProgressSnapshotResponse>, ApiError> {
    let snapshot = engine::progress_snapshot(&state, &user).await?;
    Ok(Json(ProgressSnapshotResponse::from_snapshot(snapshot)))
}

async fn get_category_progress(
    Path(category_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<CategoryProgressResponse>, ApiError> {
    let progress = engine::category_progress(&state, &user, &category_id).await?;
    Ok(Json(CategoryProgressResponse::new(category_id, progress)))
}
