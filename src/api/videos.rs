use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::catalog::VideoResponse;
use crate::services::engine;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/:video_id", get(get_video))
}

async fn get_video(
    Path(video_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<VideoResponse>, ApiError> {
    let mut video = engine::ensure_video_access(&state, &user, &video_id).await?;

    if let Err(err) = repositories::catalog::increment_view_count(state.db(), &video.id).await {
        tracing::warn!(error = %err, video_id = %video.id, "Failed to count video view");
    } else {
        video.view_count += 1;
    }

    let completed = repositories::progress::is_video_completed(state.db(), &user.id, &video.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch video progress"))?;
    let tasks = repositories::tasks::list_for_videos(state.db(), std::slice::from_ref(&video.id))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch linked tasks"))?
        .into_iter()
        .map(|linked| linked.task)
        .collect();

    Ok(Json(VideoResponse::from_db(video, completed, tasks)))
}
