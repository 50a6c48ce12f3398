use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::core::state::AppState;
use crate::db::types::TaskType;
use crate::repositories;
use crate::schemas::task::{TaskResponse, TaskStatsResponse};
use crate::services::engine;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:task_id", get(get_task))
        .route("/:task_id/stats", get(get_task_stats))
}

async fn get_task(
    Path(task_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<TaskResponse>, ApiError> {
    let access = engine::ensure_task_access(&state, &user, &task_id).await?;

    let questions = if access.task.task_type == TaskType::Test {
        repositories::tasks::list_questions(state.db(), &access.task.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch task questions"))?
    } else {
        Vec::new()
    };

    Ok(Json(TaskResponse::from_db(access.task, access.linked_video_ids, questions)))
}

async fn get_task_stats(
    Path(task_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<TaskStatsResponse>, ApiError> {
    repositories::tasks::find_by_id(state.db(), &task_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch task"))?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let row = repositories::submissions::task_stats(state.db(), &task_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to compute task statistics"))?;

    Ok(Json(TaskStatsResponse::from_row(task_id, row)))
}
