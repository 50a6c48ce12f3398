use axum::{
    extract::{Path, Query, State},
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::pagination::{PageQuery, PaginatedResponse};
use crate::core::state::AppState;
use crate::db::models::User;
use crate::repositories;
use crate::schemas::submission::{ReviewRequest, SubmissionDetailResponse, SubmissionResponse};
use crate::services::engine;
use crate::services::grading::ReviewDecision;

pub(super) async fn list_pending(
    Query(params): Query<PageQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<SubmissionResponse>>, ApiError> {
    let (skip, limit) = params.bounds();
    let (items, total_count) = repositories::submissions::list_pending(state.db(), skip, limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list pending submissions"))?;

    Ok(Json(PaginatedResponse {
        items: items.into_iter().map(SubmissionResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

/// Readable by the submitting learner and by admins.
pub(super) async fn get_submission(
    Path(submission_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SubmissionDetailResponse>, ApiError> {
    let submission = super::helpers::fetch_submission(state.db(), &submission_id).await?;
    if submission.user_id != user.id && !user.is_admin() {
        return Err(ApiError::Forbidden("Access denied"));
    }

    Ok(Json(super::helpers::to_detail_response(&state, submission).await?))
}

pub(super) async fn approve_submission(
    Path(submission_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    payload: Option<Json<ReviewRequest>>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    review(state, admin, submission_id, ReviewDecision::Approve, payload).await
}

pub(super) async fn reject_submission(
    Path(submission_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    payload: Option<Json<ReviewRequest>>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    review(state, admin, submission_id, ReviewDecision::Reject, payload).await
}

async fn review(
    state: AppState,
    admin: User,
    submission_id: String,
    decision: ReviewDecision,
    payload: Option<Json<ReviewRequest>>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let submission = engine::review(
        &state,
        &admin,
        &submission_id,
        decision,
        payload.feedback.as_deref(),
    )
    .await?;
    Ok(Json(SubmissionResponse::from_db(submission)))
}
