use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::pagination::PaginatedResponse;
use crate::api::validation::validate_submission_upload;
use crate::core::state::AppState;
use crate::db::types::TaskType;
use crate::repositories;
use crate::schemas::submission::{MySubmissionsQuery, SubmissionResponse, SubmitRequest};
use crate::services::engine::{self, EngineError};
use crate::services::grading::FileRef;
use crate::services::storage::submission_object_key;

pub(super) async fn submit_answer(
    Path(task_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let payload = payload.into_payload().ok_or_else(|| ApiError::Unprocessable {
        code: "invalid_payload",
        detail: "Provide exactly one of answers or text_content".to_string(),
    })?;

    let submission = engine::submit(&state, &user, &task_id, payload).await?;
    Ok((StatusCode::CREATED, Json(SubmissionResponse::from_db(submission))))
}

pub(super) async fn submit_file(
    Path(task_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    engine::check_submit_rate(&state, &user, &task_id).await?;
    let access = engine::ensure_task_access(&state, &user, &task_id).await?;
    if access.task.task_type != TaskType::File {
        return Err(EngineError::InvalidPayload(format!(
            "{} tasks do not accept file uploads",
            access.task.task_type.as_str()
        ))
        .into());
    }

    // Skip the upload entirely when the attempt would be refused anyway.
    if !access.task.allow_resubmission {
        let current = repositories::submissions::find_current_for_tasks(
            state.db(),
            &user.id,
            std::slice::from_ref(&access.task.id),
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch prior submissions"))?;
        if !current.is_empty() {
            return Err(EngineError::DuplicateSubmission.into());
        }
    }

    let storage = state
        .storage()
        .ok_or_else(|| ApiError::ServiceUnavailable("File storage is not configured".to_string()))?;

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut content_type: Option<String> = None;
    let max_bytes = state.settings().storage().max_upload_bytes();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        filename = field.file_name().map(|s| s.to_string());
        content_type = field.content_type().map(|s| s.to_string());
        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
        {
            let next_size = bytes.len() as u64 + chunk.len() as u64;
            if next_size > max_bytes {
                return Err(ApiError::BadRequest(format!(
                    "File size exceeds {}MB limit",
                    state.settings().storage().max_upload_size_mb
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        file_bytes = Some(bytes);
    }

    let file_bytes =
        file_bytes.ok_or_else(|| ApiError::BadRequest("File is required".to_string()))?;
    if file_bytes.is_empty() {
        return Err(ApiError::BadRequest("File is empty".to_string()));
    }
    let filename = filename.unwrap_or_else(|| "upload".to_string());
    let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
    validate_submission_upload(
        &filename,
        &content_type,
        &state.settings().storage().allowed_submission_extensions,
    )?;

    let key = submission_object_key(
        &user.id,
        &access.task.id,
        &Uuid::new_v4().to_string(),
        &super::helpers::sanitized_filename(&filename),
    );
    let stored = storage
        .put_submission_file(key, &content_type, file_bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to upload file to storage"))?;
    tracing::info!(
        user_id = %user.id,
        task_id = %access.task.id,
        key = %stored.key,
        size = stored.size,
        "Submission file stored"
    );

    let file = FileRef {
        key: stored.key,
        name: filename,
        size: stored.size,
        sha256: stored.sha256,
        mime_type: content_type,
    };
    let submission =
        super::helpers::submit_stored_file(&state, &user, &access, storage, file).await?;
    Ok((StatusCode::CREATED, Json(SubmissionResponse::from_db(submission))))
}

pub(super) async fn get_my_submissions(
    Query(params): Query<MySubmissionsQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<SubmissionResponse>>, ApiError> {
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 1000);

    let (items, total_count) = repositories::submissions::list_for_user(
        state.db(),
        &user.id,
        params.task_id.as_deref(),
        skip,
        limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;

    Ok(Json(PaginatedResponse {
        items: items.into_iter().map(SubmissionResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}
