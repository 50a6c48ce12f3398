use std::time::Duration;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::db::models::{Submission, User};
use crate::db::types::TaskType;
use crate::repositories;
use crate::schemas::submission::{SubmissionDetailResponse, SubmissionResponse};
use crate::services::engine::{self, TaskAccess};
use crate::services::grading::{self, FileRef, SubmissionPayload};
use crate::services::storage::StorageService;

pub(crate) fn sanitized_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    if sanitized.is_empty() {
        "upload".to_string()
    } else {
        sanitized
    }
}

/// Records an uploaded file as an attempt. When the engine refuses it the
/// object is removed again so storage only holds files that have a submission.
pub(crate) async fn submit_stored_file(
    state: &AppState,
    user: &User,
    access: &TaskAccess,
    storage: &StorageService,
    file: FileRef,
) -> Result<Submission, ApiError> {
    let key = file.key.clone();
    match engine::submit_with_access(state, user, access, SubmissionPayload::File(file)).await {
        Ok(submission) => Ok(submission),
        Err(err) => {
            match storage.delete_object(&key).await {
                Ok(()) => tracing::info!(key = %key, "Removed file of a refused submission"),
                Err(cleanup) => tracing::warn!(
                    error = %cleanup,
                    key = %key,
                    "Failed to remove file of a refused submission"
                ),
            }
            Err(err.into())
        }
    }
}

pub(crate) async fn fetch_submission(
    pool: &sqlx::PgPool,
    submission_id: &str,
) -> Result<Submission, ApiError> {
    repositories::submissions::find_by_id(pool, submission_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))
}

/// Attaches per-question marks for tests and a short-lived download link for files.
pub(crate) async fn to_detail_response(
    state: &AppState,
    submission: Submission,
) -> Result<SubmissionDetailResponse, ApiError> {
    let task = repositories::tasks::find_by_id(state.db(), &submission.task_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch task"))?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let questions = if task.task_type == TaskType::Test {
        let questions = repositories::tasks::list_questions(state.db(), &task.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch task questions"))?;
        grading::review_answers(&questions, submission.answers.as_ref().map(|answers| &answers.0))
    } else {
        Vec::new()
    };

    let file_url = match (&submission.file_key, state.storage()) {
        (Some(key), Some(storage)) => {
            let minutes = state.settings().storage().presigned_url_expire_minutes;
            match storage.presign_get(key, Duration::from_secs(minutes * 60)).await {
                Ok(url) => Some(url),
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        submission_id = %submission.id,
                        "Failed to presign submission file"
                    );
                    None
                }
            }
        }
        _ => None,
    };

    let file_sha256 = submission.file_sha256.clone();
    let mime_type = submission.mime_type.clone();
    Ok(SubmissionDetailResponse {
        submission: SubmissionResponse::from_db(submission),
        questions,
        file_sha256,
        mime_type,
        file_url,
    })
}
