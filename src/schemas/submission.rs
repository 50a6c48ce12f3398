use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::{format_optional, format_primitive};
use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;
use crate::services::grading::{QuestionReview, SubmissionPayload};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitRequest {
    #[serde(default)]
    pub(crate) answers: Option<HashMap<String, i32>>,
    #[serde(default)]
    #[validate(length(max = 20000, message = "text_content is too long"))]
    pub(crate) text_content: Option<String>,
}

impl SubmitRequest {
    /// Exactly one of `answers` or `text_content` must be present.
    pub(crate) fn into_payload(self) -> Option<SubmissionPayload> {
        match (self.answers, self.text_content) {
            (Some(answers), None) => Some(SubmissionPayload::Answers(answers)),
            (None, Some(text)) => Some(SubmissionPayload::Text(text)),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct ReviewRequest {
    #[serde(default)]
    #[validate(length(max = 5000, message = "feedback is too long"))]
    pub(crate) feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MySubmissionsQuery {
    #[serde(default)]
    pub(crate) task_id: Option<String>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) task_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) is_current: bool,
    pub(crate) status: SubmissionStatus,
    pub(crate) score: Option<i32>,
    pub(crate) total: Option<i32>,
    pub(crate) text_content: Option<String>,
    pub(crate) file_name: Option<String>,
    pub(crate) file_size: Option<i64>,
    pub(crate) feedback: Option<String>,
    pub(crate) reviewed_by: Option<String>,
    pub(crate) reviewed_at: Option<String>,
    pub(crate) submitted_at: String,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: Submission) -> Self {
        Self {
            id: submission.id,
            user_id: submission.user_id,
            task_id: submission.task_id,
            attempt_number: submission.attempt_number,
            is_current: submission.is_current,
            status: submission.status,
            score: submission.score,
            total: submission.total,
            text_content: submission.text_content,
            file_name: submission.file_name,
            file_size: submission.file_size,
            feedback: submission.feedback,
            reviewed_by: submission.reviewed_by,
            reviewed_at: format_optional(submission.reviewed_at),
            submitted_at: format_primitive(submission.submitted_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionDetailResponse {
    #[serde(flatten)]
    pub(crate) submission: SubmissionResponse,
    pub(crate) questions: Vec<QuestionReview>,
    pub(crate) file_sha256: Option<String>,
    pub(crate) mime_type: Option<String>,
    pub(crate) file_url: Option<String>,
}
