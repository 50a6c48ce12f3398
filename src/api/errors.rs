use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::engine::EngineError;
use crate::services::entitlements::AccessStatus;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
    code: &'static str,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    NotFound(String),
    /// 402: the learner holds no effective entitlement.
    PaymentRequired(String),
    /// 423: entitled, but sequencing has not opened the content yet.
    Locked(String),
    Conflict { code: &'static str, detail: String },
    Unprocessable { code: &'static str, detail: String },
    TooManyRequests(&'static str),
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", message.to_string())
            }
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, "forbidden", message.to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::PaymentRequired(message) => {
                (StatusCode::PAYMENT_REQUIRED, "access_denied", message)
            }
            ApiError::Locked(message) => (StatusCode::LOCKED, "locked", message),
            ApiError::Conflict { code, detail } => (StatusCode::CONFLICT, code, detail),
            ApiError::Unprocessable { code, detail } => {
                (StatusCode::UNPROCESSABLE_ENTITY, code, detail)
            }
            ApiError::TooManyRequests(message) => {
                (StatusCode::TOO_MANY_REQUESTS, "rate_limited", message.to_string())
            }
            ApiError::ServiceUnavailable(message) => {
                tracing::error!(error = %message, "Service unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "unavailable", message)
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let unauthorized = matches!(self, ApiError::Unauthorized(_));
        let (status, code, detail) = self.parts();

        let mut response =
            (status, Json(ErrorResponse { status: status.as_u16(), detail, code })).into_response();
        if unauthorized {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::AccessDenied { status: AccessStatus::Expired, .. } => {
                ApiError::PaymentRequired("Access to this course has expired".to_string())
            }
            EngineError::AccessDenied { .. } => {
                ApiError::PaymentRequired("Purchase this course to continue".to_string())
            }
            // Graph defects are already reported; learners only see a lock.
            EngineError::Locked { .. } | EngineError::DataIntegrity(_) => {
                ApiError::Locked("This content is locked".to_string())
            }
            err @ EngineError::IncompleteAnswer { .. } => {
                ApiError::Unprocessable { code: "incomplete_answer", detail: err.to_string() }
            }
            EngineError::InvalidPayload(detail) => {
                ApiError::Unprocessable { code: "invalid_payload", detail }
            }
            err @ EngineError::DuplicateSubmission => {
                ApiError::Conflict { code: "duplicate_submission", detail: err.to_string() }
            }
            EngineError::InvalidTransition(detail) => {
                ApiError::Conflict { code: "invalid_transition", detail }
            }
            err @ EngineError::SubmissionInProgress => {
                ApiError::Conflict { code: "submission_in_progress", detail: err.to_string() }
            }
            EngineError::RateLimited => ApiError::TooManyRequests("Too many submissions"),
            EngineError::NotFound(what) => ApiError::NotFound(capitalize_not_found(what)),
            EngineError::Database(err) => ApiError::internal(err, "Database error"),
        }
    }
}

fn capitalize_not_found(what: &str) -> String {
    let mut chars = what.chars();
    match chars.next() {
        Some(first) => format!("{}{} not found", first.to_ascii_uppercase(), chars.as_str()),
        None => "Not found".to_string(),
    }
}
