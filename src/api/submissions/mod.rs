pub(crate) mod helpers;
mod admin;
mod student;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        // Learner endpoints
        .route("/tasks/:task_id", post(student::submit_answer))
        .route("/tasks/:task_id/file", post(student::submit_file))
        .route("/my-submissions", get(student::get_my_submissions))
        // Reviewer endpoints
        .route("/pending", get(admin::list_pending))
        .route("/:submission_id", get(admin::get_submission))
        .route("/:submission_id/approve", post(admin::approve_submission))
        .route("/:submission_id/reject", post(admin::reject_submission))
}
