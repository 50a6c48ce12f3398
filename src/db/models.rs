use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{EventSubject, GrantSource, SubmissionStatus, TaskType, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_blocked: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl User {
    pub(crate) fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Category {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) price_cents: i64,
    pub(crate) requires_sequential: bool,
    pub(crate) is_modular: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct CategoryModule {
    pub(crate) id: String,
    pub(crate) category_id: String,
    pub(crate) title: String,
    pub(crate) order_index: i32,
    pub(crate) price_cents: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Video {
    pub(crate) id: String,
    pub(crate) category_id: String,
    pub(crate) module_id: Option<String>,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) order_index: i32,
    pub(crate) view_count: i64,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Task {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) task_type: TaskType,
    pub(crate) allow_resubmission: bool,
    pub(crate) requires_approval: bool,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TaskQuestion {
    pub(crate) id: String,
    pub(crate) task_id: String,
    pub(crate) question: String,
    pub(crate) options: Json<Vec<String>>,
    pub(crate) correct_answer: i32,
    pub(crate) order_index: i32,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct EntitlementRow {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) category_id: String,
    pub(crate) module_id: Option<String>,
    pub(crate) source: GrantSource,
    pub(crate) amount_cents: Option<i64>,
    pub(crate) expires_at: Option<PrimitiveDateTime>,
    pub(crate) granted_by: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct VideoCompletion {
    pub(crate) user_id: String,
    pub(crate) video_id: String,
    pub(crate) completed_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TaskCompletion {
    pub(crate) user_id: String,
    pub(crate) task_id: String,
    pub(crate) score: Option<i32>,
    pub(crate) total: Option<i32>,
    pub(crate) completed_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) task_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) is_current: bool,
    pub(crate) status: SubmissionStatus,
    pub(crate) answers: Option<Json<HashMap<String, i32>>>,
    pub(crate) text_content: Option<String>,
    pub(crate) file_key: Option<String>,
    pub(crate) file_name: Option<String>,
    pub(crate) file_size: Option<i64>,
    pub(crate) file_sha256: Option<String>,
    pub(crate) mime_type: Option<String>,
    pub(crate) score: Option<i32>,
    pub(crate) total: Option<i32>,
    pub(crate) feedback: Option<String>,
    pub(crate) reviewed_by: Option<String>,
    pub(crate) reviewed_at: Option<PrimitiveDateTime>,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct EngineEvent {
    pub(crate) id: i64,
    pub(crate) user_id: String,
    pub(crate) subject: EventSubject,
    pub(crate) subject_id: String,
    pub(crate) submission_id: Option<String>,
    pub(crate) old_state: Option<String>,
    pub(crate) new_state: String,
    pub(crate) created_at: PrimitiveDateTime,
}
