use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::EngineEvent;
use crate::db::types::EventSubject;

#[derive(Debug, Deserialize)]
pub(crate) struct EventsQuery {
    #[serde(default)]
    pub(crate) after_id: i64,
    #[serde(default = "default_event_limit")]
    pub(crate) limit: i64,
}

fn default_event_limit() -> i64 {
    100
}

#[derive(Debug, Serialize)]
pub(crate) struct EventResponse {
    pub(crate) id: i64,
    pub(crate) user_id: String,
    pub(crate) subject: EventSubject,
    pub(crate) subject_id: String,
    pub(crate) submission_id: Option<String>,
    pub(crate) old_state: Option<String>,
    pub(crate) new_state: String,
    pub(crate) created_at: String,
}

impl EventResponse {
    pub(crate) fn from_db(event: EngineEvent) -> Self {
        Self {
            id: event.id,
            user_id: event.user_id,
            subject: event.subject,
            subject_id: event.subject_id,
            submission_id: event.submission_id,
            old_state: event.old_state,
            new_state: event.new_state,
            created_at: format_primitive(event.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EventPage {
    pub(crate) items: Vec<EventResponse>,
    pub(crate) next_after_id: i64,
}
