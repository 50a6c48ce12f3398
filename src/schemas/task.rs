use serde::Serialize;

use crate::db::models::{Task, TaskQuestion};
use crate::db::types::TaskType;
use crate::repositories::submissions::TaskStatsRow;

/// Question as shown to a learner. The correct option never leaves the server here.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) question: String,
    pub(crate) options: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TaskResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) task_type: TaskType,
    pub(crate) allow_resubmission: bool,
    pub(crate) requires_approval: bool,
    pub(crate) video_ids: Vec<String>,
    pub(crate) questions: Vec<QuestionResponse>,
}

impl TaskResponse {
    pub(crate) fn from_db(task: Task, video_ids: Vec<String>, questions: Vec<TaskQuestion>) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            task_type: task.task_type,
            allow_resubmission: task.allow_resubmission,
            requires_approval: task.requires_approval,
            video_ids,
            questions: questions
                .into_iter()
                .map(|question| QuestionResponse {
                    id: question.id,
                    question: question.question,
                    options: question.options.0,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TaskStatsResponse {
    pub(crate) task_id: String,
    pub(crate) total_submissions: i64,
    pub(crate) pending: i64,
    pub(crate) approved: i64,
    pub(crate) rejected: i64,
    pub(crate) average_percent: Option<f64>,
}

impl TaskStatsResponse {
    pub(crate) fn from_row(task_id: String, row: TaskStatsRow) -> Self {
        Self {
            task_id,
            total_submissions: row.total,
            pending: row.pending,
            approved: row.approved,
            rejected: row.rejected,
            average_percent: row.average_percent.map(|value| (value * 10.0).round() / 10.0),
        }
    }
}
