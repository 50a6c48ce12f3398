use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::{Category, CategoryModule, Task, Video};
use crate::db::types::TaskType;
use crate::services::engine::{CategoryOutline, ModuleOutline, TaskOutline, VideoOutline};
use crate::services::entitlements::AccessStatus;

#[derive(Debug, Serialize)]
pub(crate) struct CategoryResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) price_cents: i64,
    pub(crate) requires_sequential: bool,
    pub(crate) is_modular: bool,
}

impl CategoryResponse {
    pub(crate) fn from_db(category: Category) -> Self {
        Self {
            id: category.id,
            title: category.title,
            description: category.description,
            price_cents: category.price_cents,
            requires_sequential: category.requires_sequential,
            is_modular: category.is_modular,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ModuleResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) order_index: i32,
    pub(crate) price_cents: Option<i64>,
    pub(crate) access: AccessStatus,
}

impl ModuleResponse {
    fn from_outline(outline: ModuleOutline) -> Self {
        let ModuleOutline { module, access } = outline;
        let CategoryModule { id, title, order_index, price_cents, .. } = module;
        Self { id, title, order_index, price_cents, access }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TaskSummaryResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) task_type: TaskType,
    pub(crate) unlocked: bool,
    pub(crate) completed: bool,
    pub(crate) score: Option<i32>,
    pub(crate) total: Option<i32>,
}

impl TaskSummaryResponse {
    fn from_outline(outline: TaskOutline) -> Self {
        let (score, total) =
            outline.score.map_or((None, None), |score| (score.score, score.total));
        Self {
            id: outline.task.id,
            title: outline.task.title,
            task_type: outline.task.task_type,
            unlocked: outline.unlocked,
            completed: outline.completed,
            score,
            total,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct VideoSummaryResponse {
    pub(crate) id: String,
    pub(crate) module_id: Option<String>,
    pub(crate) title: String,
    pub(crate) order_index: i32,
    pub(crate) entitled: bool,
    pub(crate) unlocked: bool,
    pub(crate) completed: bool,
    pub(crate) tasks: Vec<TaskSummaryResponse>,
}

impl VideoSummaryResponse {
    fn from_outline(outline: VideoOutline) -> Self {
        Self {
            id: outline.video.id,
            module_id: outline.video.module_id,
            title: outline.video.title,
            order_index: outline.video.order_index,
            entitled: outline.entitled,
            unlocked: outline.unlocked,
            completed: outline.completed,
            tasks: outline.tasks.into_iter().map(TaskSummaryResponse::from_outline).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CategoryOutlineResponse {
    pub(crate) category: CategoryResponse,
    pub(crate) access: AccessStatus,
    pub(crate) progress_percent: u8,
    pub(crate) completed_videos: usize,
    pub(crate) total_videos: usize,
    pub(crate) modules: Vec<ModuleResponse>,
    pub(crate) videos: Vec<VideoSummaryResponse>,
}

impl CategoryOutlineResponse {
    pub(crate) fn from_outline(outline: CategoryOutline) -> Self {
        Self {
            category: CategoryResponse::from_db(outline.category),
            access: outline.access,
            progress_percent: outline.progress.percent,
            completed_videos: outline.progress.completed,
            total_videos: outline.progress.total,
            modules: outline.modules.into_iter().map(ModuleResponse::from_outline).collect(),
            videos: outline.videos.into_iter().map(VideoSummaryResponse::from_outline).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LinkedTaskResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) task_type: TaskType,
}

#[derive(Debug, Serialize)]
pub(crate) struct VideoResponse {
    pub(crate) id: String,
    pub(crate) category_id: String,
    pub(crate) module_id: Option<String>,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) order_index: i32,
    pub(crate) view_count: i64,
    pub(crate) completed: bool,
    pub(crate) tasks: Vec<LinkedTaskResponse>,
    pub(crate) created_at: String,
}

impl VideoResponse {
    pub(crate) fn from_db(video: Video, completed: bool, tasks: Vec<Task>) -> Self {
        Self {
            id: video.id,
            category_id: video.category_id,
            module_id: video.module_id,
            title: video.title,
            description: video.description,
            order_index: video.order_index,
            view_count: video.view_count,
            completed,
            tasks: tasks
                .into_iter()
                .map(|task| LinkedTaskResponse {
                    id: task.id,
                    title: task.title,
                    task_type: task.task_type,
                })
                .collect(),
            created_at: format_primitive(video.created_at),
        }
    }
}
