use serde::Serialize;

use crate::core::time::format_primitive;
use crate::services::engine::ProgressSnapshot;
use crate::services::progress::CategoryProgress;

#[derive(Debug, Serialize)]
pub(crate) struct VideoCompletionResponse {
    pub(crate) video_id: String,
    pub(crate) newly_completed: bool,
    pub(crate) completed_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CompletedVideoResponse {
    pub(crate) video_id: String,
    pub(crate) completed_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CompletedTaskResponse {
    pub(crate) task_id: String,
    pub(crate) score: Option<i32>,
    pub(crate) total: Option<i32>,
    pub(crate) completed_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProgressSnapshotResponse {
    pub(crate) videos: Vec<CompletedVideoResponse>,
    pub(crate) tasks: Vec<CompletedTaskResponse>,
}

impl ProgressSnapshotResponse {
    pub(crate) fn from_snapshot(snapshot: ProgressSnapshot) -> Self {
        Self {
            videos: snapshot
                .videos
                .into_iter()
                .map(|record| CompletedVideoResponse {
                    video_id: record.video_id,
                    completed_at: format_primitive(record.completed_at),
                })
                .collect(),
            tasks: snapshot
                .tasks
                .into_iter()
                .map(|record| CompletedTaskResponse {
                    task_id: record.task_id,
                    score: record.score,
                    total: record.total,
                    completed_at: format_primitive(record.completed_at),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CategoryProgressResponse {
    pub(crate) category_id: String,
    pub(crate) completed_videos: usize,
    pub(crate) total_videos: usize,
    pub(crate) percent: u8,
}

impl CategoryProgressResponse {
    pub(crate) fn new(category_id: String, progress: CategoryProgress) -> Self {
        Self {
            category_id,
            completed_videos: progress.completed,
            total_videos: progress.total,
            percent: progress.percent,
        }
    }
}
