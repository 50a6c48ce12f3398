use std::collections::{HashMap, HashSet};

use crate::db::models::{TaskCompletion, VideoCompletion};
use crate::services::content_graph::ContentGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TaskScore {
    pub(crate) score: Option<i32>,
    pub(crate) total: Option<i32>,
}

/// A learner's completion records, the only input unlocking looks at.
#[derive(Debug, Default, Clone)]
pub(crate) struct CompletionSnapshot {
    videos: HashSet<String>,
    tasks: HashMap<String, TaskScore>,
}

impl CompletionSnapshot {
    pub(crate) fn from_records(videos: &[VideoCompletion], tasks: &[TaskCompletion]) -> Self {
        Self {
            videos: videos.iter().map(|record| record.video_id.clone()).collect(),
            tasks: tasks
                .iter()
                .map(|record| {
                    (record.task_id.clone(), TaskScore { score: record.score, total: record.total })
                })
                .collect(),
        }
    }

    pub(crate) fn is_video_completed(&self, video_id: &str) -> bool {
        self.videos.contains(video_id)
    }

    pub(crate) fn is_task_completed(&self, task_id: &str) -> bool {
        self.tasks.contains_key(task_id)
    }

    pub(crate) fn task_score(&self, task_id: &str) -> Option<TaskScore> {
        self.tasks.get(task_id).copied()
    }

    #[cfg(test)]
    pub(crate) fn with_videos<'a>(video_ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            videos: video_ids.into_iter().map(str::to_string).collect(),
            tasks: HashMap::new(),
        }
    }
}

/// Share of videos watched, rounded half away from zero. Empty categories report 0.
pub(crate) fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

pub(crate) fn category_progress(
    graph: &ContentGraph,
    snapshot: &CompletionSnapshot,
    category_id: &str,
) -> CategoryProgress {
    let total = graph.video_count(category_id);
    let completed = graph
        .videos_in_category(category_id)
        .filter(|video| snapshot.is_video_completed(&video.id))
        .count();

    CategoryProgress { completed, total, percent: progress_percent(completed, total) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CategoryProgress {
    pub(crate) completed: usize,
    pub(crate) total: usize,
    pub(crate) percent: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::content_graph::fixtures::{category, video};
    use time::macros::datetime;

    #[test]
    fn percent_rounds_to_nearest_integer() {
        assert_eq!(progress_percent(0, 3), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(3, 3), 100);
        assert_eq!(progress_percent(1, 8), 13);
    }

    #[test]
    fn empty_category_is_zero_percent() {
        assert_eq!(progress_percent(0, 0), 0);
    }

    #[test]
    fn category_progress_counts_only_that_category() {
        let graph = ContentGraph::build(
            [category("c", true, false), category("other", false, false)],
            [video("v1", "c", None, 1), video("v2", "c", None, 2), video("x1", "other", None, 1)],
            [],
        );
        let snapshot = CompletionSnapshot::with_videos(["v1", "x1"]);

        let progress = category_progress(&graph, &snapshot, "c");
        assert_eq!(progress, CategoryProgress { completed: 1, total: 2, percent: 50 });
    }

    #[test]
    fn snapshot_keeps_task_scores() {
        let at = datetime!(2026-02-01 10:00:00);
        let snapshot = CompletionSnapshot::from_records(
            &[VideoCompletion { user_id: "u".into(), video_id: "v1".into(), completed_at: at }],
            &[TaskCompletion {
                user_id: "u".into(),
                task_id: "t1".into(),
                score: Some(3),
                total: Some(4),
                completed_at: at,
            }],
        );

        assert!(snapshot.is_video_completed("v1"));
        assert!(snapshot.is_task_completed("t1"));
        assert!(!snapshot.is_task_completed("t2"));
        assert_eq!(snapshot.task_score("t1"), Some(TaskScore { score: Some(3), total: Some(4) }));
    }
}
