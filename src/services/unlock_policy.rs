use crate::core::config::TaskGating;
use crate::services::content_graph::{ContentGraph, Predecessor};
use crate::services::progress::CompletionSnapshot;

/// Pedagogical gate. Callers must have confirmed the entitlement first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UnlockDecision {
    Unlocked,
    Locked { waiting_on: Vec<String> },
    /// The content graph is inconsistent; treated as locked.
    Broken(GraphDefect),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GraphDefect {
    UnknownVideo { video_id: String },
    MissingPredecessor { video_id: String, expected_order: i32 },
    UnlinkedTask { task_id: String },
}

#[cfg(test)]
impl UnlockDecision {
    pub(crate) fn is_unlocked(&self) -> bool {
        matches!(self, UnlockDecision::Unlocked)
    }
}

impl std::fmt::Display for GraphDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphDefect::UnknownVideo { video_id } => write!(f, "video {video_id} is not in the content graph"),
            GraphDefect::MissingPredecessor { video_id, expected_order } => {
                write!(f, "video {video_id} has no predecessor at order {expected_order}")
            }
            GraphDefect::UnlinkedTask { task_id } => write!(f, "task {task_id} is linked to no video"),
        }
    }
}

pub(crate) fn can_access_video(
    graph: &ContentGraph,
    completions: &CompletionSnapshot,
    video_id: &str,
) -> UnlockDecision {
    let Some(video) = graph.video(video_id) else {
        return UnlockDecision::Broken(GraphDefect::UnknownVideo { video_id: video_id.to_string() });
    };

    let sequential = graph
        .category(&video.category_id)
        .map(|category| category.requires_sequential)
        .unwrap_or(false);
    if !sequential {
        return UnlockDecision::Unlocked;
    }

    match graph.predecessor(video) {
        Predecessor::SequenceStart => UnlockDecision::Unlocked,
        Predecessor::Video(previous) if completions.is_video_completed(&previous.id) => {
            UnlockDecision::Unlocked
        }
        Predecessor::Video(previous) => {
            UnlockDecision::Locked { waiting_on: vec![previous.id.clone()] }
        }
        Predecessor::Missing { expected_order } => {
            UnlockDecision::Broken(GraphDefect::MissingPredecessor {
                video_id: video.id.clone(),
                expected_order,
            })
        }
    }
}

/// A task opens once every linked video is watched. Task completion never gates.
pub(crate) fn can_access_task(
    graph: &ContentGraph,
    completions: &CompletionSnapshot,
    task_id: &str,
    gating: TaskGating,
) -> UnlockDecision {
    let linked = graph.linked_videos(task_id);
    if linked.is_empty() {
        return UnlockDecision::Broken(GraphDefect::UnlinkedTask { task_id: task_id.to_string() });
    }

    if gating == TaskGating::Open {
        return UnlockDecision::Unlocked;
    }

    let waiting_on: Vec<String> = linked
        .iter()
        .filter(|video_id| !completions.is_video_completed(video_id))
        .cloned()
        .collect();

    if waiting_on.is_empty() {
        UnlockDecision::Unlocked
    } else {
        UnlockDecision::Locked { waiting_on }
    }
}
