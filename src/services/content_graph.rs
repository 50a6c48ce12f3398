use std::collections::HashMap;

use crate::db::models::{Category, Video};

#[derive(Debug, Clone)]
pub(crate) struct CategoryNode {
    pub(crate) id: String,
    pub(crate) requires_sequential: bool,
    pub(crate) is_modular: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct VideoNode {
    pub(crate) id: String,
    pub(crate) category_id: String,
    pub(crate) module_id: Option<String>,
    pub(crate) order_index: i32,
}

/// Where a video sits in its unlock sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Predecessor<'a> {
    /// First video of the category, or of its module in a modular category.
    SequenceStart,
    Video(&'a VideoNode),
    /// The dense ranking of a non-modular category has a hole right before this video.
    Missing { expected_order: i32 },
}

/// Read-only view of categories, their ordered videos and the task links.
#[derive(Debug, Default)]
pub(crate) struct ContentGraph {
    categories: HashMap<String, CategoryNode>,
    videos: HashMap<String, VideoNode>,
    // category id -> video ids sorted by order_index
    sequences: HashMap<String, Vec<String>>,
    task_links: HashMap<String, Vec<String>>,
}

impl From<&Category> for CategoryNode {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id.clone(),
            requires_sequential: category.requires_sequential,
            is_modular: category.is_modular,
        }
    }
}

impl From<&Video> for VideoNode {
    fn from(video: &Video) -> Self {
        Self {
            id: video.id.clone(),
            category_id: video.category_id.clone(),
            module_id: video.module_id.clone(),
            order_index: video.order_index,
        }
    }
}

impl ContentGraph {
    pub(crate) fn build(
        categories: impl IntoIterator<Item = CategoryNode>,
        videos: impl IntoIterator<Item = VideoNode>,
        task_links: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut graph = ContentGraph::default();

        for category in categories {
            graph.sequences.entry(category.id.clone()).or_default();
            graph.categories.insert(category.id.clone(), category);
        }

        for video in videos {
            graph.sequences.entry(video.category_id.clone()).or_default().push(video.id.clone());
            graph.videos.insert(video.id.clone(), video);
        }

        let videos = &graph.videos;
        for sequence in graph.sequences.values_mut() {
            sequence.sort_by_key(|id| videos.get(id).map(|video| video.order_index));
        }

        for (task_id, video_id) in task_links {
            let linked = graph.task_links.entry(task_id).or_default();
            if !linked.contains(&video_id) {
                linked.push(video_id);
            }
        }

        graph
    }

    pub(crate) fn category(&self, category_id: &str) -> Option<&CategoryNode> {
        self.categories.get(category_id)
    }

    pub(crate) fn video(&self, video_id: &str) -> Option<&VideoNode> {
        self.videos.get(video_id)
    }

    pub(crate) fn videos_in_category<'a>(
        &'a self,
        category_id: &str,
    ) -> impl Iterator<Item = &'a VideoNode> + 'a {
        self.sequences
            .get(category_id)
            .into_iter()
            .flatten()
            .filter_map(|video_id| self.videos.get(video_id))
    }

    pub(crate) fn video_count(&self, category_id: &str) -> usize {
        self.sequences.get(category_id).map_or(0, Vec::len)
    }

    pub(crate) fn linked_videos(&self, task_id: &str) -> &[String] {
        self.task_links.get(task_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Modular categories rank videos across the whole category, so a module's
    /// sequence is its own videos in category order and holes between them are
    /// not attributable to any module.
    pub(crate) fn predecessor(&self, video: &VideoNode) -> Predecessor<'_> {
        let modular =
            self.category(&video.category_id).map(|category| category.is_modular).unwrap_or(false);
        if modular {
            return self
                .videos_in_category(&video.category_id)
                .filter(|candidate| candidate.module_id == video.module_id)
                .take_while(|candidate| candidate.order_index < video.order_index)
                .last()
                .map_or(Predecessor::SequenceStart, Predecessor::Video);
        }

        let Some(first) = self.videos_in_category(&video.category_id).next() else {
            return Predecessor::SequenceStart;
        };
        if video.order_index <= first.order_index {
            return Predecessor::SequenceStart;
        }

        let expected_order = video.order_index - 1;
        self.videos_in_category(&video.category_id)
            .find(|candidate| candidate.order_index == expected_order)
            .map_or(Predecessor::Missing { expected_order }, Predecessor::Video)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn category(id: &str, sequential: bool, modular: bool) -> CategoryNode {
        CategoryNode { id: id.to_string(), requires_sequential: sequential, is_modular: modular }
    }

    pub(crate) fn video(id: &str, category_id: &str, module_id: Option<&str>, order: i32) -> VideoNode {
        VideoNode {
            id: id.to_string(),
            category_id: category_id.to_string(),
            module_id: module_id.map(str::to_string),
            order_index: order,
        }
    }

    pub(crate) fn link(task_id: &str, video_id: &str) -> (String, String) {
        (task_id.to_string(), video_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{category, link, video};
    use super::*;

    #[test]
    fn videos_are_ordered_by_rank_regardless_of_input_order() {
        let graph = ContentGraph::build(
            [category("c", true, false)],
            [video("v3", "c", None, 3), video("v1", "c", None, 1), video("v2", "c", None, 2)],
            [],
        );

        let ids: Vec<&str> = graph.videos_in_category("c").map(|v| v.id.as_str()).collect();
        assert_eq!(ids, ["v1", "v2", "v3"]);
        assert_eq!(graph.video_count("c"), 3);
        assert_eq!(graph.video_count("missing"), 0);
    }

    #[test]
    fn predecessor_is_previous_rank() {
        let graph = ContentGraph::build(
            [category("c", true, false)],
            [video("v1", "c", None, 1), video("v2", "c", None, 2)],
            [],
        );

        let first = graph.video("v1").expect("v1");
        let second = graph.video("v2").expect("v2");
        assert_eq!(graph.predecessor(first), Predecessor::SequenceStart);
        assert_eq!(graph.predecessor(second), Predecessor::Video(first));
    }

    #[test]
    fn hole_in_ranking_is_reported() {
        let graph = ContentGraph::build(
            [category("c", true, false)],
            [video("v1", "c", None, 1), video("v3", "c", None, 3)],
            [],
        );

        let third = graph.video("v3").expect("v3");
        assert_eq!(graph.predecessor(third), Predecessor::Missing { expected_order: 2 });
    }

    #[test]
    fn modules_start_their_own_sequence() {
        let graph = ContentGraph::build(
            [category("c", true, true)],
            [
                video("a1", "c", Some("ma"), 1),
                video("a2", "c", Some("ma"), 2),
                video("b1", "c", Some("mb"), 3),
                video("b2", "c", Some("mb"), 4),
            ],
            [],
        );

        let b1 = graph.video("b1").expect("b1");
        let b2 = graph.video("b2").expect("b2");
        assert_eq!(graph.predecessor(b1), Predecessor::SequenceStart);
        assert_eq!(graph.predecessor(b2), Predecessor::Video(b1));
    }

    #[test]
    fn interleaved_modules_follow_their_own_order() {
        let graph = ContentGraph::build(
            [category("c", true, true)],
            [
                video("a1", "c", Some("ma"), 1),
                video("b1", "c", Some("mb"), 2),
                video("a2", "c", Some("ma"), 3),
                video("b2", "c", Some("mb"), 5),
            ],
            [],
        );

        let a1 = graph.video("a1").expect("a1");
        let b1 = graph.video("b1").expect("b1");
        assert_eq!(graph.predecessor(a1), Predecessor::SequenceStart);
        assert_eq!(graph.predecessor(b1), Predecessor::SequenceStart);
        assert_eq!(graph.predecessor(graph.video("a2").expect("a2")), Predecessor::Video(a1));
        // Rank 4 is absent, but b2 still follows b1 within its module.
        assert_eq!(graph.predecessor(graph.video("b2").expect("b2")), Predecessor::Video(b1));
    }

    #[test]
    fn module_start_after_a_hole_is_not_a_defect() {
        let graph = ContentGraph::build(
            [category("c", true, true)],
            [video("a1", "c", Some("ma"), 1), video("b1", "c", Some("mb"), 3)],
            [],
        );

        let b1 = graph.video("b1").expect("b1");
        assert_eq!(graph.predecessor(b1), Predecessor::SequenceStart);
    }

    #[test]
    fn task_links_are_deduplicated() {
        let graph = ContentGraph::build(
            [category("c", false, false)],
            [video("v1", "c", None, 1)],
            [link("t", "v1"), link("t", "v1")],
        );

        assert_eq!(graph.linked_videos("t"), ["v1".to_string()]);
        assert!(graph.linked_videos("unknown").is_empty());
    }
}
