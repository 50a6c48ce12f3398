pub(crate) mod content_graph;
pub(crate) mod engine;
pub(crate) mod entitlements;
pub(crate) mod grading;
pub(crate) mod progress;
pub(crate) mod progress_cache;
pub(crate) mod storage;
pub(crate) mod unlock_policy;
