pub(crate) mod catalog;
pub(crate) mod entitlements;
pub(crate) mod errors;
pub(crate) mod events;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod pagination;
pub(crate) mod progress;
pub(crate) mod router;
pub(crate) mod submissions;
pub(crate) mod tasks;
pub(crate) mod validation;
pub(crate) mod videos;
