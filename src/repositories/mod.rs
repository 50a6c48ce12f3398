pub(crate) mod catalog;
pub(crate) mod entitlements;
pub(crate) mod events;
pub(crate) mod progress;
pub(crate) mod submissions;
pub(crate) mod tasks;
pub(crate) mod users;
