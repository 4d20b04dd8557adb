pub mod classify;
pub mod queue;
pub mod reconcile;
pub mod session;
pub mod watermark;
