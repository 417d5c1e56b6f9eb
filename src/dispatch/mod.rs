//! Scheduled prompt dispatch.

pub mod dispatcher;
pub mod scheduler;

pub use dispatcher::{DispatchOutcome, PromptDispatcher};
pub use scheduler::{DispatchSchedule, spawn_dispatch_loop};
