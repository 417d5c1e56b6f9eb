//! Publication pipeline for replies from the GP.
//!
//! Inbound events flow through:
//! 1. `ReplyGuard::accept()`: sender, conversation and payload checks
//! 2. `ReplyPipeline::handle()`: extract, correlate, publish, log, acknowledge
//!
//! Every external call is wrapped by `stage::best_effort`, so no stage can
//! block or abort the ones after it.

pub mod guard;
pub mod messages;
pub mod processor;
pub mod stage;
pub mod types;

pub use guard::ReplyGuard;
pub use processor::ReplyPipeline;
pub use types::{Disposition, ReplyEvent, ReplyOutcome};
