//! Prompt rotation and reply correlation.
//!
//! The ledger owns the rotation pointer; the correlator is the only thing
//! the reply pipeline sees of it.

pub mod correlator;
pub mod ledger;
pub mod list;
pub mod store;

pub use correlator::{Correlator, LastSentCorrelator};
pub use ledger::{PromptLedger, RotationState};
pub use list::PromptList;
pub use store::{FileRotationStore, LibSqlRotationStore, MemoryRotationStore, RotationStore};
