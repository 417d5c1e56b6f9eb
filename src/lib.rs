//! memo-relay: scheduled prompts out, voice memo replies in.

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod journal;
pub mod pipeline;
pub mod prompts;

#[cfg(test)]
pub(crate) mod testing;
