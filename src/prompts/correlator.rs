//! Reply correlation.
//!
//! Replies carry no reference to the prompt they answer. The only link is
//! time: a reply answers whatever prompt was handed out last. That rule is
//! kept behind [`Correlator`] so the pipeline never touches the ledger.

use std::sync::Arc;

use async_trait::async_trait;

use crate::pipeline::types::ReplyEvent;
use crate::prompts::ledger::PromptLedger;

/// Resolves which prompt an inbound reply is answering.
#[async_trait]
pub trait Correlator: Send + Sync {
    /// Always returns a prompt; correlation cannot fail.
    async fn resolve_prompt_for_reply(&self, reply: &ReplyEvent) -> String;
}

/// Attributes every reply to the most recently sent prompt.
///
/// Assumes at most one prompt is outstanding. If a second prompt goes out
/// before the first is answered, the late reply is attributed to the second.
pub struct LastSentCorrelator {
    ledger: Arc<PromptLedger>,
}

impl LastSentCorrelator {
    pub fn new(ledger: Arc<PromptLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl Correlator for LastSentCorrelator {
    async fn resolve_prompt_for_reply(&self, _reply: &ReplyEvent) -> String {
        self.ledger.peek_last().await
    }
}
