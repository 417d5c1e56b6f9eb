//! Prompt dispatcher: hands out the next prompt to the GP.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::channels::ChannelPublisher;
use crate::error::ChannelError;
use crate::pipeline::messages::prompt_message;
use crate::pipeline::stage::{Stage, StageError, best_effort};
use crate::prompts::PromptLedger;

/// What happened on one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent { prompt: String, conversation: String },
    /// The prompt was taken from the rotation but the DM did not go out.
    Failed { prompt: String, reason: String },
}

/// Sends the next prompt from the ledger to the recipient's DM.
pub struct PromptDispatcher {
    ledger: Arc<PromptLedger>,
    publisher: Arc<dyn ChannelPublisher>,
    recipient: String,
    timeout: Duration,
}

impl PromptDispatcher {
    pub fn new(
        ledger: Arc<PromptLedger>,
        publisher: Arc<dyn ChannelPublisher>,
        recipient: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            publisher,
            recipient: recipient.into(),
            timeout,
        }
    }

    /// Advance the rotation and DM the prompt.
    ///
    /// The pointer moves before the send, so a failed send still counts the
    /// prompt as handed out.
    pub async fn dispatch_once(&self) -> DispatchOutcome {
        let prompt = self.ledger.advance().await;
        info!(recipient = %self.recipient, prompt = %prompt, "Dispatching prompt");

        let outcome = best_effort(Stage::Dispatch, self.timeout, self.send(&prompt)).await;
        match outcome.result {
            Ok(conversation) => {
                info!(conversation = %conversation, "Prompt sent");
                DispatchOutcome::Sent {
                    prompt,
                    conversation,
                }
            }
            Err(e) => DispatchOutcome::Failed {
                prompt,
                reason: match e {
                    StageError::Failed(reason) => reason,
                    timed_out => timed_out.to_string(),
                },
            },
        }
    }

    async fn send(&self, prompt: &str) -> Result<String, ChannelError> {
        let conversation = self
            .publisher
            .open_direct_conversation(&self.recipient)
            .await?;
        self.publisher
            .post_message(&conversation, &prompt_message(prompt))
            .await?;
        Ok(conversation)
    }
}
