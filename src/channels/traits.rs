//! Collaborator interfaces to the chat platform.
//!
//! The pipeline and dispatcher depend only on these traits; the Slack
//! client implements all three.

use async_trait::async_trait;

use crate::error::{ChannelError, LogError};

/// Posts messages to channels and DMs.
#[async_trait]
pub trait ChannelPublisher: Send + Sync {
    /// Post `text` to a channel or DM conversation.
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), ChannelError>;

    /// Open (or reuse) a DM with `user_id` and return its conversation id.
    async fn open_direct_conversation(&self, user_id: &str) -> Result<String, ChannelError>;
}

/// Durable log primitives: one markdown document per channel.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// The channel's existing log target, if any.
    async fn find_target(&self, channel: &str) -> Result<Option<String>, LogError>;

    /// Create the channel's log target with an initial document.
    async fn create_target(&self, channel: &str, header_markdown: &str)
    -> Result<String, LogError>;

    /// Insert a markdown section at the end of the target.
    async fn append_section(&self, target: &str, markdown: &str) -> Result<(), LogError>;
}

/// Fetches private attachment bytes.
#[async_trait]
pub trait FileDownloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<Vec<u8>, ChannelError>;
}
