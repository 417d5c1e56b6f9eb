//! Slack Events API payloads.
//!
//! Only the fields the relay reads are modelled; everything else is ignored
//! by serde.

use serde::Deserialize;

use crate::error::ChannelError;
use crate::pipeline::types::{Attachment, ConversationKind, ReplyEvent};

/// Top-level envelope POSTed to the events endpoint.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEnvelope {
    /// Sent once when the request URL is configured.
    UrlVerification { challenge: String },
    EventCallback {
        #[serde(default)]
        event_id: Option<String>,
        event: SlackEvent,
    },
    #[serde(other)]
    Other,
}

/// Inner event of an `event_callback`.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub files: Vec<SlackFile>,
}

/// File object attached to a message.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackFile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub filetype: Option<String>,
    #[serde(default)]
    pub url_private_download: Option<String>,
    #[serde(default)]
    pub url_private: Option<String>,
}

impl From<SlackFile> for Attachment {
    fn from(f: SlackFile) -> Self {
        Attachment {
            id: f.id,
            name: f.name,
            mime_type: f.mimetype,
            subtype: f.subtype,
            filetype: f.filetype,
            download_url: f.url_private_download.or(f.url_private),
        }
    }
}

/// Parse a raw request body into an envelope.
pub fn parse_envelope(body: &[u8]) -> Result<SlackEnvelope, ChannelError> {
    serde_json::from_slice(body).map_err(|e| ChannelError::InvalidEvent(e.to_string()))
}

impl SlackEvent {
    /// Convert a `message` event into a [`ReplyEvent`].
    ///
    /// Returns `None` for other event types and for messages with no
    /// human sender (bot posts, system notices), which the relay never
    /// processes.
    pub fn into_reply(self, event_id: Option<String>) -> Option<ReplyEvent> {
        if self.kind != "message" || self.bot_id.is_some() {
            return None;
        }
        let sender = self.user?;
        let conversation_id = self.channel?;

        let mut reply = ReplyEvent::new(
            sender,
            conversation_id,
            ConversationKind::from_slack(self.channel_type.as_deref()),
        );
        if let Some(id) = event_id.or(self.ts) {
            reply = reply.with_id(id);
        }
        reply.subtype = self.subtype;
        reply.text = self.text;
        reply.attachments = self.files.into_iter().map(Attachment::from).collect();
        Some(reply)
    }
}
