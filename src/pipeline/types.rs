//! Shared types for the reply pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Inbound reply ───────────────────────────────────────────────────

/// Kind of conversation a reply arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ConversationKind {
    /// One-to-one DM between the bot and a single user.
    Direct,
    /// Anything else (channel, group DM); carries the platform's label.
    Group(String),
}

impl ConversationKind {
    /// Map Slack's `channel_type` onto a conversation kind.
    pub fn from_slack(channel_type: Option<&str>) -> Self {
        match channel_type {
            Some("im") => ConversationKind::Direct,
            Some(other) => ConversationKind::Group(other.to_string()),
            None => ConversationKind::Group("unknown".to_string()),
        }
    }
}

/// A file attached to a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: Option<String>,
    pub mime_type: Option<String>,
    /// Platform-specific subtype marker (Slack sets `slack_audio` on voice clips).
    pub subtype: Option<String>,
    /// Platform file type, usually the extension (`m4a`, `webm`, ...).
    pub filetype: Option<String>,
    /// Authenticated download URL.
    pub download_url: Option<String>,
}

/// One inbound event from the GP's conversation.
///
/// Transport adapters convert their native payload into this struct.
/// Nothing here is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyEvent {
    /// Platform event or message id.
    pub id: String,
    /// Sender user id.
    pub sender: String,
    /// Conversation the reply arrived in; acknowledgments go back here.
    pub conversation_id: String,
    pub conversation: ConversationKind,
    /// Platform sub-event marker (`message_changed`, `file_share`, ...).
    pub subtype: Option<String>,
    pub text: Option<String>,
    pub attachments: Vec<Attachment>,
    pub received_at: DateTime<Utc>,
}

impl ReplyEvent {
    pub fn new(
        sender: impl Into<String>,
        conversation_id: impl Into<String>,
        conversation: ConversationKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: sender.into(),
            conversation_id: conversation_id.into(),
            conversation,
            subtype: None,
            text: None,
            attachments: Vec::new(),
            received_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

// ── Payloads ────────────────────────────────────────────────────────

/// A unit of reply content that goes through extraction on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyPayload {
    /// Voice memo to transcribe.
    Audio(Attachment),
    /// Text reply, used as-is.
    Text(String),
}

impl ReplyPayload {
    /// Short label for logs and reports.
    pub fn label(&self) -> &str {
        match self {
            ReplyPayload::Audio(a) => &a.id,
            ReplyPayload::Text(_) => "text",
        }
    }
}

/// Why an event was dropped before the pipeline ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    UnauthorizedSender(String),
    NotDirect(ConversationKind),
    SubEvent(String),
    NoPayload,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::UnauthorizedSender(s) => write!(f, "unauthorized sender {s}"),
            Rejection::NotDirect(kind) => write!(f, "not a direct conversation ({kind:?})"),
            Rejection::SubEvent(s) => write!(f, "sub-event {s}"),
            Rejection::NoPayload => write!(f, "no voice memo or text payload"),
        }
    }
}

// ── Outcomes ────────────────────────────────────────────────────────

/// Result of running one payload through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Extraction failed; later stages did not run.
    ExtractionFailed { payload: String, reason: String },
    /// Extraction succeeded; flags record which downstream effects landed.
    Delivered {
        prompt: String,
        response: String,
        published: bool,
        logged: bool,
        acknowledged: bool,
    },
}

/// What the pipeline did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Dropped by validation. No side effects happened.
    Ignored(Rejection),
    /// Accepted; one outcome per payload, in order.
    Processed {
        run_id: Uuid,
        outcomes: Vec<ReplyOutcome>,
    },
}

impl Disposition {
    pub fn outcomes(&self) -> &[ReplyOutcome] {
        match self {
            Disposition::Ignored(_) => &[],
            Disposition::Processed { outcomes, .. } => outcomes,
        }
    }
}
