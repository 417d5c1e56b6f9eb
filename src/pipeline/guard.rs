//! Reply validation: decides whether an event enters the pipeline.
//!
//! Everything that fails here is dropped silently: no extraction, no
//! publication, no log entry, no acknowledgment.

use tracing::warn;

use crate::pipeline::types::{Attachment, ConversationKind, Rejection, ReplyEvent, ReplyPayload};

/// File types accepted as voice memos when MIME type and subtype say nothing.
pub const AUDIO_FILETYPES: &[&str] = &["webm", "mp4", "m4a", "ogg", "mp3"];

/// Subtypes that still count as a genuine reply.
const REPLY_SUBTYPES: &[&str] = &["file_share"];

/// Whether an attachment is a voice memo.
pub fn is_voice_memo(attachment: &Attachment) -> bool {
    attachment
        .mime_type
        .as_deref()
        .is_some_and(|m| m.starts_with("audio/"))
        || attachment.subtype.as_deref() == Some("slack_audio")
        || attachment
            .filetype
            .as_deref()
            .is_some_and(|t| AUDIO_FILETYPES.contains(&t))
}

/// Validation rules for inbound replies.
#[derive(Debug, Clone)]
pub struct ReplyGuard {
    authorized_sender: String,
    accept_text: bool,
}

impl ReplyGuard {
    pub fn new(authorized_sender: impl Into<String>, accept_text: bool) -> Self {
        Self {
            authorized_sender: authorized_sender.into(),
            accept_text,
        }
    }

    /// Check an event and extract its payloads.
    pub fn accept(&self, event: &ReplyEvent) -> Result<Vec<ReplyPayload>, Rejection> {
        if event.sender != self.authorized_sender {
            return Err(Rejection::UnauthorizedSender(event.sender.clone()));
        }
        if event.conversation != ConversationKind::Direct {
            return Err(Rejection::NotDirect(event.conversation.clone()));
        }
        if let Some(subtype) = event.subtype.as_deref()
            && !REPLY_SUBTYPES.contains(&subtype)
        {
            return Err(Rejection::SubEvent(subtype.to_string()));
        }

        let mut payloads = Vec::new();
        for attachment in event.attachments.iter().filter(|a| is_voice_memo(a)) {
            if attachment.download_url.is_none() {
                warn!(attachment = %attachment.id, "Voice memo has no download URL, skipping");
                continue;
            }
            payloads.push(ReplyPayload::Audio(attachment.clone()));
        }

        if payloads.is_empty()
            && self.accept_text
            && let Some(text) = event.text.as_deref().map(str::trim)
            && !text.is_empty()
        {
            payloads.push(ReplyPayload::Text(text.to_string()));
        }

        if payloads.is_empty() {
            return Err(Rejection::NoPayload);
        }
        Ok(payloads)
    }
}
