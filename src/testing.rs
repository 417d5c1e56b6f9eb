//! In-memory collaborators shared by unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::channels::{ChannelPublisher, LogStore};
use crate::error::{ChannelError, ExtractionError, LogError};
use crate::extract::Extractor;
use crate::pipeline::types::ReplyPayload;

/// Records every post; posts to channels in `failing` return an error.
#[derive(Default)]
pub struct RecordingPublisher {
    pub posts: Mutex<Vec<(String, String)>>,
    pub failing: HashSet<String>,
    pub fail_open: bool,
}

impl RecordingPublisher {
    pub fn failing_on(channels: &[&str]) -> Self {
        Self {
            failing: channels.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    pub async fn posts_to(&self, channel: &str) -> Vec<String> {
        self.posts
            .lock()
            .await
            .iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, t)| t.clone())
            .collect()
    }

    pub async fn count(&self) -> usize {
        self.posts.lock().await.len()
    }
}

#[async_trait]
impl ChannelPublisher for RecordingPublisher {
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), ChannelError> {
        self.posts
            .lock()
            .await
            .push((channel.to_string(), text.to_string()));
        if self.failing.contains(channel) {
            return Err(ChannelError::Api {
                method: "chat.postMessage".into(),
                reason: "channel_not_found".into(),
            });
        }
        Ok(())
    }

    async fn open_direct_conversation(&self, user_id: &str) -> Result<String, ChannelError> {
        if self.fail_open {
            return Err(ChannelError::Api {
                method: "conversations.open".into(),
                reason: "user_not_found".into(),
            });
        }
        Ok(format!("D-{user_id}"))
    }
}

/// Single-target log store counting every call.
#[derive(Default)]
pub struct MemoryLogStore {
    pub target: Mutex<Option<String>>,
    pub sections: Mutex<Vec<String>>,
    pub appends: AtomicUsize,
    pub fail_append: bool,
}

impl MemoryLogStore {
    pub fn appends(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn find_target(&self, _channel: &str) -> Result<Option<String>, LogError> {
        Ok(self.target.lock().await.clone())
    }

    async fn create_target(&self, _channel: &str, header: &str) -> Result<String, LogError> {
        *self.target.lock().await = Some("F0CANVAS".into());
        self.sections.lock().await.push(header.to_string());
        Ok("F0CANVAS".into())
    }

    async fn append_section(&self, target: &str, markdown: &str) -> Result<(), LogError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        if self.fail_append {
            return Err(LogError::Append {
                target: target.into(),
                reason: "canvas_editing_failed".into(),
            });
        }
        self.sections.lock().await.push(markdown.to_string());
        Ok(())
    }
}

/// Extractor returning a fixed result, optionally after a delay.
pub struct ScriptedExtractor {
    pub result: Result<String, String>,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn ok(text: &str) -> Self {
        Self {
            result: Ok(text.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn hanging() -> Self {
        Self {
            delay: Some(Duration::from_secs(5)),
            ..Self::ok("too late")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(&self, _payload: &ReplyPayload) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone().map_err(ExtractionError::Transcription)
    }
}
