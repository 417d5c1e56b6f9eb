//! Slack Web API client.
//!
//! Thin wrapper over the handful of methods the relay needs: posting
//! messages, opening the GP's DM, the channel canvas used as the durable
//! log, and downloading private voice memo files.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::channels::traits::{ChannelPublisher, FileDownloader, LogStore};
use crate::error::{ChannelError, LogError};

/// Default Slack Web API base URL.
pub const SLACK_API_BASE: &str = "https://slack.com/api";

/// Only origin the bot token is ever sent to for file downloads.
pub const SLACK_FILE_ORIGIN: &str = "https://files.slack.com";

/// Slack truncates long messages; keep each post under its recommended size.
const SLACK_MAX_MESSAGE_LENGTH: usize = 4000;

/// Voice memo downloads are bounded separately from API calls.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Slack Web API client authenticated with a bot token.
pub struct SlackClient {
    bot_token: SecretString,
    base_url: String,
    file_origin: String,
    client: reqwest::Client,
}

impl SlackClient {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            base_url: SLACK_API_BASE.to_string(),
            file_origin: SLACK_FILE_ORIGIN.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the client at another API root (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Trust file URLs from another origin (used by tests).
    pub fn with_file_origin(mut self, origin: impl Into<String>) -> Self {
        self.file_origin = origin.into();
        self
    }

    /// Reject any file URL whose origin is not the trusted file host.
    fn check_file_url(&self, url: &str) -> Result<reqwest::Url, ChannelError> {
        let untrusted = || ChannelError::UntrustedFileUrl(url.to_string());
        let parsed = reqwest::Url::parse(url).map_err(|_| untrusted())?;
        let trusted = reqwest::Url::parse(&self.file_origin).map_err(|_| untrusted())?;
        if parsed.origin() != trusted.origin() {
            return Err(untrusted());
        }
        Ok(parsed)
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    /// POST a JSON body to a Web API method.
    async fn call(&self, method: &str, body: &Value) -> Result<Value, ChannelError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .bearer_auth(self.bot_token.expose_secret())
            .json(body)
            .send()
            .await?;
        Self::parse_response(method, resp).await
    }

    /// GET a Web API method with query parameters.
    async fn call_get(&self, method: &str, query: &[(&str, &str)]) -> Result<Value, ChannelError> {
        let resp = self
            .client
            .get(self.api_url(method))
            .bearer_auth(self.bot_token.expose_secret())
            .query(query)
            .send()
            .await?;
        Self::parse_response(method, resp).await
    }

    /// Slack answers most application errors with HTTP 200 and
    /// `{"ok": false, "error": "..."}`, so both are checked.
    async fn parse_response(method: &str, resp: reqwest::Response) -> Result<Value, ChannelError> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));

        if !status.is_success() {
            return Err(ChannelError::Api {
                method: method.to_string(),
                reason: format!("HTTP {status}: {body}"),
            });
        }

        let parsed: Value =
            serde_json::from_str(&body).map_err(|e| ChannelError::InvalidResponse {
                method: method.to_string(),
                reason: e.to_string(),
            })?;

        if parsed.get("ok").and_then(Value::as_bool) != Some(true) {
            let err = parsed
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            return Err(ChannelError::Api {
                method: method.to_string(),
                reason: err.to_string(),
            });
        }

        Ok(parsed)
    }

    /// Verify the token and return the bot's own user id.
    pub async fn auth_test(&self) -> Result<String, ChannelError> {
        let resp = self.call("auth.test", &serde_json::json!({})).await?;
        resp.get("user_id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| ChannelError::InvalidResponse {
                method: "auth.test".into(),
                reason: "missing user_id".into(),
            })
    }
}

// ── Messaging ───────────────────────────────────────────────────────

#[async_trait]
impl ChannelPublisher for SlackClient {
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), ChannelError> {
        for chunk in split_message(text, SLACK_MAX_MESSAGE_LENGTH) {
            let body = serde_json::json!({
                "channel": channel,
                "text": chunk,
            });
            self.call("chat.postMessage", &body).await?;
        }
        tracing::debug!(channel, "Slack message posted");
        Ok(())
    }

    async fn open_direct_conversation(&self, user_id: &str) -> Result<String, ChannelError> {
        let resp = self
            .call("conversations.open", &serde_json::json!({ "users": user_id }))
            .await?;
        resp.get("channel")
            .and_then(|c| c.get("id"))
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| ChannelError::InvalidResponse {
                method: "conversations.open".into(),
                reason: "missing channel.id".into(),
            })
    }
}

// ── Canvas log ──────────────────────────────────────────────────────

fn markdown_document(markdown: &str) -> Value {
    serde_json::json!({
        "type": "markdown",
        "markdown": markdown,
    })
}

#[async_trait]
impl LogStore for SlackClient {
    async fn find_target(&self, channel: &str) -> Result<Option<String>, LogError> {
        let resp = self
            .call_get("conversations.info", &[("channel", channel)])
            .await
            .map_err(|e| LogError::Lookup {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        let canvas_id = resp
            .get("channel")
            .and_then(|c| c.get("properties"))
            .and_then(|p| p.get("canvas"))
            .and_then(|c| c.get("file_id"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(String::from);

        if let Some(ref id) = canvas_id {
            tracing::debug!(channel, canvas = %id, "Found existing canvas");
        }
        Ok(canvas_id)
    }

    async fn create_target(
        &self,
        channel: &str,
        header_markdown: &str,
    ) -> Result<String, LogError> {
        let body = serde_json::json!({
            "channel_id": channel,
            "document_content": markdown_document(header_markdown),
        });
        let resp = self
            .call("conversations.canvases.create", &body)
            .await
            .map_err(|e| LogError::Create {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        resp.get("canvas_id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| LogError::Create {
                channel: channel.to_string(),
                reason: "response missing canvas_id".into(),
            })
    }

    async fn append_section(&self, target: &str, markdown: &str) -> Result<(), LogError> {
        let body = serde_json::json!({
            "canvas_id": target,
            "changes": [{
                "operation": "insert_at_end",
                "document_content": markdown_document(markdown),
            }],
        });
        self.call("canvases.edit", &body)
            .await
            .map_err(|e| LogError::Append {
                target: target.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

// ── Files ───────────────────────────────────────────────────────────

#[async_trait]
impl FileDownloader for SlackClient {
    async fn download(&self, url: &str) -> Result<Vec<u8>, ChannelError> {
        let url = self.check_file_url(url)?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(self.bot_token.expose_secret())
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ChannelError::Http(format!(
                "file download failed (HTTP {status})"
            )));
        }
        let bytes = resp.bytes().await?;
        tracing::debug!(bytes = bytes.len(), "Downloaded Slack file");
        Ok(bytes.to_vec())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Split a message into chunks of at most `max_len` bytes.
/// Tries to split on newlines, then spaces, then hard-cuts on a char boundary.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }
        let window = &remaining[..limit];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}
