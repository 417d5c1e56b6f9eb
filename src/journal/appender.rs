//! Log appender: create-or-reuse the channel's log target and append entries.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::channels::LogStore;
use crate::error::LogError;
use crate::journal::entry::{LogEntry, header_markdown};
use crate::pipeline::stage::{Stage, StageOutcome, best_effort};

/// Appends entries to the single log target of a channel.
///
/// Every failure is caught, logged and returned as a [`StageOutcome`]. No
/// method here returns an error.
pub struct LogAppender {
    store: Arc<dyn LogStore>,
    header: String,
    timeout: Duration,
}

impl LogAppender {
    pub fn new(store: Arc<dyn LogStore>, title: &str, timeout: Duration) -> Self {
        Self {
            store,
            header: header_markdown(title),
            timeout,
        }
    }

    /// Find the channel's log target, creating it if there is none.
    ///
    /// Existence is checked on every call, so repeated calls reuse the same
    /// target and never create a second one.
    pub async fn ensure_log_target(&self, channel: &str) -> Option<String> {
        best_effort(Stage::LogAppend, self.timeout, self.find_or_create(channel))
            .await
            .value()
    }

    async fn find_or_create(&self, channel: &str) -> Result<String, LogError> {
        if let Some(existing) = self.store.find_target(channel).await? {
            return Ok(existing);
        }
        info!(channel, "No log target found, creating one");
        let created = self.store.create_target(channel, &self.header).await?;
        info!(channel, log_target = %created, "Created log target");
        Ok(created)
    }

    /// Append one entry at the end of `target`.
    pub async fn append(&self, target: &str, entry: &LogEntry) -> StageOutcome<()> {
        let markdown = entry.to_markdown();
        let outcome = best_effort(
            Stage::LogAppend,
            self.timeout,
            self.store.append_section(target, &markdown),
        )
        .await;
        if outcome.is_ok() {
            info!(log_target = %target, date = %entry.date, "Entry appended to log");
        }
        outcome
    }

    /// Ensure the channel's target exists, then append `entry` to it.
    pub async fn record(&self, channel: &str, entry: &LogEntry) -> StageOutcome<()> {
        match self.ensure_log_target(channel).await {
            Some(target) => self.append(&target, entry).await,
            None => {
                warn!(channel, "Skipping log append: no log target");
                StageOutcome::failed(
                    Stage::LogAppend,
                    LogError::Unavailable {
                        channel: channel.to_string(),
                    }
                    .to_string(),
                )
            }
        }
    }
}
