//! Log entry formatting.

use chrono::{DateTime, Utc};

/// Date format used in entries and channel posts (`March 04, 2026`).
pub const DATE_FORMAT: &str = "%B %d, %Y";

/// One accepted reply, as written to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub date: String,
    pub prompt: String,
    pub response: String,
}

impl LogEntry {
    pub fn new(at: DateTime<Utc>, prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            date: format_date(at),
            prompt: prompt.into(),
            response: response.into(),
        }
    }

    /// Markdown section appended at the end of the log document.
    pub fn to_markdown(&self) -> String {
        format!(
            "## {}\n**Prompt:** {}\n\n**Transcript:**\n{}\n\n---",
            self.date, self.prompt, self.response
        )
    }
}

pub fn format_date(at: DateTime<Utc>) -> String {
    at.format(DATE_FORMAT).to_string()
}

/// Header document written when the log target is first created.
pub fn header_markdown(title: &str) -> String {
    format!("# {title}\nEach entry below is a transcribed voice memo from the GP.\n\n---")
}
