//! Error types for memo-relay.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rotation pointer persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Stored rotation state is corrupt: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Chat platform errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Slack {method} failed: {reason}")]
    Api { method: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid response from Slack {method}: {reason}")]
    InvalidResponse { method: String, reason: String },

    #[error("Invalid event payload: {0}")]
    InvalidEvent(String),

    #[error("Refusing to download from untrusted URL: {0}")]
    UntrustedFileUrl(String),
}

impl From<reqwest::Error> for ChannelError {
    fn from(e: reqwest::Error) -> Self {
        ChannelError::Http(e.to_string())
    }
}

/// Reply extraction (download + transcription) errors.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Failed to download voice memo: {0}")]
    Download(String),

    #[error("Attachment {0} has no download URL")]
    MissingUrl(String),

    #[error("Transcription request failed: {0}")]
    Transcription(String),

    #[error("Transcription returned no text")]
    Empty,
}

/// Durable log (canvas) errors.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Could not look up log target for {channel}: {reason}")]
    Lookup { channel: String, reason: String },

    #[error("Could not create log target for {channel}: {reason}")]
    Create { channel: String, reason: String },

    #[error("Could not append to log target {target}: {reason}")]
    Append { target: String, reason: String },

    #[error("No log target available for {channel}")]
    Unavailable { channel: String },
}
