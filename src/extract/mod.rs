//! Reply extraction: turns a payload into response text.

pub mod whisper;

use async_trait::async_trait;

use crate::error::ExtractionError;
use crate::pipeline::types::ReplyPayload;

pub use whisper::WhisperExtractor;

/// Converts a reply payload into its response text.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, payload: &ReplyPayload) -> Result<String, ExtractionError>;
}
