//! Speech-to-text through the OpenAI transcription endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info};

use crate::channels::FileDownloader;
use crate::error::ExtractionError;
use crate::extract::Extractor;
use crate::pipeline::guard::AUDIO_FILETYPES;
use crate::pipeline::types::{Attachment, ReplyPayload};

/// Default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Extension used when the attachment name carries no audio extension.
const FALLBACK_EXTENSION: &str = "mp4";

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Downloads voice memos and transcribes them with Whisper.
///
/// Text payloads pass through unchanged (trimmed).
pub struct WhisperExtractor {
    downloader: Arc<dyn FileDownloader>,
    api_key: SecretString,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl WhisperExtractor {
    pub fn new(
        downloader: Arc<dyn FileDownloader>,
        api_key: SecretString,
        model: impl Into<String>,
    ) -> Self {
        Self {
            downloader,
            api_key,
            model: model.into(),
            base_url: OPENAI_API_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn transcribe(&self, attachment: &Attachment) -> Result<String, ExtractionError> {
        let url = attachment
            .download_url
            .as_deref()
            .ok_or_else(|| ExtractionError::MissingUrl(attachment.id.clone()))?;

        let audio = self
            .downloader
            .download(url)
            .await
            .map_err(|e| ExtractionError::Download(e.to_string()))?;
        debug!(attachment = %attachment.id, bytes = audio.len(), "Voice memo downloaded");

        let part = Part::bytes(audio).file_name(upload_file_name(attachment));
        let form = Form::new()
            .text("model", self.model.clone())
            .part("file", part);

        let resp = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| ExtractionError::Transcription(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ExtractionError::Transcription(format!(
                "HTTP {status}: {body}"
            )));
        }

        let parsed: TranscriptionResponse = resp
            .json()
            .await
            .map_err(|e| ExtractionError::Transcription(format!("invalid response: {e}")))?;

        let text = parsed.text.trim().to_string();
        if text.is_empty() {
            return Err(ExtractionError::Empty);
        }
        info!(attachment = %attachment.id, chars = text.len(), "Voice memo transcribed");
        Ok(text)
    }
}

#[async_trait]
impl Extractor for WhisperExtractor {
    async fn extract(&self, payload: &ReplyPayload) -> Result<String, ExtractionError> {
        match payload {
            ReplyPayload::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(ExtractionError::Empty);
                }
                Ok(text.to_string())
            }
            ReplyPayload::Audio(attachment) => self.transcribe(attachment).await,
        }
    }
}

/// File name sent with the upload; the endpoint infers the format from it.
fn upload_file_name(attachment: &Attachment) -> String {
    let from_name = attachment
        .name
        .as_deref()
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| AUDIO_FILETYPES.contains(&ext.as_str()));
    let from_filetype = attachment
        .filetype
        .as_deref()
        .filter(|t| AUDIO_FILETYPES.contains(t))
        .map(String::from);
    let ext = from_name
        .or(from_filetype)
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());
    format!("{}.{ext}", attachment.id)
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::error::ChannelError;

    struct StaticDownloader {
        result: Result<Vec<u8>, String>,
    }

    #[async_trait]
    impl FileDownloader for StaticDownloader {
        async fn download(&self, _url: &str) -> Result<Vec<u8>, ChannelError> {
            self.result.clone().map_err(ChannelError::Http)
        }
    }

    fn extractor(server: &MockServer, download: Result<Vec<u8>, String>) -> WhisperExtractor {
        WhisperExtractor::new(
            Arc::new(StaticDownloader { result: download }),
            SecretString::from("sk-test"),
            "whisper-1",
        )
        .with_base_url(server.uri())
    }

    fn memo() -> ReplyPayload {
        ReplyPayload::Audio(Attachment {
            id: "F1".into(),
            name: Some("audio_message.m4a".into()),
            mime_type: Some("audio/mp4".into()),
            filetype: Some("m4a".into()),
            download_url: Some("https://files.slack.com/F1/download".into()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn transcribes_voice_memo() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "text": "  Founders ship faster.  " })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let text = extractor(&server, Ok(vec![0u8; 16]))
            .extract(&memo())
            .await
            .unwrap();
        assert_eq!(text, "Founders ship faster.");
    }

    #[tokio::test]
    async fn api_error_is_transcription_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = extractor(&server, Ok(vec![1]))
            .extract(&memo())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Transcription(ref m) if m.contains("429")));
    }

    #[tokio::test]
    async fn empty_transcript_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "text": "" })))
            .mount(&server)
            .await;

        let err = extractor(&server, Ok(vec![1]))
            .extract(&memo())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Empty));
    }

    #[tokio::test]
    async fn download_failure_skips_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = extractor(&server, Err("HTTP 403".into()))
            .extract(&memo())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Download(_)));
    }

    #[tokio::test]
    async fn missing_url_is_error() {
        let server = MockServer::start().await;
        let payload = ReplyPayload::Audio(Attachment {
            id: "F9".into(),
            ..Default::default()
        });
        let err = extractor(&server, Ok(vec![1]))
            .extract(&payload)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::MissingUrl(ref id) if id == "F9"));
    }

    #[tokio::test]
    async fn text_passes_through() {
        let server = MockServer::start().await;
        let e = extractor(&server, Ok(vec![]));
        assert_eq!(
            e.extract(&ReplyPayload::Text(" my take \n".into())).await.unwrap(),
            "my take"
        );
        assert!(matches!(
            e.extract(&ReplyPayload::Text("  ".into())).await,
            Err(ExtractionError::Empty)
        ));
    }

    #[test]
    fn upload_name_prefers_attachment_extension() {
        let a = Attachment {
            id: "F1".into(),
            name: Some("Memo.OGG".into()),
            filetype: Some("webm".into()),
            ..Default::default()
        };
        assert_eq!(upload_file_name(&a), "F1.ogg");
    }

    #[test]
    fn upload_name_falls_back_to_filetype_then_mp4() {
        let by_type = Attachment {
            id: "F2".into(),
            name: Some("voice clip".into()),
            filetype: Some("webm".into()),
            ..Default::default()
        };
        assert_eq!(upload_file_name(&by_type), "F2.webm");

        let unknown = Attachment {
            id: "F3".into(),
            ..Default::default()
        };
        assert_eq!(upload_file_name(&unknown), "F3.mp4");
    }
}
