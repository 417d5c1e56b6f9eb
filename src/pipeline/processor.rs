//! Reply processor: runs an accepted reply through every stage.
//!
//! Flow, per payload:
//! 1. Extract (voice memo → transcript)
//! 2. Correlate (which prompt is this answering)
//! 3. Publish to the team channel
//! 4. Append to the channel's log
//! 5. Acknowledge to the sender
//!
//! Only an extraction failure stops a payload, and then only that payload.
//! Failures in stages 3 to 5 are logged and recorded in the outcome.

use std::sync::Arc;

use chrono::Utc;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use crate::channels::ChannelPublisher;
use crate::config::StageTimeouts;
use crate::extract::Extractor;
use crate::journal::{LogAppender, LogEntry};
use crate::pipeline::guard::ReplyGuard;
use crate::pipeline::messages;
use crate::pipeline::stage::{Stage, best_effort};
use crate::pipeline::types::{Disposition, ReplyEvent, ReplyOutcome, ReplyPayload};
use crate::prompts::Correlator;

/// The publication pipeline.
pub struct ReplyPipeline {
    guard: ReplyGuard,
    extractor: Arc<dyn Extractor>,
    correlator: Arc<dyn Correlator>,
    publisher: Arc<dyn ChannelPublisher>,
    appender: Arc<LogAppender>,
    publish_channel: String,
    timeouts: StageTimeouts,
}

impl ReplyPipeline {
    pub fn new(
        guard: ReplyGuard,
        extractor: Arc<dyn Extractor>,
        correlator: Arc<dyn Correlator>,
        publisher: Arc<dyn ChannelPublisher>,
        appender: Arc<LogAppender>,
        publish_channel: impl Into<String>,
        timeouts: StageTimeouts,
    ) -> Self {
        Self {
            guard,
            extractor,
            correlator,
            publisher,
            appender,
            publish_channel: publish_channel.into(),
            timeouts,
        }
    }

    /// Validate an event and, if accepted, process each payload in order.
    ///
    /// Never returns an error: collaborator failures end up in the
    /// returned outcomes and in the logs.
    pub async fn handle(&self, event: ReplyEvent) -> Disposition {
        let payloads = match self.guard.accept(&event) {
            Ok(payloads) => payloads,
            Err(rejection) => {
                debug!(
                    id = %event.id,
                    sender = %event.sender,
                    reason = %rejection,
                    "Ignoring event"
                );
                return Disposition::Ignored(rejection);
            }
        };

        let run_id = Uuid::new_v4();
        let span = info_span!("reply", run_id = %run_id, event = %event.id);
        async {
            info!(payloads = payloads.len(), "Processing reply");

            let mut outcomes = Vec::with_capacity(payloads.len());
            for payload in &payloads {
                outcomes.push(self.process_payload(&event, payload).await);
            }

            let delivered = outcomes
                .iter()
                .filter(|o| matches!(o, ReplyOutcome::Delivered { .. }))
                .count();
            info!(delivered, total = outcomes.len(), "Reply processing complete");
            Disposition::Processed { run_id, outcomes }
        }
        .instrument(span)
        .await
    }

    async fn process_payload(&self, event: &ReplyEvent, payload: &ReplyPayload) -> ReplyOutcome {
        // Stage 1: extract
        let extracted = best_effort(
            Stage::Extract,
            self.timeouts.extract,
            self.extractor.extract(payload),
        )
        .await;
        let response = match extracted.result {
            Ok(text) => text,
            Err(e) => {
                let reason = e.to_string();
                self.notify_extraction_failure(event, &reason).await;
                return ReplyOutcome::ExtractionFailed {
                    payload: payload.label().to_string(),
                    reason,
                };
            }
        };

        // Stage 2: correlate
        let prompt = self.correlator.resolve_prompt_for_reply(event).await;
        info!(payload = payload.label(), prompt = %prompt, "Reply correlated");

        let entry = LogEntry::new(Utc::now(), prompt.clone(), response.clone());

        // Stage 3: publish
        let post = messages::publication_message(&entry.date, &entry.prompt, &entry.response);
        let published = best_effort(
            Stage::Publish,
            self.timeouts.effect,
            self.publisher.post_message(&self.publish_channel, &post),
        )
        .await
        .is_ok();

        // Stage 4: log append
        let logged = self
            .appender
            .record(&self.publish_channel, &entry)
            .await
            .is_ok();

        // Stage 5: acknowledge
        let ack = messages::acknowledgment_message(&self.publish_channel);
        let acknowledged = best_effort(
            Stage::Acknowledge,
            self.timeouts.effect,
            self.publisher.post_message(&event.conversation_id, &ack),
        )
        .await
        .is_ok();

        ReplyOutcome::Delivered {
            prompt,
            response,
            published,
            logged,
            acknowledged,
        }
    }

    /// Tell the sender and the team channel that extraction failed.
    async fn notify_extraction_failure(&self, event: &ReplyEvent, reason: &str) {
        best_effort(
            Stage::FailureNotice,
            self.timeouts.effect,
            self.publisher
                .post_message(&event.conversation_id, messages::SENDER_FAILURE_NOTICE),
        )
        .await;

        let notice = messages::channel_failure_notice(reason);
        best_effort(
            Stage::FailureNotice,
            self.timeouts.effect,
            self.publisher.post_message(&self.publish_channel, &notice),
        )
        .await;
    }
}
