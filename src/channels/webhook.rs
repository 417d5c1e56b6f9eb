//! Slack Events API endpoint.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::{ExposeSecret, SecretString};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::channels::events::{SlackEnvelope, parse_envelope};
use crate::channels::signature::verify_slack_signature;
use crate::pipeline::ReplyPipeline;
use crate::prompts::PromptLedger;

const SIGNATURE_HEADER: &str = "x-slack-signature";
const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
const RETRY_HEADER: &str = "x-slack-retry-num";

/// Shared state for the events routes.
#[derive(Clone)]
pub struct EventsState {
    pub pipeline: Arc<ReplyPipeline>,
    pub ledger: Arc<PromptLedger>,
    /// Every request to `/slack/events` must be signed with this.
    pub signing_secret: SecretString,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn signature_valid(secret: &SecretString, headers: &HeaderMap, body: &[u8]) -> bool {
    let (Some(ts), Some(sig)) = (
        header_str(headers, TIMESTAMP_HEADER),
        header_str(headers, SIGNATURE_HEADER),
    ) else {
        return false;
    };
    verify_slack_signature(
        secret.expose_secret(),
        ts,
        body,
        sig,
        chrono::Utc::now().timestamp(),
    )
}

/// POST /slack/events
///
/// Acknowledges within Slack's 3 second window; accepted replies are
/// processed on a spawned task.
async fn slack_events(
    State(state): State<EventsState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !signature_valid(&state.signing_secret, &headers, &body) {
        warn!("Rejected Slack request with invalid signature");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    if let Some(retry) = header_str(&headers, RETRY_HEADER) {
        debug!(retry, "Ignoring Slack retry delivery");
        return StatusCode::OK.into_response();
    }

    let envelope = match parse_envelope(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "Unparseable Slack payload");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match envelope {
        SlackEnvelope::UrlVerification { challenge } => {
            Json(serde_json::json!({ "challenge": challenge })).into_response()
        }
        SlackEnvelope::EventCallback { event_id, event } => {
            if let Some(reply) = event.into_reply(event_id) {
                let pipeline = state.pipeline.clone();
                tokio::spawn(async move {
                    pipeline.handle(reply).await;
                });
            }
            StatusCode::OK.into_response()
        }
        SlackEnvelope::Other => StatusCode::OK.into_response(),
    }
}

/// GET /health
async fn health(State(state): State<EventsState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "pointer": state.ledger.pointer().await,
    }))
}

/// Build the events router.
pub fn events_routes(state: EventsState) -> Router {
    Router::new()
        .route("/slack/events", post(slack_events))
        .route("/health", get(health))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
