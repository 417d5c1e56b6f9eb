use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use memo_relay::channels::{EventsState, SlackClient, events_routes};
use memo_relay::config::{RelayConfig, StateBackend};
use memo_relay::dispatch::{DispatchSchedule, PromptDispatcher, spawn_dispatch_loop};
use memo_relay::extract::WhisperExtractor;
use memo_relay::journal::LogAppender;
use memo_relay::pipeline::{ReplyGuard, ReplyPipeline};
use memo_relay::prompts::{
    FileRotationStore, LastSentCorrelator, LibSqlRotationStore, PromptLedger, PromptList,
    RotationStore,
};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Console logging, plus a daily rolling file when `log_dir` is set.
///
/// The returned guard must live until shutdown so buffered lines get flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    match log_dir {
        Some(dir) => {
            let file = tracing_appender::rolling::daily(dir, "memo-relay.log");
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::registry()
                .with(env_filter())
                .with(tracing_subscriber::fmt::layer().with_target(false))
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_target(false)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = RelayConfig::from_env().context("failed to load configuration")?;
    let _log_guard = init_tracing(config.log_dir.as_deref());

    eprintln!("🎙️ memo-relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Schedule: {} (local time)", config.prompt_schedule);
    eprintln!(
        "   Timezone: {}",
        config.timezone.as_deref().unwrap_or("system default (set TZ to change)")
    );
    eprintln!("   Events:   http://0.0.0.0:{}/slack/events", config.port);

    // Prompt rotation
    let prompts = match &config.prompts_file {
        Some(path) => PromptList::from_file(path)
            .await
            .with_context(|| format!("failed to load prompts from {}", path.display()))?,
        None => PromptList::default(),
    };
    let store: Arc<dyn RotationStore> = match config.state_backend {
        StateBackend::File => Arc::new(FileRotationStore::new(&config.state_path)),
        StateBackend::LibSql => Arc::new(
            LibSqlRotationStore::new_local(&config.state_path)
                .await
                .context("failed to open rotation database")?,
        ),
    };
    let ledger = Arc::new(PromptLedger::load(prompts, store).await);

    // Slack
    let slack = Arc::new(SlackClient::new(config.slack_bot_token.clone()));
    match slack.auth_test().await {
        Ok(bot_user) => tracing::info!(bot_user = %bot_user, "Slack token verified"),
        Err(e) => tracing::warn!(error = %e, "Slack auth.test failed, continuing"),
    }

    // Reply pipeline
    let extractor = Arc::new(WhisperExtractor::new(
        slack.clone(),
        config.openai_api_key.clone(),
        config.transcription_model.clone(),
    ));
    let appender = Arc::new(LogAppender::new(
        slack.clone(),
        &config.log_title,
        config.timeouts.effect,
    ));
    let pipeline = Arc::new(ReplyPipeline::new(
        ReplyGuard::new(config.gp_user_id.clone(), config.accept_text_replies),
        extractor,
        Arc::new(LastSentCorrelator::new(ledger.clone())),
        slack.clone(),
        appender,
        config.publish_channel_id.clone(),
        config.timeouts,
    ));

    // Scheduled dispatch
    let schedule = DispatchSchedule::parse(&config.prompt_schedule)?;
    let dispatcher = Arc::new(PromptDispatcher::new(
        ledger.clone(),
        slack.clone(),
        config.gp_user_id.clone(),
        config.timeouts.effect,
    ));
    let dispatch_handle = spawn_dispatch_loop(dispatcher, schedule);

    // Events server
    let app = events_routes(EventsState {
        pipeline,
        ledger,
        signing_secret: config.slack_signing_secret.clone(),
    });
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Slack events server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("events server failed")?;

    dispatch_handle.abort();
    Ok(())
}
