//! Configuration types.
//!
//! Everything here is static: it is read once at process start (after
//! `.env` has been loaded) and handed to the components that need it.
//!
//! The dispatch schedule is evaluated in the process timezone, so `TZ`
//! (for example `TZ=America/Toronto`) decides when prompts go out.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default cron expression: 09:00 local time on Monday, Wednesday and Friday.
pub const DEFAULT_PROMPT_SCHEDULE: &str = "0 0 9 * * Mon,Wed,Fri";

/// Default title of the channel canvas header.
pub const DEFAULT_LOG_TITLE: &str = "Content Ideas Log";

/// Where the rotation pointer lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateBackend {
    /// JSON file `{"index": n}`.
    File,
    /// Single-row table in a libSQL database file.
    LibSql,
}

/// Per-stage bounds applied to every external call.
#[derive(Debug, Clone, Copy)]
pub struct StageTimeouts {
    /// Download + transcription.
    pub extract: Duration,
    /// Publish, log append, acknowledge and failure notices.
    pub effect: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            extract: Duration::from_secs(120),
            effect: Duration::from_secs(30),
        }
    }
}

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Slack bot token (`xoxb-...`).
    pub slack_bot_token: SecretString,
    /// Slack signing secret. Every events request must carry a valid signature.
    pub slack_signing_secret: SecretString,
    /// The single authorized sender (Slack user id of the GP).
    pub gp_user_id: String,
    /// Team channel that receives transcripts and owns the canvas log.
    pub publish_channel_id: String,
    /// OpenAI API key used for transcription.
    pub openai_api_key: SecretString,
    /// Transcription model name.
    pub transcription_model: String,
    /// Cron expression (seconds first) for prompt dispatch, in local time.
    pub prompt_schedule: String,
    /// Value of the process `TZ` variable, which sets the timezone the
    /// schedule is evaluated in. `None` means the system timezone.
    pub timezone: Option<String>,
    /// Rotation store backend.
    pub state_backend: StateBackend,
    /// Rotation store location.
    pub state_path: PathBuf,
    /// Optional prompt list override, one prompt per line.
    pub prompts_file: Option<PathBuf>,
    /// Port for the Slack events server.
    pub port: u16,
    /// Title of the canvas header document.
    pub log_title: String,
    /// Accept plain text replies in addition to voice memos.
    pub accept_text_replies: bool,
    /// Stage timeouts.
    pub timeouts: StageTimeouts,
    /// Directory for a daily rolling log file.
    pub log_dir: Option<PathBuf>,
}

impl RelayConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.into()));

        let state_backend = match get("RELAY_STATE_BACKEND").as_deref() {
            None | Some("file") => StateBackend::File,
            Some("libsql") => StateBackend::LibSql,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "RELAY_STATE_BACKEND".into(),
                    message: format!("expected 'file' or 'libsql', got '{other}'"),
                });
            }
        };

        let default_state_path = match state_backend {
            StateBackend::File => "./data/prompt_state.json",
            StateBackend::LibSql => "./data/memo-relay.db",
        };

        let defaults = StageTimeouts::default();
        let timeouts = StageTimeouts {
            extract: parse_secs(&get, "RELAY_EXTRACT_TIMEOUT_SECS", defaults.extract)?,
            effect: parse_secs(&get, "RELAY_EFFECT_TIMEOUT_SECS", defaults.effect)?,
        };

        let port = match get("RELAY_PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "RELAY_PORT".into(),
                message: format!("{e}"),
            })?,
            None => 3000,
        };

        let accept_text_replies = match get("RELAY_ACCEPT_TEXT_REPLIES") {
            Some(raw) => parse_bool("RELAY_ACCEPT_TEXT_REPLIES", &raw)?,
            None => false,
        };

        let prompt_schedule =
            get("RELAY_PROMPT_SCHEDULE").unwrap_or_else(|| DEFAULT_PROMPT_SCHEDULE.to_string());
        crate::dispatch::DispatchSchedule::parse(&prompt_schedule)?;

        Ok(Self {
            slack_bot_token: SecretString::from(required("SLACK_BOT_TOKEN")?),
            slack_signing_secret: SecretString::from(required("SLACK_SIGNING_SECRET")?),
            gp_user_id: required("GP_SLACK_USER_ID")?,
            publish_channel_id: required("PUBLISH_CHANNEL_ID")?,
            openai_api_key: SecretString::from(required("OPENAI_API_KEY")?),
            transcription_model: get("OPENAI_TRANSCRIPTION_MODEL")
                .unwrap_or_else(|| "whisper-1".to_string()),
            prompt_schedule,
            timezone: get("TZ"),
            state_backend,
            state_path: get("RELAY_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default_state_path)),
            prompts_file: get("RELAY_PROMPTS_FILE").map(PathBuf::from),
            port,
            log_title: get("RELAY_LOG_TITLE").unwrap_or_else(|| DEFAULT_LOG_TITLE.to_string()),
            accept_text_replies,
            timeouts,
            log_dir: get("RELAY_LOG_DIR").map(PathBuf::from),
        })
    }
}

fn parse_secs<G>(get: &G, key: &str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
        key: key.into(),
        message: format!("{e}"),
    })?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.into(),
            message: "timeout must be at least one second".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.into(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}
