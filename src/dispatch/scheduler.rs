//! Cron schedule for prompt dispatch.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use tracing::{info, warn};

use crate::dispatch::PromptDispatcher;
use crate::error::ConfigError;

/// Parsed cron expression (seconds first, as the `cron` crate expects).
#[derive(Debug, Clone)]
pub struct DispatchSchedule {
    expression: String,
    schedule: cron::Schedule,
}

impl DispatchSchedule {
    pub fn parse(expression: &str) -> Result<Self, ConfigError> {
        let schedule =
            cron::Schedule::from_str(expression).map_err(|e| ConfigError::InvalidValue {
                key: "RELAY_PROMPT_SCHEDULE".into(),
                message: format!("invalid cron '{expression}': {e}"),
            })?;
        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`, in the same timezone.
    pub fn next_after<Z: TimeZone>(&self, after: &DateTime<Z>) -> Option<DateTime<Z>> {
        self.schedule.after(after).next()
    }
}

/// Spawn the dispatch loop: sleep until each fire time, then send a prompt.
///
/// Fire times are evaluated in the process-local timezone, which `TZ` sets.
pub fn spawn_dispatch_loop(
    dispatcher: Arc<PromptDispatcher>,
    schedule: DispatchSchedule,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_fire: Option<DateTime<Local>> = None;
        loop {
            let now = Local::now();
            let from = match last_fire {
                Some(last) if last > now => last,
                _ => now,
            };
            let Some(next) = schedule.next_after(&from) else {
                warn!(schedule = %schedule.expression(), "Schedule has no upcoming fire times, dispatch loop stopping");
                break;
            };

            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(next = %next, "Next prompt dispatch scheduled");
            tokio::time::sleep(wait).await;

            dispatcher.dispatch_once().await;
            last_fire = Some(next);
        }
    })
}
