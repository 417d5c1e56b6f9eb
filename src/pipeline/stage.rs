//! Best-effort side effects.
//!
//! Every external call the pipeline makes goes through [`best_effort`]: it
//! is bounded by a timeout, attempted once, and its failure is logged with a
//! stage tag and handed back as a value. Nothing here returns `Err` to the
//! caller, so a failing stage cannot stop the ones after it.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::error;

/// Tag for a pipeline (or dispatch) step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Extract,
    Publish,
    LogAppend,
    Acknowledge,
    FailureNotice,
    Dispatch,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Publish => "publish",
            Stage::LogAppend => "log_append",
            Stage::Acknowledge => "acknowledge",
            Stage::FailureNotice => "failure_notice",
            Stage::Dispatch => "dispatch",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a stage failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    Failed(String),
    TimedOut(Duration),
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::Failed(reason) => f.write_str(reason),
            StageError::TimedOut(limit) => write!(f, "timed out after {}s", limit.as_secs_f32()),
        }
    }
}

/// Result of one best-effort step, tagged with its stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome<T> {
    pub stage: Stage,
    pub result: Result<T, StageError>,
}

impl<T> StageOutcome<T> {
    /// Build and log a failure that did not come from [`best_effort`].
    pub fn failed(stage: Stage, reason: impl Into<String>) -> Self {
        let outcome = Self {
            stage,
            result: Err(StageError::Failed(reason.into())),
        };
        outcome.log_failure();
        outcome
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn value(self) -> Option<T> {
        self.result.ok()
    }

    fn log_failure(&self) {
        if let Err(e) = &self.result {
            error!(stage = %self.stage, error = %e, "Stage failed");
        }
    }
}

/// Run `fut` once under `limit`, converting errors and timeouts into a
/// logged [`StageOutcome`].
pub async fn best_effort<T, E, F>(stage: Stage, limit: Duration, fut: F) -> StageOutcome<T>
where
    E: fmt::Display,
    F: Future<Output = Result<T, E>>,
{
    let result = match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(StageError::Failed(e.to_string())),
        Err(_) => Err(StageError::TimedOut(limit)),
    };
    let outcome = StageOutcome { stage, result };
    outcome.log_failure();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn success_passes_value_through() {
        let outcome = best_effort(Stage::Publish, LIMIT, async { Ok::<_, String>(42) }).await;
        assert_eq!(outcome.stage, Stage::Publish);
        assert_eq!(outcome.value(), Some(42));
    }

    #[tokio::test]
    async fn error_becomes_failed() {
        let outcome =
            best_effort(Stage::Acknowledge, LIMIT, async { Err::<(), _>("channel_not_found") })
                .await;
        assert_eq!(
            outcome.result,
            Err(StageError::Failed("channel_not_found".into()))
        );
    }

    #[tokio::test]
    async fn timeout_becomes_timed_out() {
        let outcome = best_effort(Stage::Extract, LIMIT, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, String>(())
        })
        .await;
        assert_eq!(outcome.result, Err(StageError::TimedOut(LIMIT)));
        assert!(!outcome.is_ok());
    }

    #[test]
    fn stage_tags() {
        assert_eq!(Stage::LogAppend.to_string(), "log_append");
        assert_eq!(Stage::FailureNotice.as_str(), "failure_notice");
    }

    #[test]
    fn error_display() {
        assert_eq!(StageError::Failed("boom".into()).to_string(), "boom");
        assert_eq!(
            StageError::TimedOut(Duration::from_secs(30)).to_string(),
            "timed out after 30s"
        );
    }
}
