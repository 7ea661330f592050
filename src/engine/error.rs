//! Retry signals and engine errors.

use crate::persist::PersistError;
use std::time::Duration;
use thiserror::Error;

/// Caller-defined failure carried through the engine untouched.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A request to run the event again.
///
/// Retry signals are consumed by the engine's loop and never reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrySignal {
    /// Try again, no further detail.
    Retry,
    /// The backing store moved under us; the entity's marker was refreshed.
    StaleState,
    /// Sleep for the given duration, then try again.
    WaitAndRetry(Duration),
}

impl RetrySignal {
    pub fn wait(&self) -> Option<Duration> {
        match self {
            Self::WaitAndRetry(wait) => Some(*wait),
            _ => None,
        }
    }
}

/// Outcome of a failed action or dynamic transition.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("retry requested: {0:?}")]
    Retry(RetrySignal),

    #[error("action failed: {0}")]
    Failed(#[source] BoxError),
}

impl ActionError {
    pub fn retry() -> Self {
        Self::Retry(RetrySignal::Retry)
    }

    pub fn wait_and_retry(wait: Duration) -> Self {
        Self::Retry(RetrySignal::WaitAndRetry(wait))
    }

    pub fn failed<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Failed(error.into())
    }
}

impl From<RetrySignal> for ActionError {
    fn from(signal: RetrySignal) -> Self {
        Self::Retry(signal)
    }
}

/// Errors surfaced by `Fsm::on_event`.
#[derive(Debug, Error)]
pub enum FsmError {
    /// The retry budget ran out. Terminal; the engine does not retry further.
    #[error("too busy: event '{event}' gave up after {attempts} attempts")]
    TooBusy { event: String, attempts: usize },

    #[error("action for event '{event}' failed")]
    Action {
        event: String,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Persistence(#[from] PersistError),

    #[error("reload before retrying event '{event}' failed")]
    Reload {
        event: String,
        #[source]
        source: BoxError,
    },
}

impl FsmError {
    pub fn is_too_busy(&self) -> bool {
        matches!(self, Self::TooBusy { .. })
    }
}
