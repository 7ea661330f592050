//! Retry budget and pacing.

use crate::engine::RetrySignal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How hard the engine tries before giving up with `TooBusy`.
///
/// Deserializable so surrounding layers can load it with the rest of their
/// configuration:
///
/// ```rust
/// use statekeeper::engine::RetryPolicy;
///
/// let policy = RetryPolicy::from_json(r#"{ "max_retries": 5, "retry_interval_ms": 10 }"#).unwrap();
/// assert_eq!(policy.max_retries, 5);
///
/// let defaults = RetryPolicy::from_json("{}").unwrap();
/// assert_eq!(defaults, RetryPolicy::default());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts per event, counting the first.
    pub max_retries: usize,

    /// Pause before retrying when the signal names no wait of its own.
    pub retry_interval_ms: Option<u64>,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_RETRIES: usize = 20;

    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            retry_interval_ms: None,
        }
    }

    /// Pause for `interval` between retries.
    ///
    /// Stored in whole milliseconds, rounded up so a short pause never
    /// becomes none. A zero interval clears it.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        let millis = interval.as_nanos().div_ceil(1_000_000);
        self.retry_interval_ms = match millis {
            0 => None,
            ms => Some(u64::try_from(ms).unwrap_or(u64::MAX)),
        };
        self
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn retry_interval(&self) -> Option<Duration> {
        self.retry_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// How long to sleep after `signal` before the next attempt.
    pub fn pause_for(&self, signal: &RetrySignal) -> Option<Duration> {
        signal.wait().or_else(|| self.retry_interval())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RETRIES)
    }
}
