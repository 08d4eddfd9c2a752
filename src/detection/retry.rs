//! Retry with exponential backoff for transient inference failures
//!
//! The control flow is an explicit state machine ([`RetryState`]) driven by
//! the pure [`transition`] function; [`with_retry`] only adds the I/O (calling
//! the operation, sleeping between attempts).

use crate::detection::config::RetryConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

/// Substrings that mark an error as fatal; checked first
const FATAL_MARKERS: &[&str] = &[
    "invalid input",
    "model not found",
    "model corrupted",
    "corrupted",
    "out of memory",
    "allocation failed",
    "syntax error",
];

/// Substrings that mark an error as transient
const TRANSIENT_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "network",
    "connection",
    "econnreset",
    "econnrefused",
    "socket hang up",
    "model not ready",
    "rate limit",
    "too many requests",
    "429",
    "502",
    "503",
    "504",
    "bad gateway",
    "service unavailable",
];

/// Classify an error as retryable
///
/// Fatal markers win over transient ones; anything matching neither list is
/// not retried.
pub fn is_retryable_error<E: Display + ?Sized>(error: &E) -> bool {
    let message = error.to_string().to_lowercase();
    if FATAL_MARKERS.iter().any(|m| message.contains(m)) {
        return false;
    }
    TRANSIENT_MARKERS.iter().any(|m| message.contains(m))
}

/// Delay before attempt `attempt` (1-based); the first attempt has none
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    if attempt < 2 {
        return Duration::ZERO;
    }
    let exponent = i32::try_from(attempt - 2).unwrap_or(i32::MAX);
    let raw = config.initial_delay_ms as f64 * config.backoff_multiplier.powi(exponent);
    let capped = raw.min(config.max_delay_ms as f64).max(0.0);
    Duration::from_millis(capped as u64)
}

/// States of a retried operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Running attempt `attempt` (1-based)
    Attempting { attempt: u32 },
    /// Waiting `delay` before `next_attempt`
    BackingOff { next_attempt: u32, delay: Duration },
    /// Operation succeeded
    Succeeded { attempts: u32 },
    /// Every allowed attempt failed with a retryable error
    FailedRetryableExhausted { attempts: u32 },
    /// An attempt failed with a non-retryable error
    FailedFatal { attempts: u32 },
}

/// Inputs to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryEvent {
    /// The current attempt returned Ok
    AttemptSucceeded,
    /// The current attempt returned Err
    AttemptFailed { retryable: bool },
    /// The backoff delay has passed
    BackoffElapsed,
}

impl RetryState {
    /// Starting state
    pub fn initial() -> Self {
        Self::Attempting { attempt: 1 }
    }

    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::FailedRetryableExhausted { .. } | Self::FailedFatal { .. }
        )
    }
}

/// Pure transition function
///
/// Events that make no sense in the current state leave it unchanged.
pub fn transition(state: RetryState, event: RetryEvent, config: &RetryConfig) -> RetryState {
    let max_attempts = config.max_retries.max(1);
    match (state, event) {
        (RetryState::Attempting { attempt }, RetryEvent::AttemptSucceeded) => {
            RetryState::Succeeded { attempts: attempt }
        }
        (RetryState::Attempting { attempt }, RetryEvent::AttemptFailed { retryable: false }) => {
            RetryState::FailedFatal { attempts: attempt }
        }
        (RetryState::Attempting { attempt }, RetryEvent::AttemptFailed { retryable: true }) => {
            if attempt >= max_attempts {
                RetryState::FailedRetryableExhausted { attempts: attempt }
            } else {
                RetryState::BackingOff {
                    next_attempt: attempt + 1,
                    delay: backoff_delay(config, attempt + 1),
                }
            }
        }
        (RetryState::BackingOff { next_attempt, .. }, RetryEvent::BackoffElapsed) => {
            RetryState::Attempting {
                attempt: next_attempt,
            }
        }
        (state, _) => state,
    }
}

/// Outcome of [`with_retry`]
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// Final value, or the last error
    pub result: Result<T, E>,
    /// Attempts made
    pub attempts: u32,
    /// Wall time including backoff
    pub total_duration: Duration,
    /// Backoff delays slept, in order
    pub delays: Vec<Duration>,
    /// Terminal state reached
    pub final_state: RetryState,
}

impl<T, E> RetryOutcome<T, E> {
    /// Whether the operation eventually succeeded
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Whether retries ran out on transient errors
    pub fn retries_exhausted(&self) -> bool {
        matches!(self.final_state, RetryState::FailedRetryableExhausted { .. })
    }
}

/// Run `operation` until it succeeds, fails fatally, or attempts run out
///
/// The closure receives the 1-based attempt number.
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, mut operation: F) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let started = Instant::now();
    let mut state = RetryState::initial();
    let mut attempt = 1;
    let mut delays = Vec::new();

    loop {
        let error = match operation(attempt).await {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                    total_duration: started.elapsed(),
                    delays,
                    final_state: transition(state, RetryEvent::AttemptSucceeded, config),
                };
            }
            Err(error) => error,
        };

        let retryable = is_retryable_error(&error);
        state = transition(state, RetryEvent::AttemptFailed { retryable }, config);
        if let RetryState::BackingOff { next_attempt, delay } = state {
            crate::log_retry_attempt!(next_attempt, config.max_retries, error.to_string());
            tokio::time::sleep(delay).await;
            delays.push(delay);
            state = transition(state, RetryEvent::BackoffElapsed, config);
            attempt = next_attempt;
            continue;
        }

        tracing::debug!(
            attempts = attempt,
            retryable,
            error = %error,
            "Operation failed permanently"
        );
        return RetryOutcome {
            result: Err(error),
            attempts: attempt,
            total_duration: started.elapsed(),
            delays,
            final_state: state,
        };
    }
}
