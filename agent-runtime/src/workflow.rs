//! Workflow-level retry and panic recovery, wrapping a whole run.
//!
//! The turn loop itself never retries a failed model or tool call — that is
//! left to a pluggable retry policy wrapping the `Model` implementation.
//! What this module adds is an outer retry around the *entire run*, plus
//! panic containment, for callers running the engine unattended as part of
//! a longer workflow.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use thiserror::Error;

use crate::state::StateStore;

/// Controls how a workflow run retries on failure.
#[derive(Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first. `1` means no retry.
    pub max_attempts: usize,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub exponential_factor: f64,
    /// An error is retryable only if its `Display` text contains one of
    /// these substrings. Empty means every error is retryable.
    pub retryable_error_substrings: Vec<String>,
    /// Invoked before each attempt after the first, with the 1-based attempt
    /// number about to run and the error that caused the prior attempt to
    /// fail.
    pub on_attempt: Option<Arc<dyn Fn(usize, &str) + Send + Sync>>,
}

impl std::fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("exponential_factor", &self.exponential_factor)
            .field("retryable_error_substrings", &self.retryable_error_substrings)
            .field("on_attempt", &self.on_attempt.as_ref().map(|_| "Fn"))
            .finish()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_millis(200),
            exponential_factor: 2.0,
            retryable_error_substrings: Vec::new(),
            on_attempt: None,
        }
    }
}

impl RetryConfig {
    fn is_retryable(&self, message: &str) -> bool {
        self.retryable_error_substrings.is_empty()
            || self.retryable_error_substrings.iter().any(|s| message.contains(s.as_str()))
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        let scale = self.exponential_factor.powi(attempt as i32 - 1);
        Duration::from_secs_f64(self.base_delay.as_secs_f64() * scale)
    }
}

/// Configuration for running the engine as a managed workflow: retry,
/// checkpointing, and panic recovery layered on top of a plain run.
pub struct WorkflowConfig {
    /// Outer retry policy wrapping the whole run. `None` disables retry.
    pub retry: Option<RetryConfig>,
    /// Where to persist checkpoints, if any.
    pub state_store: Option<Arc<dyn StateStore>>,
    /// Checkpoint after this many turns elapse. Not enforced against
    /// specific state mutations — treated as "at least once per interval
    /// while the run is active".
    pub checkpoint_interval_turns: usize,
    /// Invoked if the run panics. If absent, a panic surfaces as
    /// [`WorkflowError::Panic`].
    pub on_panic: Option<Arc<dyn Fn(&str) + Send + Sync>>,
}

impl std::fmt::Debug for WorkflowConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowConfig")
            .field("retry", &self.retry)
            .field("has_state_store", &self.state_store.is_some())
            .field("checkpoint_interval_turns", &self.checkpoint_interval_turns)
            .field("on_panic", &self.on_panic.as_ref().map(|_| "Fn"))
            .finish()
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self { retry: None, state_store: None, checkpoint_interval_turns: 1, on_panic: None }
    }
}

/// Failures from the outer workflow recovery wrapper, distinct from
/// [`agent_loop::LoopError`] which covers a single attempt.
#[derive(Debug, Error)]
pub enum WorkflowError<E: std::fmt::Display> {
    /// Every retry attempt was exhausted.
    #[error("workflow run failed after {attempts} attempt(s): {source}")]
    Exhausted {
        /// Attempts made.
        attempts: usize,
        /// The last attempt's error.
        source: E,
    },
    /// The run panicked and no `on_panic` handler was configured.
    #[error("workflow run panicked: {0}")]
    Panic(String),
}

/// Run `attempt` to completion, retrying per `config.retry` and containing
/// panics per `config.on_panic`.
///
/// `attempt` is called once per try; it must be re-runnable (no partial side
/// effects that would corrupt a subsequent attempt), which holds for the
/// engine's turn loop since each call constructs a fresh `RunResult`.
pub async fn run_with_recovery<F, Fut, T, E>(config: &WorkflowConfig, mut attempt: F) -> Result<T, WorkflowError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = config.retry.as_ref().map_or(1, |r| r.max_attempts.max(1));
    let mut last_error: Option<E> = None;

    for attempt_number in 1..=max_attempts {
        let outcome = AssertUnwindSafe(attempt()).catch_unwind().await;

        let result = match outcome {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(&panic);
                return match &config.on_panic {
                    Some(handler) => {
                        handler(&message);
                        Err(WorkflowError::Panic(message))
                    }
                    None => Err(WorkflowError::Panic(message)),
                };
            }
        };

        match result {
            Ok(value) => return Ok(value),
            Err(error) => {
                let message = error.to_string();
                let retry = config.retry.as_ref();
                let can_retry = attempt_number < max_attempts && retry.is_some_and(|r| r.is_retryable(&message));
                if !can_retry {
                    last_error = Some(error);
                    break;
                }
                if let Some(retry) = retry {
                    if let Some(hook) = &retry.on_attempt {
                        hook(attempt_number + 1, &message);
                    }
                    tokio::time::sleep(retry.delay_for(attempt_number)).await;
                }
                last_error = Some(error);
            }
        }
    }

    Err(WorkflowError::Exhausted {
        attempts: max_attempts,
        source: last_error.expect("loop always runs at least once and records an error on every non-return path"),
    })
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "workflow run panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_when_first_attempt_works() {
        let config = WorkflowConfig::default();
        let result: Result<_, WorkflowError<String>> =
            run_with_recovery(&config, || async { Ok::<_, String>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn retries_until_success_within_max_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = WorkflowConfig {
            retry: Some(RetryConfig {
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
                ..RetryConfig::default()
            }),
            ..WorkflowConfig::default()
        };

        let result = run_with_recovery(&config, || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 { Err("transient".to_string()) } else { Ok(99) }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = WorkflowConfig {
            retry: Some(RetryConfig {
                max_attempts: 5,
                base_delay: Duration::from_millis(1),
                retryable_error_substrings: vec!["transient".to_string()],
                ..RetryConfig::default()
            }),
            ..WorkflowConfig::default()
        };

        let result: Result<i32, _> = run_with_recovery(&config, || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>("fatal error".to_string())
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_panic_is_caught_and_reported() {
        let config = WorkflowConfig::default();
        let result: Result<i32, WorkflowError<String>> = run_with_recovery(&config, || async { panic!("boom") }).await;
        match result {
            Err(WorkflowError::Panic(message)) => assert_eq!(message, "boom"),
            other => panic!("expected Panic, got {other:?}"),
        }
    }
}
