use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::timeout;

use crate::model::location::LocationSample;

/// Acquisition policy as data, so it can be configured and tested apart from
/// the positioning capability itself.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub per_attempt_timeout: Duration,
    /// A fix at or below this radius ends the retry loop early.
    pub early_exit_accuracy_meters: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            per_attempt_timeout: Duration::from_secs(20),
            early_exit_accuracy_meters: 10.0,
        }
    }
}

/// Failure of a single positioning attempt.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    Unavailable,
}

/// Terminal outcome of an acquisition. `Timeout` is the one the caller may
/// surface with a manual retry action.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable")]
    Unavailable,
    #[error("location acquisition timed out")]
    Timeout,
}

/// Device positioning capability. Implementations must return a fresh fix on
/// every call, never a cached one.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn fresh_fix(&self) -> Result<LocationSample, FixError>;
}

/// Sequentially request fixes until one is accurate enough, keeping the best
/// (lowest accuracy radius) seen. A permission error is terminal immediately;
/// other failures consume an attempt and the loop moves on.
pub async fn acquire(
    provider: &dyn LocationProvider,
    policy: RetryPolicy,
) -> Result<LocationSample, SamplerError> {
    let mut best: Option<LocationSample> = None;
    let mut timed_out = false;

    for attempt in 1..=policy.max_attempts {
        match timeout(policy.per_attempt_timeout, provider.fresh_fix()).await {
            Ok(Ok(sample)) => {
                if best.is_none_or(|b| sample.accuracy_meters < b.accuracy_meters) {
                    best = Some(sample);
                }
                if sample.accuracy_meters <= policy.early_exit_accuracy_meters {
                    tracing::debug!(attempt, accuracy = sample.accuracy_meters, "accurate fix, stopping early");
                    break;
                }
                tracing::debug!(attempt, accuracy = sample.accuracy_meters, "fix below target accuracy");
            }
            Ok(Err(FixError::PermissionDenied)) => return Err(SamplerError::PermissionDenied),
            Ok(Err(FixError::Unavailable)) => {
                tracing::debug!(attempt, "position unavailable");
            }
            Err(_) => {
                timed_out = true;
                tracing::debug!(attempt, "positioning attempt timed out");
            }
        }
    }

    match best {
        Some(sample) => Ok(sample),
        None if timed_out => Err(SamplerError::Timeout),
        None => Err(SamplerError::Unavailable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    enum Step {
        Fix(f64),
        Fail(FixError),
        Hang,
    }

    struct ScriptedProvider {
        script: Mutex<VecDeque<Step>>,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                script: Mutex::new(steps.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LocationProvider for ScriptedProvider {
        async fn fresh_fix(&self) -> Result<LocationSample, FixError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.script.lock().unwrap().pop_front();
            match step {
                Some(Step::Fix(accuracy)) => Ok(LocationSample {
                    latitude: 0.0,
                    longitude: 0.0,
                    accuracy_meters: accuracy,
                    captured_at_epoch_ms: 0,
                }),
                Some(Step::Fail(e)) => Err(e),
                Some(Step::Hang) | None => std::future::pending().await,
            }
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            per_attempt_timeout: Duration::from_secs(20),
            early_exit_accuracy_meters: 10.0,
        }
    }

    #[tokio::test]
    async fn converges_on_best_accuracy_across_attempts() {
        let provider =
            ScriptedProvider::new(vec![Step::Fix(50.0), Step::Fix(30.0), Step::Fix(8.0)]);
        let sample = acquire(&provider, policy()).await.unwrap();
        assert_eq!(sample.accuracy_meters, 8.0);
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn early_exit_skips_remaining_attempts() {
        let provider =
            ScriptedProvider::new(vec![Step::Fix(12.0), Step::Fix(4.0), Step::Fix(3.0)]);
        let sample = acquire(&provider, policy()).await.unwrap();
        assert_eq!(sample.accuracy_meters, 4.0);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn keeps_best_when_no_fix_reaches_early_exit() {
        let provider =
            ScriptedProvider::new(vec![Step::Fix(50.0), Step::Fix(20.0), Step::Fix(35.0)]);
        let sample = acquire(&provider, policy()).await.unwrap();
        assert_eq!(sample.accuracy_meters, 20.0);
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn permission_denied_is_terminal_without_retry() {
        let provider = ScriptedProvider::new(vec![
            Step::Fail(FixError::PermissionDenied),
            Step::Fix(4.0),
        ]);
        let err = acquire(&provider, policy()).await.unwrap_err();
        assert_eq!(err, SamplerError::PermissionDenied);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn exhausted_attempts_report_unavailable() {
        let provider = ScriptedProvider::new(vec![
            Step::Fail(FixError::Unavailable),
            Step::Fail(FixError::Unavailable),
            Step::Fail(FixError::Unavailable),
        ]);
        let err = acquire(&provider, policy()).await.unwrap_err();
        assert_eq!(err, SamplerError::Unavailable);
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_attempts_report_timeout() {
        let provider = ScriptedProvider::new(vec![Step::Hang, Step::Hang, Step::Hang]);
        let err = acquire(&provider, policy()).await.unwrap_err();
        assert_eq!(err, SamplerError::Timeout);
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_a_timed_out_attempt() {
        let provider = ScriptedProvider::new(vec![Step::Hang, Step::Fix(9.0)]);
        let sample = acquire(&provider, policy()).await.unwrap();
        assert_eq!(sample.accuracy_meters, 9.0);
        assert_eq!(provider.calls(), 2);
    }
}
