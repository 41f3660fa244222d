//! Bounded retry with exponential backoff around a single external call.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use super::error::{InvokeError, InvokeResult};
use super::policy::{Classify, InvocationPolicy};
use crate::obs;

/// Run `operation` under `policy`.
///
/// Retryable failures are retried after `base * 2^i` for attempt index `i`
/// until the attempt budget runs out. The whole operation is repeated each
/// time, so it must be safe to call again. When retries stop, a rate-limit
/// failure becomes [`InvokeError::RateLimited`]; anything else is returned
/// unchanged in [`InvokeError::Failed`]. A timed-out attempt is not retried.
pub async fn invoke_with_policy<T, E, F, Fut>(
    policy: &InvocationPolicy,
    label: &str,
    mut operation: F,
) -> InvokeResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Classify + fmt::Debug + fmt::Display,
{
    let max_attempts = policy.effective_attempts();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let outcome = match policy.attempt_timeout_ms {
            Some(limit_ms) => {
                match tokio::time::timeout(Duration::from_millis(limit_ms), operation()).await {
                    Ok(result) => result,
                    Err(_elapsed) => {
                        obs::emit_invoke_exhausted(label, attempt, "timeout");
                        return Err(InvokeError::TimedOut { attempt, limit_ms });
                    }
                }
            }
            None => operation().await,
        };

        let err = match outcome {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if err.is_retryable() && attempt < max_attempts {
            let delay = policy.backoff_delay(attempt - 1);
            obs::emit_invoke_retry(label, attempt, max_attempts, delay, &err);
            tokio::time::sleep(delay).await;
            continue;
        }

        if err.is_rate_limit() {
            obs::emit_invoke_exhausted(label, attempt, "rate_limited");
            return Err(InvokeError::RateLimited { attempts: attempt });
        }
        obs::emit_invoke_exhausted(label, attempt, "failed");
        return Err(InvokeError::Failed(err));
    }
}

/// A call site's retry policy, bound once.
#[derive(Debug, Clone, Default)]
pub struct ResilientInvoker {
    policy: InvocationPolicy,
}

impl ResilientInvoker {
    pub fn new(policy: InvocationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &InvocationPolicy {
        &self.policy
    }

    pub async fn invoke<T, E, F, Fut>(&self, label: &str, operation: F) -> InvokeResult<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + fmt::Debug + fmt::Display,
    {
        invoke_with_policy(&self.policy, label, operation).await
    }
}
