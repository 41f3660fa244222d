//! Error types for the invoker module.

use std::fmt;

/// Message shown when the reasoning service stays throttled.
pub const RATE_LIMIT_MESSAGE: &str =
    "Too many users are using the service right now and the request limit was exceeded. Please try again in about a minute.";

/// Outcome of a failed resilient call.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError<E: fmt::Debug + fmt::Display> {
    /// The last failure was a rate-limit condition.
    #[error("rate limited after {attempts} attempt(s)")]
    RateLimited { attempts: u32 },

    /// A single attempt exceeded the configured limit.
    #[error("call timed out after {limit_ms}ms (attempt {attempt})")]
    TimedOut { attempt: u32, limit_ms: u64 },

    /// Any other failure, exactly as the operation produced it.
    #[error("{0}")]
    Failed(E),
}

impl<E: fmt::Debug + fmt::Display> InvokeError<E> {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, InvokeError::RateLimited { .. })
    }

    /// The original error, when the failure was not rewritten.
    pub fn into_inner(self) -> Option<E> {
        match self {
            InvokeError::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            InvokeError::RateLimited { .. } => RATE_LIMIT_MESSAGE.to_string(),
            InvokeError::TimedOut { .. } => {
                "The request took too long to complete. Please try again.".to_string()
            }
            InvokeError::Failed(err) => err.to_string(),
        }
    }
}

/// Result type for invoker operations.
pub type InvokeResult<T, E> = std::result::Result<T, InvokeError<E>>;
