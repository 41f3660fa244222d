//! Error types for the session module.

use reasoning_client::ReasoningError;

use super::state::SessionState;
use crate::invoker::InvokeError;

/// Errors produced by the interview state machine.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("cannot {action} while session is {state}")]
    InvalidState {
        action: &'static str,
        state: SessionState,
    },

    #[error("session already finished")]
    AlreadyFinished,

    #[error("interviewer turn failed: {0}")]
    Reasoning(#[from] InvokeError<ReasoningError>),
}

impl SessionError {
    pub fn user_message(&self) -> String {
        match self {
            SessionError::InvalidState { action, state } => {
                format!("You cannot {action} right now (interview is {state}).")
            }
            SessionError::AlreadyFinished => "This interview has already ended.".to_string(),
            SessionError::Reasoning(InvokeError::Failed(err)) => err.user_message(),
            SessionError::Reasoning(err) => err.user_message(),
        }
    }
}

/// Result type for session operations.
pub type SessionResult<T> = std::result::Result<T, SessionError>;
