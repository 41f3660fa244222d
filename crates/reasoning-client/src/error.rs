//! Error types for reasoning-client

use thiserror::Error;

/// Errors raised by a reasoning-service call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReasoningError {
    /// No API key was configured
    #[error("reasoning service API key is missing")]
    MissingApiKey,

    /// The service answered with a non-success status.
    ///
    /// `message` starts with the provider status string (for example
    /// `RESOURCE_EXHAUSTED`) when the error body carried one.
    #[error("reasoning service error {status}: {message}")]
    Api { status: u16, message: String },

    /// Connection or TLS failure
    #[error("reasoning service transport error: {0}")]
    Transport(String),

    /// Request exceeded the client timeout
    #[error("reasoning service request timed out")]
    Timeout,

    /// The service returned no candidate text
    #[error("reasoning service returned an empty response")]
    EmptyResponse,

    /// Response was not valid JSON or violated the report schema
    #[error("malformed reasoning response: {0}")]
    MalformedResponse(String),
}

impl ReasoningError {
    /// HTTP status, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ReasoningError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable detail used for classification.
    pub fn detail(&self) -> String {
        match self {
            ReasoningError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ReasoningError::MissingApiKey => {
                "No reasoning-service API key is configured. Set GEMINI_API_KEY.".to_string()
            }
            ReasoningError::Api { status, message } => {
                format!("The reasoning service failed (status {status}): {message}")
            }
            ReasoningError::Transport(_) => {
                "Could not reach the reasoning service. Check your network and try again."
                    .to_string()
            }
            ReasoningError::Timeout => {
                "The reasoning service took too long to answer. Please try again.".to_string()
            }
            ReasoningError::EmptyResponse => {
                "The reasoning service returned an empty answer. Please try again.".to_string()
            }
            ReasoningError::MalformedResponse(_) => {
                "The reasoning service returned a report that could not be read.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for ReasoningError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ReasoningError::Timeout
        } else if err.is_decode() {
            ReasoningError::MalformedResponse(err.to_string())
        } else {
            ReasoningError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_only_for_api_errors() {
        let err = ReasoningError::Api {
            status: 429,
            message: "RESOURCE_EXHAUSTED: quota".into(),
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.detail(), "RESOURCE_EXHAUSTED: quota");
        assert_eq!(ReasoningError::EmptyResponse.status(), None);
    }

    #[test]
    fn test_malformed_message_hides_payload() {
        let err = ReasoningError::MalformedResponse("missing field `items`".into());
        assert!(err.to_string().contains("items"));
        assert!(!err.user_message().contains("items"));
    }
}
