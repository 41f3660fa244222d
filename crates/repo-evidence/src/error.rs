//! Error types for repo-evidence

use thiserror::Error;

/// Errors raised while resolving a repository and gathering its evidence.
#[derive(Error, Debug)]
pub enum EvidenceError {
    /// The reference string does not have a `host/owner/project` shape
    #[error("invalid repository reference: {0}")]
    InvalidReference(String),

    /// The host throttled us (403/429)
    #[error("code host rate limit exceeded while resolving {repo}")]
    RateLimited { repo: String, authenticated: bool },

    /// Credential missing, rejected, or insufficient for a private repository
    #[error("unauthorized access to {repo}")]
    Unauthorized { repo: String },

    /// Repository does not exist (or is invisible without a credential)
    #[error("repository not found: {repo}")]
    NotFound { repo: String, authenticated: bool },

    /// Metadata lookup failed with some other status
    #[error("code host error for {repo}: status {status}")]
    Metadata { repo: String, status: u16 },

    /// Recursive tree listing failed
    #[error("failed to list file tree for {repo}: {detail}")]
    TreeListing { repo: String, detail: String },

    /// Low-level fetch failure
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl EvidenceError {
    /// One-line explanation suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            EvidenceError::InvalidReference(raw) => {
                format!("'{raw}' is not a valid GitHub repository URL.")
            }
            EvidenceError::RateLimited { authenticated, .. } => {
                if *authenticated {
                    "GitHub API rate limit exceeded. Wait a few minutes and try again.".to_string()
                } else {
                    "GitHub API rate limit exceeded. Provide an access token or try again later."
                        .to_string()
                }
            }
            EvidenceError::Unauthorized { repo } => format!(
                "Access to {repo} was denied. Provide a valid access token for private repositories."
            ),
            EvidenceError::NotFound {
                repo,
                authenticated,
            } => {
                if *authenticated {
                    format!("Repository {repo} was not found. Check the URL.")
                } else {
                    format!(
                        "Repository {repo} was not found. If it is private, provide an access token."
                    )
                }
            }
            EvidenceError::Metadata { repo, status } => {
                format!("GitHub returned status {status} for {repo}.")
            }
            EvidenceError::TreeListing { repo, .. } => {
                format!("Could not read the file structure of {repo}.")
            }
            EvidenceError::Fetch(err) => format!("Fetching repository data failed: {err}"),
        }
    }
}

/// Errors produced by a single HTTP fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Connection, TLS, or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Body could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
}

impl FetchError {
    /// HTTP status code, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Failures that may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            FetchError::Transport(_) => true,
            FetchError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Status {
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
                status: status.as_u16(),
            },
            None if err.is_decode() => FetchError::Decode(err.to_string()),
            None => FetchError::Transport(err.to_string()),
        }
    }
}
