//! Repository reference parsing.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::EvidenceError;
use crate::Result;

/// Canonical identity of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryReference {
    pub owner: String,
    pub project: String,
    /// Visibility, once resolved against the host.
    pub is_private: Option<bool>,
}

impl RepositoryReference {
    pub fn new(owner: impl Into<String>, project: impl Into<String>) -> Self {
        RepositoryReference {
            owner: owner.into(),
            project: project.into(),
            is_private: None,
        }
    }

    /// `owner/project`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.project)
    }
}

impl fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.project)
    }
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Accepts https, scheme-less and scp-style (`git@github.com:owner/project.git`) forms.
        // Anything after the project segment (`/tree/main`, `?tab=...`) is ignored.
        Regex::new(r"github\.com[/:]([^/\s?#]+)/([^/\s?#]+)").expect("valid repository pattern")
    })
}

/// Parse a repository URL into an owner/project pair.
///
/// Fails with [`EvidenceError::InvalidReference`] when the string does not
/// contain a `github.com/owner/project` shape. A trailing `.git` is stripped.
pub fn parse(reference: &str) -> Result<RepositoryReference> {
    let trimmed = reference.trim();
    let caps = reference_pattern()
        .captures(trimmed)
        .ok_or_else(|| EvidenceError::InvalidReference(trimmed.to_string()))?;

    let owner = &caps[1];
    let project = caps[2].strip_suffix(".git").unwrap_or(&caps[2]);

    if owner.is_empty() || project.is_empty() {
        return Err(EvidenceError::InvalidReference(trimmed.to_string()));
    }

    Ok(RepositoryReference::new(owner, project))
}

/// Parse every reference, failing on the first malformed one.
pub fn parse_all<S: AsRef<str>>(references: &[S]) -> Result<Vec<RepositoryReference>> {
    references.iter().map(|r| parse(r.as_ref())).collect()
}
