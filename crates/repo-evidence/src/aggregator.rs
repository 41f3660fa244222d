//! Evidence aggregation across repositories.
//!
//! [`EvidenceAggregator`] turns repository references into size-bounded
//! [`EvidenceBundle`]s. Repositories are processed one at a time and file
//! bodies are fetched sequentially with a fixed pause, both to stay under the
//! host's rate limit.
//!
//! Failure policy is fail-fast across repositories and fail-soft within one
//! repository's file set: a broken repository aborts [`EvidenceAggregator::aggregate`],
//! a broken file becomes an inline marker.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{EvidenceError, FetchError};
use crate::fetcher::run_sequential;
use crate::host::{normalize_credential, CodeHost, RepoMeta, TreeEntry};
use crate::locator::RepositoryReference;
use crate::scorer;
use crate::Result;

/// Size bounds applied to every bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceLimits {
    /// Maximum entries in the structure listing.
    pub max_structure_entries: usize,
    /// Maximum file bodies fetched per repository.
    pub max_files: usize,
    /// Maximum characters kept from each file body.
    pub max_file_chars: usize,
    /// Pause before each file fetch (milliseconds).
    pub inter_request_delay_ms: u64,
}

impl Default for EvidenceLimits {
    fn default() -> Self {
        Self {
            max_structure_entries: 500,
            max_files: 12,
            max_file_chars: 50_000,
            inter_request_delay_ms: 100,
        }
    }
}

/// A file selected for fetching. Immutable once scored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub path: String,
    pub fetch_handle: Option<String>,
    pub importance: u8,
}

/// Outcome of fetching one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileBody {
    Text { text: String },
    Empty,
    Failed { status: Option<u16> },
}

/// One file's evidence, attributed to its repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvidence {
    pub repository: String,
    pub path: String,
    pub body: FileBody,
}

impl FileEvidence {
    /// Delimited block handed to the reasoning service.
    pub fn wrapped(&self) -> String {
        let origin = format!("{}/{}", self.repository, self.path);
        match &self.body {
            FileBody::Text { text } => {
                format!("\n--- START OF FILE: {origin} ---\n{text}\n--- END OF FILE ---")
            }
            FileBody::Empty => format!("\n--- EMPTY FILE: {origin} ---"),
            FileBody::Failed { status: Some(code) } => {
                format!("\n--- ERROR FETCHING: {origin} (Status: {code}) ---")
            }
            FileBody::Failed { status: None } => format!("\n--- ERROR FETCHING: {origin} ---"),
        }
    }
}

/// Evidence gathered from a single repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    /// Repository with visibility resolved.
    pub repository: RepositoryReference,
    pub branch: String,
    /// File paths in tree order, bounded.
    pub structure: Vec<String>,
    /// Highest-ranked file bodies, in rank order.
    pub file_contents: Vec<FileEvidence>,
    pub summary: String,
}

impl EvidenceBundle {
    pub fn render_structure(&self) -> String {
        format!(
            "Directory Structure (Repo: {}):\n{}",
            self.repository.slug(),
            self.structure.join("\n")
        )
    }

    pub fn render_files(&self) -> String {
        self.file_contents
            .iter()
            .map(FileEvidence::wrapped)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Concatenate bundles into the evidence text: every structure listing
/// first, then every file block, each in input order.
pub fn render_evidence(bundles: &[EvidenceBundle]) -> String {
    let structures = bundles
        .iter()
        .map(EvidenceBundle::render_structure)
        .collect::<Vec<_>>()
        .join("\n\n");
    let files = bundles
        .iter()
        .map(EvidenceBundle::render_files)
        .collect::<Vec<_>>()
        .join("\n");
    format!("{structures}\n\n{files}")
}

/// One-line summary across bundles.
pub fn combined_summary(bundles: &[EvidenceBundle]) -> String {
    bundles
        .iter()
        .map(|b| b.summary.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result of a partial-tolerance aggregation.
#[derive(Debug, Default)]
pub struct AggregationOutcome {
    pub bundles: Vec<EvidenceBundle>,
    /// Repositories that were skipped, with the reason.
    pub failures: Vec<(RepositoryReference, EvidenceError)>,
}

/// Bounded evidence collection over a [`CodeHost`].
pub struct EvidenceAggregator {
    host: Arc<dyn CodeHost>,
    limits: EvidenceLimits,
}

impl EvidenceAggregator {
    pub fn new(host: Arc<dyn CodeHost>, limits: EvidenceLimits) -> Self {
        Self { host, limits }
    }

    pub fn limits(&self) -> &EvidenceLimits {
        &self.limits
    }

    /// Aggregate every repository, stopping at the first failure.
    pub async fn aggregate(
        &self,
        references: &[RepositoryReference],
        credential: Option<&str>,
    ) -> Result<Vec<EvidenceBundle>> {
        let mut bundles = Vec::with_capacity(references.len());
        for reference in references {
            bundles.push(self.collect_repository(reference, credential).await?);
        }
        Ok(bundles)
    }

    /// Aggregate every repository, skipping the ones that fail.
    pub async fn aggregate_tolerant(
        &self,
        references: &[RepositoryReference],
        credential: Option<&str>,
    ) -> AggregationOutcome {
        let mut outcome = AggregationOutcome::default();
        for reference in references {
            match self.collect_repository(reference, credential).await {
                Ok(bundle) => outcome.bundles.push(bundle),
                Err(err) => {
                    warn!(event = "evidence.repo_skipped", repo = %reference, error = %err);
                    outcome.failures.push((reference.clone(), err));
                }
            }
        }
        outcome
    }

    /// Gather the bundle for one repository.
    pub async fn collect_repository(
        &self,
        reference: &RepositoryReference,
        credential: Option<&str>,
    ) -> Result<EvidenceBundle> {
        let credential = normalize_credential(credential);
        info!(event = "evidence.repo_started", repo = %reference, authenticated = credential.is_some());

        let RepoMeta {
            default_branch,
            is_private,
        } = self.host.repo_meta(reference, credential).await?;

        // Private content is only reachable through the credentialed endpoint.
        let private_credential = match (is_private, credential) {
            (true, None) => {
                return Err(EvidenceError::Unauthorized {
                    repo: reference.slug(),
                })
            }
            (true, Some(token)) => Some(token),
            (false, _) => None,
        };

        let listing = self
            .host
            .list_tree(reference, &default_branch, credential)
            .await?;

        let structure = structure_listing(&listing.entries, self.limits.max_structure_entries);
        let candidates = select_candidates(&listing.entries, self.limits.max_files);

        let mut repository = reference.clone();
        repository.is_private = Some(is_private);
        let slug = repository.slug();

        let delay = Duration::from_millis(self.limits.inter_request_delay_ms);
        let bodies = match private_credential {
            None => {
                let paths: Vec<String> = candidates.iter().map(|c| c.path.clone()).collect();
                self.host
                    .fetch_raw_many(&repository, &default_branch, &paths, delay)
                    .await
            }
            Some(token) => {
                run_sequential(&candidates, delay, |candidate| {
                    self.fetch_private(candidate, token)
                })
                .await
            }
        };

        let file_contents: Vec<FileEvidence> = candidates
            .iter()
            .zip(bodies)
            .map(|(candidate, body)| {
                let body = match body {
                    Ok(text) if text.is_empty() => FileBody::Empty,
                    Ok(text) => FileBody::Text {
                        text: truncate_chars(&text, self.limits.max_file_chars),
                    },
                    Err(err) => {
                        warn!(
                            event = "evidence.file_failed",
                            repo = %slug,
                            path = %candidate.path,
                            retryable = err.is_retryable(),
                            error = %err
                        );
                        FileBody::Failed {
                            status: err.status(),
                        }
                    }
                };
                FileEvidence {
                    repository: slug.clone(),
                    path: candidate.path.clone(),
                    body,
                }
            })
            .collect();

        let summary = format!("Repo {}: {} files.", slug, listing.entries.len());
        info!(
            event = "evidence.repo_finished",
            repo = %slug,
            private = is_private,
            tree_entries = listing.entries.len(),
            files = file_contents.len()
        );

        Ok(EvidenceBundle {
            repository,
            branch: default_branch.clone(),
            structure,
            file_contents,
            summary,
        })
    }

    async fn fetch_private(
        &self,
        candidate: &FileCandidate,
        token: &str,
    ) -> std::result::Result<String, FetchError> {
        let handle = candidate
            .fetch_handle
            .as_deref()
            .ok_or_else(|| FetchError::Decode(format!("no blob handle for {}", candidate.path)))?;
        let payload = self.host.fetch_blob(handle, token).await?;
        decode_blob(&payload)
    }
}

/// Regular-file paths in tree order, capped at `max`.
pub fn structure_listing(entries: &[TreeEntry], max: usize) -> Vec<String> {
    entries
        .iter()
        .filter(|e| e.is_file())
        .map(|e| e.path.clone())
        .take(max)
        .collect()
}

/// Score regular files and keep the `max` best. Ties keep tree order.
pub fn select_candidates(entries: &[TreeEntry], max: usize) -> Vec<FileCandidate> {
    let mut candidates: Vec<FileCandidate> = entries
        .iter()
        .filter(|e| e.is_file())
        .map(|e| FileCandidate {
            path: e.path.clone(),
            fetch_handle: e.fetch_handle.clone(),
            importance: scorer::score(&e.path),
        })
        .collect();
    // `sort_by` is stable.
    candidates.sort_by(|a, b| b.importance.cmp(&a.importance));
    candidates.truncate(max);
    candidates
}

/// Keep at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Decode a base64 blob payload (line-wrapped, as the host sends it) to text.
pub fn decode_blob(payload: &str) -> std::result::Result<String, FetchError> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
