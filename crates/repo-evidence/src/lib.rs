//! Repo-Evidence: Repository Evidence Aggregation for ClaimCheck
//!
//! This crate turns candidate-supplied repository links into bounded,
//! attributed evidence bundles that a reasoning service can read.
//!
//! ## Layer 1 - Evidence
//!
//! Focus: Rate-limit-safe collection and deterministic file ranking.

pub mod aggregator;
pub mod error;
pub mod fetcher;
pub mod host;
pub mod locator;
pub mod scorer;

pub use aggregator::{
    combined_summary, decode_blob, render_evidence, select_candidates, structure_listing,
    truncate_chars, AggregationOutcome, EvidenceAggregator, EvidenceBundle, EvidenceLimits,
    FileBody, FileCandidate, FileEvidence,
};
pub use error::{EvidenceError, FetchError};
pub use fetcher::{run_sequential, FetchRequest, RateLimitedFetcher};
pub use host::{
    classify_meta_status, normalize_credential, CodeHost, EntryKind, GitHubConfig, GitHubHost,
    RepoMeta, TreeEntry, TreeListing,
};
pub use locator::{parse as parse_reference, parse_all as parse_references, RepositoryReference};
pub use scorer::score as score_path;

/// Result type for evidence operations
pub type Result<T> = std::result::Result<T, EvidenceError>;
