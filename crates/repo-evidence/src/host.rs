//! Code host collaborator.
//!
//! [`CodeHost`] is the seam the aggregator talks to; [`GitHubHost`] is the
//! HTTP implementation against the GitHub REST API and raw content host.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EvidenceError, FetchError};
use crate::fetcher::{run_sequential, FetchRequest, RateLimitedFetcher};
use crate::locator::RepositoryReference;
use crate::Result;

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const FALLBACK_BRANCH: &str = "main";

/// Resolved repository metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoMeta {
    pub default_branch: String,
    pub is_private: bool,
}

/// Kind of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
    Commit,
}

/// One entry of a recursive tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Host-specific handle for the authenticated blob endpoint.
    #[serde(rename = "url", default)]
    pub fetch_handle: Option<String>,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>, fetch_handle: impl Into<String>) -> Self {
        TreeEntry {
            path: path.into(),
            kind: EntryKind::Blob,
            fetch_handle: Some(fetch_handle.into()),
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::Blob
    }
}

/// Full recursive listing of a branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeListing {
    #[serde(rename = "tree")]
    pub entries: Vec<TreeEntry>,
    /// The host stopped listing early.
    #[serde(default)]
    pub truncated: bool,
}

/// Operations the evidence aggregator needs from a code host.
#[async_trait]
pub trait CodeHost: Send + Sync {
    /// Resolve default branch and visibility.
    async fn repo_meta(
        &self,
        repo: &RepositoryReference,
        credential: Option<&str>,
    ) -> Result<RepoMeta>;

    /// List every entry of `branch`, recursively, in host order.
    async fn list_tree(
        &self,
        repo: &RepositoryReference,
        branch: &str,
        credential: Option<&str>,
    ) -> Result<TreeListing>;

    /// Unauthenticated raw read of a file in a public repository.
    async fn fetch_raw(
        &self,
        repo: &RepositoryReference,
        branch: &str,
        path: &str,
    ) -> std::result::Result<String, FetchError>;

    /// Raw reads of several files, one at a time, pausing `delay` before
    /// each. Every path gets exactly one slot, in input order.
    async fn fetch_raw_many(
        &self,
        repo: &RepositoryReference,
        branch: &str,
        paths: &[String],
        delay: Duration,
    ) -> Vec<std::result::Result<String, FetchError>> {
        run_sequential(paths, delay, |path| self.fetch_raw(repo, branch, path)).await
    }

    /// Authenticated read through the metered blob endpoint.
    ///
    /// Returns the base64 payload exactly as the host sent it.
    async fn fetch_blob(
        &self,
        fetch_handle: &str,
        credential: &str,
    ) -> std::result::Result<String, FetchError>;
}

/// Map a failed metadata status to the typed error the caller explains.
pub fn classify_meta_status(repo: &str, status: u16, authenticated: bool) -> EvidenceError {
    match status {
        401 => EvidenceError::Unauthorized {
            repo: repo.to_string(),
        },
        403 | 429 => EvidenceError::RateLimited {
            repo: repo.to_string(),
            authenticated,
        },
        404 => EvidenceError::NotFound {
            repo: repo.to_string(),
            authenticated,
        },
        other => EvidenceError::Metadata {
            repo: repo.to_string(),
            status: other,
        },
    }
}

/// GitHub connection settings.
///
/// The token is never serialized and is redacted from `Debug` output.
#[derive(Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API base URL
    pub api_base: String,
    /// Raw content base URL
    pub raw_base: String,
    /// Access token (optional; required for private repositories)
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        GitHubConfig {
            api_base: "https://api.github.com".to_string(),
            raw_base: "https://raw.githubusercontent.com".to_string(),
            token: None,
            user_agent: concat!("claimcheck-repo-evidence/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("api_base", &self.api_base)
            .field("raw_base", &self.raw_base)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GitHubConfig {
    /// Defaults plus `GITHUB_TOKEN` from the environment.
    pub fn from_env() -> Self {
        GitHubConfig {
            token: std::env::var("GITHUB_TOKEN").ok(),
            ..Self::default()
        }
    }

    /// Point both API and raw reads at custom hosts (tests, GHE).
    pub fn new(api_base: &str, raw_base: &str) -> Self {
        GitHubConfig {
            api_base: api_base.trim_end_matches('/').to_string(),
            raw_base: raw_base.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Set access token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Trimmed token, or `None` when unset or blank.
    pub fn credential(&self) -> Option<&str> {
        normalize_credential(self.token.as_deref())
    }
}

/// Blank credentials count as absent.
pub fn normalize_credential(credential: Option<&str>) -> Option<&str> {
    credential.map(str::trim).filter(|t| !t.is_empty())
}

#[derive(Deserialize)]
struct RepoMetaResponse {
    default_branch: Option<String>,
    #[serde(default)]
    private: bool,
}

#[derive(Deserialize)]
struct BlobResponse {
    #[serde(default)]
    content: Option<String>,
}

/// [`CodeHost`] over the GitHub REST API.
pub struct GitHubHost {
    config: GitHubConfig,
    fetcher: RateLimitedFetcher,
}

impl GitHubHost {
    /// Create a new GitHub host client
    pub fn new(config: GitHubConfig) -> std::result::Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(GitHubHost {
            config,
            fetcher: RateLimitedFetcher::new(client),
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> std::result::Result<Self, FetchError> {
        Self::new(GitHubConfig::from_env())
    }

    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    fn raw_url(&self, repo: &RepositoryReference, branch: &str, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.config.raw_base,
            repo.owner,
            repo.project,
            encode_path(branch),
            encode_path(path)
        )
    }

    fn api_request(&self, url: String, credential: Option<&str>) -> FetchRequest {
        let request = FetchRequest::new(url).with_header("Accept", GITHUB_ACCEPT);
        match normalize_credential(credential) {
            Some(token) => request.with_header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }
}

#[async_trait]
impl CodeHost for GitHubHost {
    async fn repo_meta(
        &self,
        repo: &RepositoryReference,
        credential: Option<&str>,
    ) -> Result<RepoMeta> {
        let url = format!(
            "{}/repos/{}/{}",
            self.config.api_base, repo.owner, repo.project
        );
        let request = self.api_request(url, credential);
        let authenticated = normalize_credential(credential).is_some();

        let meta: RepoMetaResponse = self.fetcher.fetch_json(&request).await.map_err(|err| {
            match err.status() {
                Some(status) => classify_meta_status(&repo.slug(), status, authenticated),
                None => EvidenceError::Fetch(err),
            }
        })?;

        let default_branch = meta
            .default_branch
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| FALLBACK_BRANCH.to_string());
        debug!(repo = %repo, branch = %default_branch, private = meta.private, "resolved metadata");

        Ok(RepoMeta {
            default_branch,
            is_private: meta.private,
        })
    }

    async fn list_tree(
        &self,
        repo: &RepositoryReference,
        branch: &str,
        credential: Option<&str>,
    ) -> Result<TreeListing> {
        let url = format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.config.api_base,
            repo.owner,
            repo.project,
            encode_path(branch)
        );
        let request = self.api_request(url, credential);

        let listing: TreeListing =
            self.fetcher
                .fetch_json(&request)
                .await
                .map_err(|err| EvidenceError::TreeListing {
                    repo: repo.slug(),
                    detail: err.to_string(),
                })?;

        if listing.truncated {
            warn!(repo = %repo, entries = listing.entries.len(), "tree listing truncated by host");
        }
        Ok(listing)
    }

    async fn fetch_raw(
        &self,
        repo: &RepositoryReference,
        branch: &str,
        path: &str,
    ) -> std::result::Result<String, FetchError> {
        let url = self.raw_url(repo, branch, path);
        self.fetcher.fetch(&FetchRequest::new(url)).await
    }

    async fn fetch_raw_many(
        &self,
        repo: &RepositoryReference,
        branch: &str,
        paths: &[String],
        delay: Duration,
    ) -> Vec<std::result::Result<String, FetchError>> {
        let requests: Vec<FetchRequest> = paths
            .iter()
            .map(|path| FetchRequest::new(self.raw_url(repo, branch, path)))
            .collect();
        self.fetcher.fetch_many(&requests, delay).await
    }

    async fn fetch_blob(
        &self,
        fetch_handle: &str,
        credential: &str,
    ) -> std::result::Result<String, FetchError> {
        let request = self.api_request(fetch_handle.to_string(), Some(credential));
        let blob: BlobResponse = self.fetcher.fetch_json(&request).await?;
        Ok(blob.content.unwrap_or_default())
    }
}

/// Escape characters that would otherwise end or corrupt a URL path.
fn encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '%' => out.push_str("%25"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            ' ' => out.push_str("%20"),
            _ => out.push(c),
        }
    }
    out
}
