//! Pipeline configuration.
//!
//! Collects the per-crate settings into one value that binaries can build
//! from the environment and then adjust with builders.

use reasoning_client::GeminiConfig;
use repo_evidence::{EvidenceLimits, GitHubConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::invoker::InvocationPolicy;

/// Settings for every pipeline stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub limits: EvidenceLimits,
    #[serde(default)]
    pub policy: InvocationPolicy,
    /// Skip failing repositories instead of aborting the analysis
    #[serde(default)]
    pub partial_tolerance: bool,
}

impl PipelineConfig {
    /// Defaults overlaid with the process environment.
    ///
    /// Reads `GITHUB_TOKEN`, `GEMINI_API_KEY`/`API_KEY`, `GEMINI_MODEL`,
    /// `GEMINI_BASE_URL`, `CLAIMCHECK_PARTIAL_REPOS`,
    /// `CLAIMCHECK_MAX_ATTEMPTS` and `CLAIMCHECK_BASE_DELAY_MS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`PipelineConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.github.token = lookup("GITHUB_TOKEN");
        config.gemini.api_key = lookup("GEMINI_API_KEY").or_else(|| lookup("API_KEY"));
        if let Some(model) = lookup("GEMINI_MODEL") {
            config.gemini.model = model;
        }
        if let Some(base_url) = lookup("GEMINI_BASE_URL") {
            config.gemini.base_url = base_url.trim_end_matches('/').to_string();
        }

        if let Some(raw) = lookup("CLAIMCHECK_PARTIAL_REPOS") {
            config.partial_tolerance = parse_flag(&raw);
        }
        if let Some(attempts) = parse_number("CLAIMCHECK_MAX_ATTEMPTS", &lookup) {
            config.policy.max_attempts = attempts;
        }
        if let Some(delay) = parse_number("CLAIMCHECK_BASE_DELAY_MS", &lookup) {
            config.policy.base_delay_ms = delay;
        }
        config
    }

    pub fn with_github(mut self, github: GitHubConfig) -> Self {
        self.github = github;
        self
    }

    pub fn with_gemini(mut self, gemini: GeminiConfig) -> Self {
        self.gemini = gemini;
        self
    }

    pub fn with_limits(mut self, limits: EvidenceLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_policy(mut self, policy: InvocationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_partial_tolerance(mut self, enabled: bool) -> Self {
        self.partial_tolerance = enabled;
        self
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_number<T, F>(key: &str, lookup: &F) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key = %key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}
