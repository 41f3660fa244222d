//! The three pipeline stages: analysis, interview and feedback.
//!
//! [`Pipeline`] binds a code host, a reasoning service and an invocation
//! policy. Repository access is never retried here; only reasoning calls go
//! through the [`ResilientInvoker`].

use std::sync::Arc;

use reasoning_client::{
    analysis_request, feedback_request, parse_analysis, parse_feedback, AnalysisInput,
    AnalysisReport, FeedbackReport, GeminiClient, InterviewContext, ReasoningError,
    ReasoningService,
};
use repo_evidence::{
    combined_summary, parse_references, render_evidence, AggregationOutcome, CodeHost,
    EvidenceAggregator, EvidenceError, GitHubHost, RepositoryReference,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::invoker::{InvokeError, ResilientInvoker};
use crate::session::{FinishedInterview, InterviewSession, SessionError, SessionEvent};

/// Errors surfaced by the pipeline stages.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Evidence(#[from] EvidenceError),

    #[error("every repository failed: {}", .skipped.join(", "))]
    NoEvidence { skipped: Vec<String> },

    #[error(transparent)]
    Invoke(#[from] InvokeError<ReasoningError>),

    #[error(transparent)]
    Reasoning(#[from] ReasoningError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("claim index {index} out of range ({available} flagged claims)")]
    ClaimIndex { index: usize, available: usize },
}

impl PipelineError {
    /// One human-readable line for the caller.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Evidence(err) => err.user_message(),
            PipelineError::NoEvidence { skipped } => format!(
                "None of the repositories could be read ({}).",
                skipped.join(", ")
            ),
            PipelineError::Invoke(InvokeError::Failed(err)) => err.user_message(),
            PipelineError::Invoke(err) => err.user_message(),
            PipelineError::Reasoning(err) => err.user_message(),
            PipelineError::Session(err) => err.user_message(),
            PipelineError::ClaimIndex { index, available } => format!(
                "There is no flagged claim #{index}; the report has {available}."
            ),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        match self {
            PipelineError::Invoke(err) => err.is_rate_limited(),
            PipelineError::Session(SessionError::Reasoning(err)) => err.is_rate_limited(),
            PipelineError::Evidence(EvidenceError::RateLimited { .. }) => true,
            _ => false,
        }
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// Outcome of the analysis stage.
#[derive(Debug)]
pub struct Analysis {
    pub report: AnalysisReport,
    /// `Repo owner/project: N files.` per analysed repository
    pub sources: String,
    /// Repositories dropped in partial-tolerance mode
    pub skipped: Vec<(RepositoryReference, EvidenceError)>,
}

/// Analysis, interview and feedback over shared collaborators.
pub struct Pipeline {
    aggregator: EvidenceAggregator,
    service: Arc<dyn ReasoningService>,
    invoker: ResilientInvoker,
    partial_tolerance: bool,
}

impl Pipeline {
    pub fn new(
        host: Arc<dyn CodeHost>,
        service: Arc<dyn ReasoningService>,
        config: &PipelineConfig,
    ) -> Self {
        Pipeline {
            aggregator: EvidenceAggregator::new(host, config.limits.clone()),
            service,
            invoker: ResilientInvoker::new(config.policy.clone()),
            partial_tolerance: config.partial_tolerance,
        }
    }

    /// Build the GitHub and Gemini clients described by `config`.
    pub fn from_config(config: &PipelineConfig) -> PipelineResult<Self> {
        let host = GitHubHost::new(config.github.clone()).map_err(EvidenceError::from)?;
        let service = GeminiClient::new(config.gemini.clone())?;
        Ok(Self::new(Arc::new(host), Arc::new(service), config))
    }

    pub fn invoker(&self) -> &ResilientInvoker {
        &self.invoker
    }

    pub fn partial_tolerance(&self) -> bool {
        self.partial_tolerance
    }

    /// Parse the references and aggregate their evidence.
    ///
    /// Malformed references always fail. Repository failures fail the call
    /// unless partial tolerance is on, in which case they are skipped as
    /// long as at least one repository succeeds.
    pub async fn collect_evidence<S: AsRef<str>>(
        &self,
        repositories: &[S],
        credential: Option<&str>,
    ) -> PipelineResult<AggregationOutcome> {
        let references = parse_references(repositories)?;

        if !self.partial_tolerance {
            let bundles = self.aggregator.aggregate(&references, credential).await?;
            return Ok(AggregationOutcome {
                bundles,
                failures: Vec::new(),
            });
        }

        let outcome = self
            .aggregator
            .aggregate_tolerant(&references, credential)
            .await;
        if outcome.bundles.is_empty() && !outcome.failures.is_empty() {
            return Err(PipelineError::NoEvidence {
                skipped: outcome
                    .failures
                    .iter()
                    .map(|(repo, _)| repo.to_string())
                    .collect(),
            });
        }
        Ok(outcome)
    }

    /// Stage 1: evidence plus candidate documents to an analysis report.
    pub async fn analyze(
        &self,
        input: &AnalysisInput,
        credential: Option<&str>,
    ) -> PipelineResult<Analysis> {
        info!(
            repos = input.repositories.len(),
            level = %input.level,
            partial = self.partial_tolerance,
            "analysis started"
        );

        let outcome = self
            .collect_evidence(&input.repositories, credential)
            .await?;
        for (repo, err) in &outcome.failures {
            warn!(repo = %repo, error = %err, "analysing without repository");
        }

        let evidence = render_evidence(&outcome.bundles);
        let request = analysis_request(input, &evidence);
        let service = &self.service;
        let text = self
            .invoker
            .invoke("analysis", || service.generate(&request))
            .await?;
        let report = parse_analysis(&text)?;

        info!(
            flagged = report.items.len(),
            average = report.evaluation.average(),
            "analysis finished"
        );
        Ok(Analysis {
            report,
            sources: combined_summary(&outcome.bundles),
            skipped: outcome.failures,
        })
    }

    /// Stage 2: open an interview over flagged claim `index`.
    pub fn start_interview(
        &self,
        report: &AnalysisReport,
        index: usize,
        input: &AnalysisInput,
    ) -> PipelineResult<InterviewSession> {
        self.start_interview_observed(report, index, input, None)
    }

    /// Like [`Pipeline::start_interview`], with a session event channel.
    pub fn start_interview_observed(
        &self,
        report: &AnalysisReport,
        index: usize,
        input: &AnalysisInput,
        events: Option<UnboundedSender<SessionEvent>>,
    ) -> PipelineResult<InterviewSession> {
        let claim = report
            .items
            .get(index)
            .cloned()
            .ok_or(PipelineError::ClaimIndex {
                index,
                available: report.items.len(),
            })?;

        let context = InterviewContext {
            claim,
            level: input.level,
            time_limit_secs: input.time_limit_secs,
            tone: input.tone,
        };
        Ok(InterviewSession::start_observed(
            context,
            Arc::clone(&self.service),
            self.invoker.clone(),
            events,
        ))
    }

    /// Stage 3: score a finished interview.
    pub async fn request_feedback(
        &self,
        finished: &FinishedInterview,
    ) -> PipelineResult<FeedbackReport> {
        info!(
            session_id = %finished.session_id,
            turns = finished.transcript.len(),
            ended_by = finished.ended_by.as_str(),
            "feedback requested"
        );

        let request = feedback_request(&finished.context, &finished.transcript);
        let service = &self.service;
        let text = self
            .invoker
            .invoke("feedback", || service.generate(&request))
            .await?;
        let report = parse_feedback(&text)?;

        info!(defense_score = report.defense_score, "feedback finished");
        Ok(report)
    }
}
