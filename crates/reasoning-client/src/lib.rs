//! Reasoning-Client: Generative Reasoning Service for ClaimCheck
//!
//! Request/response model, report schemas and the Gemini transport used by
//! the analysis, interview and feedback stages.
//!
//! ## Layer 2 - Reasoning
//!
//! Focus: Strict report contracts; one HTTP call per request.

pub mod client;
pub mod error;
pub mod prompts;
pub mod report;
pub mod types;

pub use client::{
    request_body, Content, GeminiClient, GeminiConfig, InlineData, Part, ReasoningRequest,
    ReasoningService, Role,
};
pub use error::ReasoningError;
pub use prompts::{
    analysis_request, feedback_request, interviewer_request, render_transcript,
    time_limit_instruction, InterviewContext, TERMINATION_PHRASE,
};
pub use report::{
    analysis_schema, feedback_schema, parse_analysis, parse_feedback, AnalysisReport,
    AnalysisSummary, EvaluationMetrics, FeedbackReport, FlaggedClaim, MetricScore, PracticalTips,
    Verdict,
};
pub use types::{
    AnalysisInput, Attachment, CandidateDocument, CoverLetterItem, InterviewLevel,
    InterviewTurn, JobDescription, Speaker, Tone,
};

/// Result type for reasoning operations
pub type Result<T> = std::result::Result<T, ReasoningError>;
