//! ClaimCheck Core: Orchestration for the ClaimCheck Pipeline
//!
//! Re-exports the resilient invoker, the interview session state machine
//! and the pipeline stages that tie evidence collection to the reasoning
//! service.
//!
//! ## Layer 3 - Orchestration
//!
//! Focus: Bounded retries, a single-owner session state machine, and one
//! human-readable message per fatal error.

pub mod config;
pub mod invoker;
pub mod obs;
pub mod pipeline;
pub mod session;
pub mod telemetry;

pub use config::PipelineConfig;

pub use invoker::{
    invoke_with_policy, Classify, InvocationPolicy, InvokeError, InvokeResult, ResilientInvoker,
    RATE_LIMIT_MESSAGE, RESOURCE_EXHAUSTED_MARKER,
};

pub use pipeline::{Analysis, Pipeline, PipelineError, PipelineResult};

pub use session::{
    EndedBy, FinishedInterview, InterviewSession, SessionError, SessionEvent, SessionResult,
    SessionState, SubmitOutcome, TurnTimer, TARGET_QUESTION_COUNT, TIME_EXCEEDED_MARKER,
};

pub use telemetry::init_tracing;

pub use reasoning_client;
pub use repo_evidence;
