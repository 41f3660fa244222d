//! Session: the turn-based interview over one flagged claim.
//!
//! The session drives a timed question/answer loop, short-circuits silent
//! answers, detects the interviewer's closing phrase and runs a fixed
//! countdown before handing the transcript to the feedback stage.
//!
//! # Modules
//!
//! - [`engine`]  - `InterviewSession`
//! - [`state`]   - `SessionState`, `TurnTimer`, `SessionEvent`, `FinishedInterview`
//! - [`markers`] - silence, timeout and termination phrase sets
//! - [`error`]   - `SessionError` / `SessionResult`

pub mod engine;
pub mod error;
pub mod markers;
pub mod state;

pub use engine::InterviewSession;
pub use error::{SessionError, SessionResult};
pub use markers::{
    canned_response, is_silence, is_termination, is_timeout_submission, silence_kind,
    SilenceKind, COUNTDOWN_TICKS, SILENCE_MARKERS, TARGET_QUESTION_COUNT, TERMINATION_PHRASES,
    TIME_EXCEEDED_MARKER,
};
pub use state::{EndedBy, FinishedInterview, SessionEvent, SessionState, SubmitOutcome, TurnTimer};
