//! Structured observability hooks for invocation and interview lifecycles.
//!
//! This module provides:
//! - Session-scoped tracing spans via the `SessionSpan` RAII guard
//! - Emission functions for retry, exhaustion and session transition events
//!
//! Events are emitted at `info!` level unless noted. For JSON output,
//! initialise tracing with `json = true`.

use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

/// RAII guard that enters a session-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = SessionSpan::enter("6f1c…");
/// // every event below carries session_id = "6f1c…"
/// ```
pub struct SessionSpan {
    _span: tracing::span::EnteredSpan,
}

impl SessionSpan {
    pub fn enter(session_id: &str) -> Self {
        Self {
            _span: session_span(session_id).entered(),
        }
    }
}

/// Session-scoped span for instrumenting futures.
///
/// Use this instead of [`SessionSpan`] across `.await` points.
pub fn session_span(session_id: &str) -> tracing::Span {
    tracing::info_span!("claimcheck.session", session_id = %session_id)
}

/// Emit event: a retryable failure, with the sleep before the next attempt.
pub fn emit_invoke_retry(
    label: &str,
    attempt: u32,
    max_attempts: u32,
    delay: Duration,
    error: &dyn fmt::Display,
) {
    warn!(
        event = "invoke.retry",
        call = %label,
        attempt = attempt,
        max_attempts = max_attempts,
        delay_ms = delay.as_millis() as u64,
        error = %error,
    );
}

/// Emit event: the invoker gave up.
pub fn emit_invoke_exhausted(label: &str, attempts: u32, outcome: &str) {
    warn!(
        event = "invoke.exhausted",
        call = %label,
        attempts = attempts,
        outcome = %outcome,
    );
}

/// Emit event: a turn was appended to the transcript.
pub fn emit_turn_appended(session_id: &str, speaker: &str, index: usize) {
    info!(
        event = "session.turn_appended",
        session_id = %session_id,
        speaker = %speaker,
        index = index,
    );
}

/// Emit event: state machine transition.
pub fn emit_state_changed(session_id: &str, from: &str, to: &str) {
    info!(
        event = "session.state_changed",
        session_id = %session_id,
        from = %from,
        to = %to,
    );
}

/// Emit event: session reached TERMINATED.
pub fn emit_session_terminated(session_id: &str, ended_by: &str, turns: usize) {
    info!(
        event = "session.terminated",
        session_id = %session_id,
        ended_by = %ended_by,
        turns = turns,
    );
}
