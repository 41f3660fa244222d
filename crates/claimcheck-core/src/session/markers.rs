//! Fixed phrase sets that drive session transitions.
//!
//! All matching is plain substring containment so transitions can be tested
//! without any reasoning-service wording.

use reasoning_client::{Tone, TERMINATION_PHRASE};

/// Submission synthesised by a caller when the turn timer runs out.
pub const TIME_EXCEEDED_MARKER: &str = "(answer time exceeded)";

/// Interviewer phrases that end an interview.
pub const TERMINATION_PHRASES: &[&str] = &[TERMINATION_PHRASE, "면접을 종료하겠습니다"];

/// Low-content answers handled without a reasoning call. Compared against
/// the lowercased, trimmed submission.
pub const SILENCE_MARKERS: &[&str] = &[
    "...",
    "pass",
    "i don't know",
    "i dont know",
    "no idea",
    "don't remember",
    "time exceeded",
    "모르겠습니다",
    "잘 모르겠어요",
    "모름",
    "기억안남",
    "패스",
    "시간 초과",
];

/// Markers that mean the turn timer ran out rather than a voluntary skip.
const TIMEOUT_MARKERS: &[&str] = &["time exceeded", "시간 초과"];

/// Candidate questions per interview, for the progress display.
pub const TARGET_QUESTION_COUNT: usize = 10;

/// Ticks between CONCLUDING and TERMINATED, one per second.
pub const COUNTDOWN_TICKS: u32 = 5;

/// Why a silent turn was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SilenceKind {
    TimeLimit,
    Voluntary,
}

pub fn is_silence(submission: &str) -> bool {
    let normalized = submission.trim().to_lowercase();
    normalized.is_empty() || SILENCE_MARKERS.iter().any(|m| normalized.contains(m))
}

pub fn is_timeout_submission(submission: &str) -> bool {
    let normalized = submission.trim().to_lowercase();
    TIMEOUT_MARKERS.iter().any(|m| normalized.contains(m))
}

pub fn is_termination(interviewer_text: &str) -> bool {
    TERMINATION_PHRASES
        .iter()
        .any(|p| interviewer_text.contains(p))
}

/// Classify a silent submission. Only a configured time limit can produce
/// [`SilenceKind::TimeLimit`].
pub fn silence_kind(submission: &str, time_limit_secs: Option<u64>) -> SilenceKind {
    if time_limit_secs.is_some() && is_timeout_submission(submission) {
        SilenceKind::TimeLimit
    } else {
        SilenceKind::Voluntary
    }
}

/// Deterministic interviewer reply to a silent turn.
pub fn canned_response(kind: SilenceKind, tone: Tone) -> String {
    match kind {
        SilenceKind::TimeLimit => {
            let aside = match tone {
                Tone::Direct => "Too bad, let's make up for it on the next one!",
                Tone::Analytical => "In a real interview, managing time is part of the skill. Stay focused.",
                Tone::Neutral => "Try to lead with the key point next time.",
            };
            format!("Time is up. {aside} Let's move on to the next question.")
        }
        SilenceKind::Voluntary => {
            let aside = match tone {
                Tone::Direct => "Don't be nervous, just talk it through in your own words.",
                Tone::Analytical => {
                    "If the answer is difficult, it is fine to say so honestly and move on."
                }
                Tone::Neutral => "Take your time.",
            };
            format!("That's okay. {aside} Shall I ask a different question?")
        }
    }
}
