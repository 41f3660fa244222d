//! Session state, turn timer and observer events.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use reasoning_client::{InterviewContext, InterviewTurn};
use serde::{Deserialize, Serialize};

/// Lifecycle of an interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    AwaitingAnswer,
    Processing,
    Concluding,
    Terminated,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::AwaitingAnswer => "AWAITING_ANSWER",
            SessionState::Processing => "PROCESSING",
            SessionState::Concluding => "CONCLUDING",
            SessionState::Terminated => "TERMINATED",
        }
    }

    /// No further candidate input is possible.
    pub fn is_finishing(&self) -> bool {
        matches!(self, SessionState::Concluding | SessionState::Terminated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-turn answer deadline. Armed only while awaiting an answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnTimer {
    deadline: Option<DateTime<Utc>>,
}

impl TurnTimer {
    /// Arm the timer `limit_secs` from `now`. Limits past the calendar's
    /// range saturate to the latest representable instant.
    pub fn arm(&mut self, now: DateTime<Utc>, limit_secs: u64) -> DateTime<Utc> {
        let deadline = i64::try_from(limit_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|limit| now.checked_add_signed(limit))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.deadline = Some(deadline);
        deadline
    }

    pub fn clear(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|d| now >= d)
    }

    /// Whole seconds left, rounded up; `None` when disarmed.
    pub fn remaining_secs_at(&self, now: DateTime<Utc>) -> Option<u64> {
        self.deadline.map(|d| {
            let ms = (d - now).num_milliseconds().max(0) as u64;
            ms.div_ceil(1000)
        })
    }
}

/// How the interview reached TERMINATED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndedBy {
    /// Interviewer used a termination phrase and the countdown ran out.
    Concluded,
    /// Candidate ended the interview early.
    Forced,
}

impl EndedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndedBy::Concluded => "concluded",
            EndedBy::Forced => "forced",
        }
    }
}

/// Notification sent to a session observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    TurnAppended {
        turn: InterviewTurn,
        question_count: usize,
    },
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    TimerArmed {
        deadline: DateTime<Utc>,
    },
    CountdownTick {
        remaining: u32,
    },
    Finished {
        ended_by: EndedBy,
    },
}

/// Reply produced by one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Canned reply to a silent answer; no reasoning call was made.
    Silence { reply: InterviewTurn },
    /// Regular interviewer follow-up.
    Continue { reply: InterviewTurn },
    /// Interviewer ended the interview; call `conclude` next.
    Concluding { reply: InterviewTurn },
}

impl SubmitOutcome {
    pub fn reply(&self) -> &InterviewTurn {
        match self {
            SubmitOutcome::Silence { reply }
            | SubmitOutcome::Continue { reply }
            | SubmitOutcome::Concluding { reply } => reply,
        }
    }
}

/// Hand-off from a finished session to the feedback stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedInterview {
    pub session_id: String,
    pub context: InterviewContext,
    /// Every turn, in order, exactly as appended
    pub transcript: Vec<InterviewTurn>,
    pub ended_by: EndedBy,
}
