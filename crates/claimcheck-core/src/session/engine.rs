//! Interview state machine.
//!
//! `AWAITING_ANSWER -> PROCESSING -> {AWAITING_ANSWER | CONCLUDING} -> TERMINATED`
//!
//! The session owns its transcript and state exclusively. Callers drive it
//! with [`InterviewSession::submit`], [`InterviewSession::conclude`],
//! [`InterviewSession::force_finish`] and [`InterviewSession::cancel`], and
//! may observe it through a [`SessionEvent`] channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reasoning_client::{
    interviewer_request, InterviewContext, InterviewTurn, ReasoningService, Speaker,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, Instrument};
use uuid::Uuid;

use super::error::{SessionError, SessionResult};
use super::markers::{
    canned_response, is_silence, is_termination, silence_kind, COUNTDOWN_TICKS,
    TARGET_QUESTION_COUNT,
};
use super::state::{
    EndedBy, FinishedInterview, SessionEvent, SessionState, SubmitOutcome, TurnTimer,
};
use crate::invoker::ResilientInvoker;
use crate::obs;

const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// A single turn-based interview over one flagged claim.
pub struct InterviewSession {
    id: String,
    context: InterviewContext,
    state: SessionState,
    transcript: Vec<InterviewTurn>,
    timer: TurnTimer,
    service: Arc<dyn ReasoningService>,
    invoker: ResilientInvoker,
    events: Option<UnboundedSender<SessionEvent>>,
}

impl InterviewSession {
    /// Open a session. The claim's interview question is the first turn.
    pub fn start(
        context: InterviewContext,
        service: Arc<dyn ReasoningService>,
        invoker: ResilientInvoker,
    ) -> Self {
        Self::start_observed(context, service, invoker, None)
    }

    /// Like [`InterviewSession::start`], reporting every change on `events`.
    pub fn start_observed(
        context: InterviewContext,
        service: Arc<dyn ReasoningService>,
        invoker: ResilientInvoker,
        events: Option<UnboundedSender<SessionEvent>>,
    ) -> Self {
        let opening = InterviewTurn::interviewer(context.claim.interview_question.clone());
        let mut session = InterviewSession {
            id: Uuid::new_v4().to_string(),
            context,
            state: SessionState::AwaitingAnswer,
            transcript: Vec::new(),
            timer: TurnTimer::default(),
            service,
            invoker,
            events,
        };
        info!(
            session_id = %session.id,
            topic = %session.context.claim.topic,
            level = %session.context.level,
            "interview started"
        );
        session.append(opening);
        session.arm_timer();
        session
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context(&self) -> &InterviewContext {
        &self.context
    }

    /// Authoritative transcript, append-only.
    pub fn transcript(&self) -> &[InterviewTurn] {
        &self.transcript
    }

    /// Candidate answers so far, capped at the target count.
    pub fn question_count(&self) -> usize {
        self.candidate_turns().min(TARGET_QUESTION_COUNT)
    }

    pub fn target_question_count(&self) -> usize {
        TARGET_QUESTION_COUNT
    }

    /// Current answer deadline, if a time limit is configured.
    pub fn turn_deadline(&self) -> Option<DateTime<Utc>> {
        self.timer.deadline()
    }

    pub fn is_turn_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.timer.is_expired_at(now)
    }

    /// Submit a candidate answer.
    ///
    /// Silent answers get a canned reply without a reasoning call. Otherwise
    /// the interviewer's next turn is requested through the invoker. If that
    /// fails, the candidate turn stays in the transcript and the session
    /// returns to AWAITING_ANSWER.
    pub async fn submit(&mut self, text: &str) -> SessionResult<SubmitOutcome> {
        let span = obs::session_span(&self.id);
        self.submit_inner(text).instrument(span).await
    }

    async fn submit_inner(&mut self, text: &str) -> SessionResult<SubmitOutcome> {
        self.ensure_state("submit an answer")?;

        let answer = text.trim();
        self.timer.clear();
        self.append(InterviewTurn::candidate(answer));

        if is_silence(answer) {
            let kind = silence_kind(answer, self.context.time_limit_secs);
            debug!(?kind, "silent answer, skipping reasoning call");
            let reply = InterviewTurn::interviewer(canned_response(kind, self.context.tone));
            self.append(reply.clone());
            self.arm_timer();
            return Ok(SubmitOutcome::Silence { reply });
        }

        self.transition(SessionState::Processing);
        let request = interviewer_request(&self.context, &self.transcript);
        let service = &self.service;
        let result = self
            .invoker
            .invoke("interview.turn", || service.generate(&request))
            .await;

        let text = match result {
            Ok(text) => text,
            Err(err) => {
                self.transition(SessionState::AwaitingAnswer);
                self.arm_timer();
                return Err(SessionError::Reasoning(err));
            }
        };

        let reply = InterviewTurn::interviewer(text.trim());
        self.append(reply.clone());

        if is_termination(&reply.text) {
            self.transition(SessionState::Concluding);
            Ok(SubmitOutcome::Concluding { reply })
        } else {
            self.transition(SessionState::AwaitingAnswer);
            self.arm_timer();
            Ok(SubmitOutcome::Continue { reply })
        }
    }

    /// Run the closing countdown and hand off the transcript.
    pub async fn conclude(&mut self) -> SessionResult<FinishedInterview> {
        let span = obs::session_span(&self.id);
        self.conclude_inner().instrument(span).await
    }

    async fn conclude_inner(&mut self) -> SessionResult<FinishedInterview> {
        match self.state {
            SessionState::Concluding => {}
            SessionState::Terminated => return Err(SessionError::AlreadyFinished),
            state => {
                return Err(SessionError::InvalidState {
                    action: "conclude",
                    state,
                })
            }
        }

        for remaining in (0..COUNTDOWN_TICKS).rev() {
            tokio::time::sleep(COUNTDOWN_TICK).await;
            self.emit(SessionEvent::CountdownTick { remaining });
        }
        Ok(self.finish(EndedBy::Concluded))
    }

    /// End the interview now with the transcript as it stands.
    pub fn force_finish(&mut self) -> SessionResult<FinishedInterview> {
        let _span = obs::SessionSpan::enter(&self.id);
        self.ensure_state("finish the interview")?;
        Ok(self.finish(EndedBy::Forced))
    }

    /// Abandon the session without feedback.
    pub fn cancel(self) {
        info!(session_id = %self.id, state = %self.state, "interview cancelled");
    }

    fn ensure_state(&self, action: &'static str) -> SessionResult<()> {
        match self.state {
            SessionState::AwaitingAnswer => Ok(()),
            SessionState::Concluding | SessionState::Terminated => {
                Err(SessionError::AlreadyFinished)
            }
            state => Err(SessionError::InvalidState { action, state }),
        }
    }

    fn finish(&mut self, ended_by: EndedBy) -> FinishedInterview {
        self.timer.clear();
        self.transition(SessionState::Terminated);
        self.emit(SessionEvent::Finished { ended_by });
        obs::emit_session_terminated(&self.id, ended_by.as_str(), self.transcript.len());

        FinishedInterview {
            session_id: self.id.clone(),
            context: self.context.clone(),
            transcript: self.transcript.clone(),
            ended_by,
        }
    }

    fn candidate_turns(&self) -> usize {
        self.transcript
            .iter()
            .filter(|t| t.speaker == Speaker::Candidate)
            .count()
    }

    fn append(&mut self, turn: InterviewTurn) {
        let speaker = match turn.speaker {
            Speaker::Interviewer => "interviewer",
            Speaker::Candidate => "candidate",
        };
        self.transcript.push(turn.clone());
        obs::emit_turn_appended(&self.id, speaker, self.transcript.len() - 1);
        let question_count = self.question_count();
        self.emit(SessionEvent::TurnAppended {
            turn,
            question_count,
        });
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        if from == SessionState::AwaitingAnswer {
            self.timer.clear();
        }
        self.state = to;
        obs::emit_state_changed(&self.id, from.as_str(), to.as_str());
        self.emit(SessionEvent::StateChanged { from, to });
    }

    fn arm_timer(&mut self) {
        if self.state != SessionState::AwaitingAnswer {
            return;
        }
        if let Some(limit) = self.context.time_limit_secs {
            let deadline = self.timer.arm(Utc::now(), limit);
            self.emit(SessionEvent::TimerArmed { deadline });
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            // A dropped observer does not stop the session.
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::{InvocationPolicy, InvokeError};
    use crate::session::markers::TIME_EXCEEDED_MARKER;
    use async_trait::async_trait;
    use reasoning_client::{
        FlaggedClaim, InterviewLevel, ReasoningError, ReasoningRequest, Tone, Verdict,
        TERMINATION_PHRASE,
    };
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Replays scripted replies and records every request.
    #[derive(Default)]
    struct ScriptedService {
        replies: Mutex<VecDeque<Result<String, ReasoningError>>>,
        requests: Mutex<Vec<ReasoningRequest>>,
    }

    impl ScriptedService {
        fn new(replies: Vec<Result<String, ReasoningError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::default(),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ReasoningService for ScriptedService {
        async fn generate(&self, request: &ReasoningRequest) -> reasoning_client::Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ReasoningError::EmptyResponse))
        }
    }

    fn context(time_limit_secs: Option<u64>) -> InterviewContext {
        InterviewContext {
            claim: FlaggedClaim {
                topic: "Queues".into(),
                resume_claim: "Designed a job queue".into(),
                code_observation: "Queue uses a Vec with no persistence".into(),
                question_basis: "JD asks for reliability".into(),
                verdict: Verdict::Exaggerated,
                interview_question: "How does your queue survive a crash?".into(),
                score: 70.0,
            },
            level: InterviewLevel::Mid3,
            time_limit_secs,
            tone: Tone::Neutral,
        }
    }

    fn fast_invoker() -> ResilientInvoker {
        ResilientInvoker::new(InvocationPolicy::new(1, 0))
    }

    #[tokio::test]
    async fn test_session_opens_with_claim_question() {
        let service = ScriptedService::new(vec![]);
        let session = InterviewSession::start(context(None), service, fast_invoker());

        assert_eq!(session.state(), SessionState::AwaitingAnswer);
        assert_eq!(
            session.transcript(),
            &[InterviewTurn::interviewer("How does your queue survive a crash?")]
        );
        assert_eq!(session.question_count(), 0);
        assert_eq!(session.turn_deadline(), None);
    }

    #[tokio::test]
    async fn test_empty_submission_gets_voluntary_reply_without_reasoning_call() {
        let service = ScriptedService::new(vec![]);
        let mut session = InterviewSession::start(context(None), service.clone(), fast_invoker());

        let outcome = session.submit("").await.unwrap();

        assert!(matches!(outcome, SubmitOutcome::Silence { .. }));
        assert!(outcome.reply().text.starts_with("That's okay."));
        assert_eq!(session.state(), SessionState::AwaitingAnswer);
        assert_eq!(service.calls(), 0);
        assert_eq!(session.transcript().len(), 3);
        assert_eq!(session.transcript()[1], InterviewTurn::candidate(""));
    }

    #[tokio::test]
    async fn test_timeout_marker_with_limit_gets_time_limit_reply() {
        let service = ScriptedService::new(vec![]);
        let mut session =
            InterviewSession::start(context(Some(30)), service.clone(), fast_invoker());

        let outcome = session.submit(TIME_EXCEEDED_MARKER).await.unwrap();
        assert!(outcome.reply().text.starts_with("Time is up."));
        assert_eq!(service.calls(), 0);
        assert!(session.turn_deadline().is_some());
    }

    #[tokio::test]
    async fn test_regular_answer_round_trip() {
        let service = ScriptedService::new(vec![Ok("What about retries?".into())]);
        let mut session = InterviewSession::start(context(None), service.clone(), fast_invoker());

        let outcome = session.submit("  It writes to a WAL first ").await.unwrap();

        assert_eq!(
            outcome,
            SubmitOutcome::Continue {
                reply: InterviewTurn::interviewer("What about retries?")
            }
        );
        assert_eq!(session.state(), SessionState::AwaitingAnswer);
        assert_eq!(session.question_count(), 1);
        assert_eq!(
            session.transcript()[1],
            InterviewTurn::candidate("It writes to a WAL first")
        );

        // The request carries the full transcript up to the candidate turn.
        let requests = service.requests.lock().unwrap();
        assert_eq!(requests[0].contents.len(), 1 + 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_termination_phrase_concludes_after_five_ticks() {
        let closing = format!("Sufficiently explained. {TERMINATION_PHRASE}");
        let service = ScriptedService::new(vec![
            Ok("And on restart?".into()),
            Ok(closing.clone()),
        ]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session =
            InterviewSession::start_observed(context(None), service, fast_invoker(), Some(tx));

        session.submit("WAL replay").await.unwrap();
        let outcome = session.submit("Checkpoints every 10s").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Concluding { .. }));
        assert_eq!(session.state(), SessionState::Concluding);

        // No more answers once concluding.
        assert!(matches!(
            session.submit("one more thing").await,
            Err(SessionError::AlreadyFinished)
        ));
        assert!(matches!(
            session.force_finish(),
            Err(SessionError::AlreadyFinished)
        ));

        let before = session.transcript().to_vec();
        let start = tokio::time::Instant::now();
        let finished = session.conclude().await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(finished.ended_by, EndedBy::Concluded);
        assert_eq!(finished.transcript, before);
        assert_eq!(finished.transcript.len(), 5);
        assert_eq!(finished.transcript[4].text, closing);

        let mut ticks = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SessionEvent::CountdownTick { remaining } = event {
                ticks.push(remaining);
            }
        }
        assert_eq!(ticks, vec![4, 3, 2, 1, 0]);

        assert!(matches!(
            session.conclude().await,
            Err(SessionError::AlreadyFinished)
        ));
    }

    #[tokio::test]
    async fn test_conclude_requires_concluding_state() {
        let service = ScriptedService::new(vec![]);
        let mut session = InterviewSession::start(context(None), service, fast_invoker());
        assert!(matches!(
            session.conclude().await,
            Err(SessionError::InvalidState {
                state: SessionState::AwaitingAnswer,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_force_finish_keeps_transcript() {
        let service = ScriptedService::new(vec![Ok("Go on.".into())]);
        let mut session = InterviewSession::start(context(Some(60)), service, fast_invoker());
        session.submit("Uses fsync").await.unwrap();

        let finished = session.force_finish().unwrap();

        assert_eq!(finished.ended_by, EndedBy::Forced);
        assert_eq!(finished.transcript.len(), 3);
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(session.turn_deadline(), None);
        assert!(matches!(
            session.force_finish(),
            Err(SessionError::AlreadyFinished)
        ));
    }

    #[tokio::test]
    async fn test_reasoning_failure_returns_to_awaiting_answer() {
        let service = ScriptedService::new(vec![Err(ReasoningError::Api {
            status: 400,
            message: "bad".into(),
        })]);
        let mut session = InterviewSession::start(context(Some(45)), service, fast_invoker());

        let err = session.submit("A detailed answer").await.unwrap_err();

        assert!(matches!(
            err,
            SessionError::Reasoning(InvokeError::Failed(ReasoningError::Api { status: 400, .. }))
        ));
        assert_eq!(session.state(), SessionState::AwaitingAnswer);
        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.transcript()[1].speaker, Speaker::Candidate);
        assert!(session.turn_deadline().is_some());
    }

    #[tokio::test]
    async fn test_rate_limited_turn_surfaces_friendly_message() {
        let service = ScriptedService::new(vec![Err(ReasoningError::Api {
            status: 429,
            message: "RESOURCE_EXHAUSTED: quota".into(),
        })]);
        let mut session = InterviewSession::start(context(None), service, fast_invoker());

        let err = session.submit("My answer").await.unwrap_err();
        assert_eq!(err.user_message(), crate::invoker::RATE_LIMIT_MESSAGE);
    }

    #[tokio::test]
    async fn test_timer_armed_only_while_awaiting_answer() {
        let service = ScriptedService::new(vec![Ok(format!("Done. {TERMINATION_PHRASE}"))]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session =
            InterviewSession::start_observed(context(Some(20)), service, fast_invoker(), Some(tx));

        let deadline = session.turn_deadline().unwrap();
        assert!(session.is_turn_expired_at(deadline));
        assert!(!session.is_turn_expired_at(deadline - chrono::Duration::seconds(1)));

        session.submit("final answer").await.unwrap();
        assert_eq!(session.state(), SessionState::Concluding);
        assert_eq!(session.turn_deadline(), None);

        let events: Vec<SessionEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        let armed = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::TimerArmed { .. }))
            .count();
        assert_eq!(armed, 1);
        assert!(events.contains(&SessionEvent::StateChanged {
            from: SessionState::AwaitingAnswer,
            to: SessionState::Processing,
        }));
        assert!(events.contains(&SessionEvent::StateChanged {
            from: SessionState::Processing,
            to: SessionState::Concluding,
        }));
    }

    /// Records the enclosing span name of every event.
    #[derive(Clone, Default)]
    struct SpanRecorder {
        spans: Arc<Mutex<Vec<Option<String>>>>,
    }

    impl<S> tracing_subscriber::Layer<S> for SpanRecorder
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let span = ctx.event_span(event).map(|s| s.name().to_string());
            self.spans.lock().unwrap().push(span);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_conclude_events_carry_session_span() {
        use tracing_subscriber::layer::SubscriberExt;

        let recorder = SpanRecorder::default();
        let subscriber = tracing_subscriber::registry().with(recorder.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let service = ScriptedService::new(vec![Ok(TERMINATION_PHRASE.to_string())]);
        let mut session = InterviewSession::start(context(None), service, fast_invoker());
        session.submit("Done").await.unwrap();
        recorder.spans.lock().unwrap().clear();

        session.conclude().await.unwrap();

        let spans = recorder.spans.lock().unwrap().clone();
        assert!(!spans.is_empty());
        assert!(spans
            .iter()
            .all(|s| s.as_deref() == Some("claimcheck.session")));
    }

    #[tokio::test]
    async fn test_oversized_time_limit_never_expires_immediately() {
        let service = ScriptedService::new(vec![]);
        let mut session =
            InterviewSession::start(context(Some(u64::MAX)), service.clone(), fast_invoker());

        let deadline = session.turn_deadline().unwrap();
        assert!(deadline > Utc::now());
        assert!(!session.is_turn_expired_at(Utc::now()));

        // Re-armed after a silent turn, still saturated.
        session.submit("").await.unwrap();
        assert_eq!(session.turn_deadline(), Some(deadline));
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn test_question_count_is_clamped() {
        let service = ScriptedService::new(vec![]);
        let mut session = InterviewSession::start(context(None), service, fast_invoker());
        for _ in 0..12 {
            session.submit("pass").await.unwrap();
        }
        assert_eq!(session.question_count(), TARGET_QUESTION_COUNT);
        assert_eq!(session.transcript().len(), 1 + 12 * 2);
    }

    #[tokio::test]
    async fn test_cancel_is_a_plain_discard() {
        let service = ScriptedService::new(vec![]);
        let session = InterviewSession::start(context(None), service.clone(), fast_invoker());
        session.cancel();
        assert_eq!(service.calls(), 0);
    }
}
