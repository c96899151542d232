//! Session lifecycle: eligibility-gated creation, navigation and answer
//! edits, tick application, integrity handling, and the single idempotent
//! submission path every terminal trigger converges on.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EligibilityError, SubmitError};
use crate::metrics::{
    track_store_operation, PROGRESS_SAVES_TOTAL, SESSIONS_ACTIVE, SESSIONS_TOTAL,
    SUBMISSIONS_TOTAL, VIOLATIONS_TOTAL,
};
use crate::models::event::{
    ActionSuppressed, CloseIntercepted, IntegrityWarning, ProgressSaved, SessionEvent,
    SubmittedNotice, TimeExpired, TimeWarning, TimerTick,
};
use crate::models::session::{
    AttemptSession, ResultRecord, SessionOutcome, SessionStatus, SubmissionReason,
};
use crate::models::violation::{IntegrityEvent, ViolationKind, ViolationRecord};
use crate::models::{AnswerValue, Quiz};
use crate::services::autosave::AutosaveScheduler;
use crate::services::integrity::{EscalationPolicy, IntegrityAction, IntegrityMonitor};
use crate::services::scoring::{self, ScoreSummary};
use crate::services::timer::{TickSignal, TickTracker};
use crate::stores::{AttemptStore, ProgressSnapshot, QuizStore};
use crate::utils::retry::{retry_async, RetryConfig};

pub struct SessionController {
    quiz: Quiz,
    session: AttemptSession,
    ticker: TickTracker,
    monitor: Option<IntegrityMonitor>,
    autosave: AutosaveScheduler,
    attempt_store: Arc<dyn AttemptStore>,
    events: broadcast::Sender<SessionEvent>,
    /// Set on the first submit call so retries reuse the identical record.
    pending_result: Option<ResultRecord>,
    outcome: Option<SessionOutcome>,
}

impl SessionController {
    /// Resolves the quiz, checks attempt count and availability window, and
    /// only then creates the session. On any eligibility failure nothing is
    /// created and no timers exist.
    pub async fn initialize(
        quiz_store: &dyn QuizStore,
        attempt_store: Arc<dyn AttemptStore>,
        quiz_id: &str,
        user_id: &str,
        config: &EngineConfig,
        events: broadcast::Sender<SessionEvent>,
    ) -> Result<Self, EligibilityError> {
        let quiz = quiz_store
            .get_quiz(quiz_id)
            .await?
            .ok_or_else(|| EligibilityError::QuizNotFound(quiz_id.to_string()))?;

        quiz.validate()
            .map_err(|e| EligibilityError::InvalidQuiz(e.to_string()))?;

        if quiz.max_attempts > 0 {
            let used = attempt_store
                .count_completed_attempts(user_id, quiz_id)
                .await?;
            if used >= quiz.max_attempts {
                tracing::info!(
                    "Rejecting session for user {}: {} of {} attempts used on quiz {}",
                    user_id,
                    used,
                    quiz.max_attempts,
                    quiz_id
                );
                return Err(EligibilityError::NoAttemptsRemaining {
                    used,
                    max: quiz.max_attempts,
                });
            }
        }

        let now = Utc::now();
        if !quiz.is_available_at(now) {
            return Err(EligibilityError::OutsideAvailabilityWindow);
        }

        let mut session = AttemptSession {
            session_id: Uuid::new_v4().to_string(),
            quiz_id: quiz.id.clone(),
            user_id: user_id.to_string(),
            status: SessionStatus::Initializing,
            current_index: 0,
            answers: Default::default(),
            per_question_seconds: Default::default(),
            time_remaining: quiz.time_limit_seconds(),
            started_at: now,
            violations: Vec::new(),
            warning_count: 0,
        };
        session.transition(SessionStatus::Active);

        SESSIONS_TOTAL.with_label_values(&["created"]).inc();
        SESSIONS_ACTIVE.inc();
        tracing::info!(
            "Session {} created for user {} on quiz {} (security {:?}, limit {:?} min)",
            session.session_id,
            user_id,
            quiz.id,
            quiz.security_level,
            quiz.time_limit_minutes
        );

        let monitor =
            EscalationPolicy::for_level(quiz.security_level, config).map(IntegrityMonitor::new);
        let ticker = TickTracker::new(config);
        let autosave = AutosaveScheduler::new(config, Instant::now());

        Ok(Self {
            quiz,
            session,
            ticker,
            monitor,
            autosave,
            attempt_store,
            events,
            pending_result: None,
            outcome: None,
        })
    }

    pub fn session(&self) -> &AttemptSession {
        &self.session
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    pub fn is_active(&self) -> bool {
        self.session.status == SessionStatus::Active
    }

    /// Live score/completion view, recomputed on demand from current state.
    pub fn score_summary(&self) -> ScoreSummary {
        scoring::score(&self.session.answers, &self.quiz)
    }

    /// Records an answer for a known question. Unknown ids and non-active
    /// sessions are rejected without state change.
    pub fn answer(&mut self, question_id: &str, value: AnswerValue) -> bool {
        if !self.is_active() || self.quiz.question_by_id(question_id).is_none() {
            return false;
        }
        self.session
            .answers
            .insert(question_id.to_string(), value);
        self.autosave.note_change(Instant::now());
        true
    }

    /// Validate-then-mutate navigation; out-of-range indices are a no-op.
    /// Every call schedules a progress save without blocking on it.
    pub fn go_to(&mut self, index: usize) {
        if !self.is_active() || index >= self.quiz.questions.len() {
            return;
        }
        self.session.current_index = index;
        self.autosave.note_change(Instant::now());
    }

    /// Applies one second of elapsed time. Returns true when the countdown
    /// expired and submission must follow.
    pub fn tick(&mut self) -> bool {
        let question_id = self
            .quiz
            .questions
            .get(self.session.current_index)
            .map(|q| q.id.clone());

        let signal = self
            .ticker
            .apply(&mut self.session, question_id.as_deref());

        if self.is_active() {
            self.emit(SessionEvent::TimerTick(TimerTick {
                session_id: self.session.session_id.clone(),
                remaining_seconds: self.session.time_remaining,
                elapsed_seconds: self.session.elapsed_seconds(),
                timestamp: Utc::now(),
            }));
        }

        match signal {
            Some(TickSignal::Warning { remaining }) => {
                tracing::info!(
                    "Session {} low on time: {}s remaining",
                    self.session.session_id,
                    remaining
                );
                self.emit(SessionEvent::TimeWarning(TimeWarning {
                    session_id: self.session.session_id.clone(),
                    remaining_seconds: remaining,
                    timestamp: Utc::now(),
                }));
                false
            }
            Some(TickSignal::Expired) => {
                tracing::info!("Session {} time expired", self.session.session_id);
                self.emit(SessionEvent::TimeExpired(TimeExpired {
                    session_id: self.session.session_id.clone(),
                    timestamp: Utc::now(),
                    message: "Time is up; the attempt will be submitted".to_string(),
                }));
                true
            }
            None => false,
        }
    }

    /// Classifies one raw device event. Returns true when escalation policy
    /// demands a forced submission.
    pub fn observe_integrity(&mut self, event: IntegrityEvent) -> bool {
        if !self.is_active() {
            return false;
        }
        let actions = match self.monitor.as_mut() {
            Some(monitor) => monitor.observe(&event),
            None => return false,
        };

        let mut escalate = false;
        for action in actions {
            match action {
                IntegrityAction::Record(violation) => self.record(violation),
                IntegrityAction::Warn { message } => {
                    self.session.warning_count += 1;
                    tracing::warn!(
                        "Session {} integrity warning {}: {}",
                        self.session.session_id,
                        self.session.warning_count,
                        message
                    );
                    self.emit(SessionEvent::IntegrityWarning(IntegrityWarning {
                        session_id: self.session.session_id.clone(),
                        kind: self
                            .session
                            .violations
                            .last()
                            .map(|v| v.kind)
                            .unwrap_or(ViolationKind::TabSwitch),
                        message,
                        warning_count: self.session.warning_count,
                        timestamp: Utc::now(),
                    }));
                }
                IntegrityAction::Suppress { description } => {
                    self.emit(SessionEvent::ActionSuppressed(ActionSuppressed {
                        session_id: self.session.session_id.clone(),
                        description,
                        timestamp: Utc::now(),
                    }));
                }
                IntegrityAction::InterceptClose => {
                    self.emit(SessionEvent::CloseIntercepted(CloseIntercepted {
                        session_id: self.session.session_id.clone(),
                        timestamp: Utc::now(),
                    }));
                }
                IntegrityAction::AutoSubmit => escalate = true,
            }
        }
        escalate
    }

    /// Host-reported violation with no browser event of its own (e.g. a
    /// second device seen for the same attempt).
    pub fn report_violation(&mut self, kind: ViolationKind, description: &str) {
        if !self.is_active() {
            return;
        }
        self.record(ViolationRecord::new(kind, description, Utc::now()));
    }

    fn record(&mut self, violation: ViolationRecord) {
        VIOLATIONS_TOTAL
            .with_label_values(&[violation.kind.as_str()])
            .inc();
        tracing::debug!(
            "Session {} violation {}: {}",
            self.session.session_id,
            violation.kind.as_str(),
            violation.description
        );
        self.session.violations.push(violation);
    }

    /// Idempotent, terminal submission. All three triggers (user action,
    /// time expiry, integrity escalation) converge here; the first caller
    /// freezes the state, and the result record is computed once so retries
    /// after a store failure hand off the identical record.
    pub async fn submit(
        &mut self,
        reason: SubmissionReason,
    ) -> Result<SessionOutcome, SubmitError> {
        match self.session.status {
            SessionStatus::Submitted => {
                // Already done: return the existing result.
                return self
                    .outcome
                    .clone()
                    .ok_or(SubmitError::NotActive);
            }
            SessionStatus::Active => {
                // Halt timers and integrity handling before the score
                // snapshot; both check for Active and stop applying.
                self.session.transition(SessionStatus::Submitting);

                let summary = self.score_summary();
                let now = Utc::now();
                self.pending_result = Some(ResultRecord {
                    result_id: Uuid::new_v4().to_string(),
                    quiz_id: self.quiz.id.clone(),
                    user_id: self.session.user_id.clone(),
                    answers: self.session.answers.clone(),
                    score: summary.score,
                    total_points: summary.total_points,
                    per_question_seconds: self.session.per_question_seconds.clone(),
                    total_seconds: (now - self.session.started_at).num_seconds().max(0) as u64,
                    started_at: self.session.started_at,
                    submitted_at: now,
                    violation_count: self.session.violations.len(),
                    violations: self.session.violations.clone(),
                    warning_count: self.session.warning_count,
                    reason,
                });
            }
            SessionStatus::Submitting => {
                // Retry of a failed hand-off; pending_result is unchanged.
            }
            SessionStatus::Initializing | SessionStatus::Abandoned => {
                return Err(SubmitError::NotActive);
            }
        }

        let record = self
            .pending_result
            .clone()
            .ok_or(SubmitError::NotActive)?;

        track_store_operation("submit_result", self.attempt_store.submit_result(&record))
            .await
            .map_err(|e| {
                tracing::error!(
                    "Session {} result hand-off failed, staying in Submitting: {}",
                    self.session.session_id,
                    e
                );
                SubmitError::Store(e)
            })?;

        self.session.transition(SessionStatus::Submitted);
        SESSIONS_TOTAL.with_label_values(&["submitted"]).inc();
        SESSIONS_ACTIVE.dec();
        SUBMISSIONS_TOTAL
            .with_label_values(&[record.reason.as_str()])
            .inc();
        tracing::info!(
            "Session {} submitted ({}): score {}/{}, {} violations",
            self.session.session_id,
            record.reason.as_str(),
            record.score,
            record.total_points,
            record.violation_count
        );

        self.emit(SessionEvent::Submitted(SubmittedNotice {
            session_id: self.session.session_id.clone(),
            result_id: record.result_id.clone(),
            reason: record.reason,
            score: record.score,
            total_points: record.total_points,
            timestamp: Utc::now(),
        }));

        let outcome = SessionOutcome {
            result_id: record.result_id.clone(),
            allow_review: self.quiz.allow_review,
            show_results: self.quiz.show_results,
        };
        self.outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// Terminal exit without submission. Logged as a violation so the
    /// attempt record is complete if the host later inspects it.
    pub fn abandon(&mut self) {
        if !self.is_active() {
            return;
        }
        self.record(ViolationRecord::new(
            ViolationKind::QuizAbandoned,
            "session abandoned before submission",
            Utc::now(),
        ));
        self.session.transition(SessionStatus::Abandoned);
        SESSIONS_TOTAL.with_label_values(&["abandoned"]).inc();
        SESSIONS_ACTIVE.dec();
        tracing::info!("Session {} abandoned", self.session.session_id);
    }

    /// Final accounting when the host drops the session endpoint. An active
    /// session is abandoned after a best-effort flush. A session whose result
    /// hand-off never succeeded has no terminal edge left to take, so it is
    /// counted as stalled and the active gauge is released.
    pub async fn release(&mut self) {
        match self.session.status {
            SessionStatus::Active => {
                self.flush_progress_now().await;
                self.abandon();
            }
            SessionStatus::Submitting => {
                SESSIONS_TOTAL.with_label_values(&["stalled"]).inc();
                SESSIONS_ACTIVE.dec();
                tracing::warn!(
                    "Session {} dropped while submitting; result hand-off never completed",
                    self.session.session_id
                );
            }
            _ => {}
        }
    }

    /// Next instant the autosave machinery wants to run, if any.
    pub fn autosave_deadline(&self) -> Option<Instant> {
        if self.is_active() {
            self.autosave.next_deadline()
        } else {
            None
        }
    }

    /// Flushes progress if a save is due. Failures are logged and absorbed;
    /// the in-memory session stays authoritative and the periodic backstop
    /// retries with the latest state.
    pub async fn flush_progress_if_due(&mut self) {
        if !self.autosave.take_due(Instant::now()) {
            return;
        }
        self.flush_progress().await;
    }

    /// Immediate flush of any unsaved changes, regardless of deadlines.
    /// Used on teardown paths (abandonment, handle drop).
    pub async fn flush_progress_now(&mut self) {
        if !self.autosave.is_dirty() {
            return;
        }
        self.flush_progress().await;
    }

    async fn flush_progress(&mut self) {
        // Answers and position are read together so the snapshot can never
        // mix state from two moments.
        let snapshot = ProgressSnapshot {
            session_id: self.session.session_id.clone(),
            answers: self.session.answers.clone(),
            current_index: self.session.current_index,
            saved_at: Utc::now(),
        };

        let store = Arc::clone(&self.attempt_store);
        let result = track_store_operation(
            "save_progress",
            retry_async(RetryConfig::quick(), || store.save_progress(&snapshot)),
        )
        .await;

        match result {
            Ok(()) => {
                self.autosave.mark_flushed();
                PROGRESS_SAVES_TOTAL.with_label_values(&["success"]).inc();
                self.emit(SessionEvent::ProgressSaved(ProgressSaved {
                    session_id: self.session.session_id.clone(),
                    saved_at: snapshot.saved_at,
                }));
            }
            Err(e) => {
                self.autosave.mark_failed();
                PROGRESS_SAVES_TOTAL.with_label_values(&["error"]).inc();
                tracing::warn!(
                    "Session {} progress save failed, will retry on next cycle: {}",
                    self.session.session_id,
                    e
                );
            }
        }
    }

    pub fn events_sender(&self) -> broadcast::Sender<SessionEvent> {
        self.events.clone()
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine; the engine never blocks on the host.
        let _ = self.events.send(event);
    }
}
