use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::violation::ViolationRecord;
use crate::models::{AnswerValue, ResultVisibility};

/// Core mutable state of one student's run through a quiz. Owned exclusively
/// by the session controller for its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptSession {
    pub session_id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub status: SessionStatus,
    pub current_index: usize,
    /// Keys present only for questions the user has touched.
    pub answers: HashMap<String, AnswerValue>,
    /// Accumulated seconds per question id, non-decreasing while active.
    pub per_question_seconds: HashMap<String, u64>,
    /// Countdown in seconds; `None` when the quiz has no time limit.
    pub time_remaining: Option<u64>,
    pub started_at: DateTime<Utc>,
    /// Append-only record of every detected integrity event.
    pub violations: Vec<ViolationRecord>,
    /// Incremented only for events that surfaced a user-facing warning.
    pub warning_count: u32,
}

impl AttemptSession {
    /// Total seconds attributed to questions so far.
    pub fn elapsed_seconds(&self) -> u64 {
        self.per_question_seconds.values().sum()
    }

    /// Attempts the given status transition, enforcing the monotonic state
    /// machine. Returns false (and leaves state untouched) for illegal edges.
    pub fn transition(&mut self, next: SessionStatus) -> bool {
        if self.status.can_transition(next) {
            tracing::debug!(
                "Session {} status {:?} -> {:?}",
                self.session_id,
                self.status,
                next
            );
            self.status = next;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Initializing,
    Active,
    Submitting,
    Submitted,
    Abandoned,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Submitted | SessionStatus::Abandoned)
    }

    /// Legal edges of the status machine. Transitions never move backwards
    /// and terminal states have no outgoing edges.
    pub fn can_transition(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Initializing, Active) | (Active, Submitting) | (Active, Abandoned) | (Submitting, Submitted)
        )
    }
}

/// Why a submission happened. Recorded on the result so forced submissions
/// are distinguishable downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionReason {
    UserInitiated,
    TimeExpired,
    IntegrityEscalation,
}

impl SubmissionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionReason::UserInitiated => "user_initiated",
            SubmissionReason::TimeExpired => "time_expired",
            SubmissionReason::IntegrityEscalation => "integrity_escalation",
        }
    }
}

/// The record handed to the attempt store on submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub result_id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub answers: HashMap<String, AnswerValue>,
    pub score: u32,
    pub total_points: u32,
    pub per_question_seconds: HashMap<String, u64>,
    pub total_seconds: u64,
    pub started_at: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
    pub violation_count: usize,
    pub violations: Vec<ViolationRecord>,
    pub warning_count: u32,
    pub reason: SubmissionReason,
}

/// Terminal outcome emitted to the caller, which decides whether to route to
/// a review screen or a generic dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub result_id: String,
    pub allow_review: bool,
    pub show_results: ResultVisibility,
}
