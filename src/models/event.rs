use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::session::SubmissionReason;
use crate::models::violation::ViolationKind;

/// Notifications broadcast to the embedding host (UI layer) while a session
/// runs. Presentation is the host's problem; the engine only reports.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionEvent {
    TimerTick(TimerTick),
    TimeWarning(TimeWarning),
    TimeExpired(TimeExpired),
    IntegrityWarning(IntegrityWarning),
    ActionSuppressed(ActionSuppressed),
    CloseIntercepted(CloseIntercepted),
    ProgressSaved(ProgressSaved),
    Submitted(SubmittedNotice),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimerTick {
    pub session_id: String,
    pub remaining_seconds: Option<u64>,
    pub elapsed_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimeWarning {
    pub session_id: String,
    pub remaining_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimeExpired {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IntegrityWarning {
    pub session_id: String,
    pub kind: ViolationKind,
    pub message: String,
    pub warning_count: u32,
    pub timestamp: DateTime<Utc>,
}

/// A copy/paste/context-menu action was blocked outright.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ActionSuppressed {
    pub session_id: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// Best-effort page-close interception request. The host should prompt the
/// user; if the page is destroyed anyway the last saved snapshot stands.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CloseIntercepted {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProgressSaved {
    pub session_id: String,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubmittedNotice {
    pub session_id: String,
    pub result_id: String,
    pub reason: SubmissionReason,
    pub score: u32,
    pub total_points: u32,
    pub timestamp: DateTime<Utc>,
}

impl SessionEvent {
    pub fn to_wire_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            SessionEvent::TimerTick(_) => "timer-tick",
            SessionEvent::TimeWarning(_) => "time-warning",
            SessionEvent::TimeExpired(_) => "time-expired",
            SessionEvent::IntegrityWarning(_) => "integrity-warning",
            SessionEvent::ActionSuppressed(_) => "action-suppressed",
            SessionEvent::CloseIntercepted(_) => "close-intercepted",
            SessionEvent::ProgressSaved(_) => "progress-saved",
            SessionEvent::Submitted(_) => "submitted",
        }
    }
}
