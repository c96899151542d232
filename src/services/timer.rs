//! Time accounting applied on a 1-second tick: the overall countdown (when a
//! limit exists) and the per-question elapsed counter. Both signals are
//! edge-triggered and latch so they cannot re-fire.

use crate::config::EngineConfig;
use crate::models::session::{AttemptSession, SessionStatus};

/// One-shot signal raised by a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickSignal {
    /// Remaining time crossed the configured warning boundary.
    Warning { remaining: u64 },
    /// The countdown reached zero; submission must follow.
    Expired,
}

#[derive(Debug)]
pub struct TickTracker {
    warning_at: u64,
    warning_fired: bool,
    expired_fired: bool,
}

impl TickTracker {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            warning_at: config.time_warning_secs,
            warning_fired: false,
            expired_fired: false,
        }
    }

    /// Applies one second of elapsed time. No-op unless the session is
    /// `Active`, so no time is accounted once submission begins.
    pub fn apply(
        &mut self,
        session: &mut AttemptSession,
        current_question_id: Option<&str>,
    ) -> Option<TickSignal> {
        if session.status != SessionStatus::Active {
            return None;
        }

        if let Some(question_id) = current_question_id {
            *session
                .per_question_seconds
                .entry(question_id.to_string())
                .or_insert(0) += 1;
        }

        let remaining = session.time_remaining.as_mut()?;
        let before = *remaining;
        *remaining = remaining.saturating_sub(1);
        let after = *remaining;

        if after == 0 && !self.expired_fired {
            self.expired_fired = true;
            return Some(TickSignal::Expired);
        }

        // Compare-on-transition: fires only on the tick that crosses the
        // boundary, never again while the level stays below it.
        if before > self.warning_at && after <= self.warning_at && !self.warning_fired {
            self.warning_fired = true;
            return Some(TickSignal::Warning { remaining: after });
        }

        None
    }
}
