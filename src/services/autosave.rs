//! Debounced progress-save scheduling. One owned debounce deadline that each
//! new change cancels and reschedules (last write wins), plus a periodic
//! flush that backstops long idle stretches while unsaved changes exist.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::EngineConfig;

#[derive(Debug)]
pub struct AutosaveScheduler {
    debounce: Duration,
    flush_interval: Duration,
    dirty: bool,
    debounce_deadline: Option<Instant>,
    periodic_deadline: Option<Instant>,
}

impl AutosaveScheduler {
    pub fn new(config: &EngineConfig, now: Instant) -> Self {
        let _ = now;
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            flush_interval: Duration::from_secs(config.autosave_interval_secs),
            dirty: false,
            debounce_deadline: None,
            periodic_deadline: None,
        }
    }

    /// An answer edit or navigation happened. Replaces any pending debounce
    /// deadline; arms the periodic backstop if this is the first unsaved
    /// change since the last flush.
    pub fn note_change(&mut self, now: Instant) {
        if !self.dirty {
            self.dirty = true;
            self.periodic_deadline = Some(now + self.flush_interval);
        }
        self.debounce_deadline = Some(now + self.debounce);
    }

    /// The next instant a flush should run, if any work is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.dirty {
            return None;
        }
        match (self.debounce_deadline, self.periodic_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Whether a flush is due at `now`. Consumes the fired deadlines; the
    /// dirty flag stays set until `mark_flushed` confirms success.
    pub fn take_due(&mut self, now: Instant) -> bool {
        let due = self.next_deadline().is_some_and(|at| at <= now);
        if due {
            self.debounce_deadline = None;
            self.periodic_deadline = Some(now + self.flush_interval);
        }
        due
    }

    pub fn mark_flushed(&mut self) {
        self.dirty = false;
        self.debounce_deadline = None;
        self.periodic_deadline = None;
    }

    /// A flush failed. State stays dirty so the periodic backstop retries
    /// with the latest snapshot.
    pub fn mark_failed(&mut self) {
        debug_assert!(self.dirty);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}
