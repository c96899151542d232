//! Violation classification and escalation. The policy table is data, not
//! control flow, so it can be tested apart from event plumbing.

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::models::violation::{
    IntegrityEvent, IntegrityEventKind, ViolationKind, ViolationRecord,
};
use crate::models::SecurityLevel;

/// How a classified event should be handled, in order of application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityAction {
    /// Append to the violation log. Every detected event records, whatever
    /// else the policy decides.
    Record(ViolationRecord),
    /// Surface a user-facing warning; increments the session warning count.
    Warn { message: String },
    /// The action was prevented outright (copy/paste/context-menu).
    Suppress { description: String },
    /// Ask the host to intercept a page close. Best effort, never fatal.
    InterceptClose,
    /// Escalation threshold reached; force submission.
    AutoSubmit,
}

/// Per-level escalation rules, materialized from configuration. `for_level`
/// returns `None` for levels the monitor does not run at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationPolicy {
    pub level: SecurityLevel,
    /// Whether focus-loss events surface a warning dialog. Extreme skips the
    /// warning and classifies directly.
    pub warn_on_focus_loss: bool,
    /// Tab switches that trigger auto-submit; `None` disables escalation.
    pub auto_submit_tab_switches: Option<u32>,
    /// Absence length after blur that records a time anomaly.
    pub blur_anomaly_secs: i64,
    /// Absence length that auto-submits on its own (extreme only).
    pub severe_blur_secs: Option<i64>,
}

impl EscalationPolicy {
    pub fn for_level(level: SecurityLevel, config: &EngineConfig) -> Option<Self> {
        if !level.monitored() {
            return None;
        }

        let policy = match level {
            SecurityLevel::Medium => Self {
                level,
                warn_on_focus_loss: true,
                auto_submit_tab_switches: None,
                blur_anomaly_secs: config.blur_anomaly_secs,
                severe_blur_secs: None,
            },
            SecurityLevel::High => Self {
                level,
                warn_on_focus_loss: true,
                auto_submit_tab_switches: Some(config.high_auto_submit_threshold),
                blur_anomaly_secs: config.blur_anomaly_secs,
                severe_blur_secs: None,
            },
            SecurityLevel::Extreme => Self {
                level,
                warn_on_focus_loss: false,
                auto_submit_tab_switches: Some(config.extreme_auto_submit_threshold),
                blur_anomaly_secs: config.blur_anomaly_secs,
                severe_blur_secs: Some(config.extreme_severe_blur_secs),
            },
            SecurityLevel::None | SecurityLevel::Low => unreachable!("unmonitored level"),
        };

        Some(policy)
    }
}

/// Classifies raw device events into violations and escalation decisions.
/// Holds only its own counters; session mutation stays with the controller.
#[derive(Debug)]
pub struct IntegrityMonitor {
    policy: EscalationPolicy,
    tab_switches: u32,
    focus_lost_at: Option<DateTime<Utc>>,
    auto_submitted: bool,
}

impl IntegrityMonitor {
    pub fn new(policy: EscalationPolicy) -> Self {
        Self {
            policy,
            tab_switches: 0,
            focus_lost_at: None,
            auto_submitted: false,
        }
    }

    pub fn observe(&mut self, event: &IntegrityEvent) -> Vec<IntegrityAction> {
        let mut actions = Vec::new();

        match event.kind {
            IntegrityEventKind::VisibilityHidden => {
                self.tab_switches += 1;
                let description = if self.policy.warn_on_focus_loss {
                    format!("tab switch detected (occurrence {})", self.tab_switches)
                } else {
                    format!(
                        "tab switch detected (occurrence {}), classified as cheating",
                        self.tab_switches
                    )
                };
                actions.push(IntegrityAction::Record(ViolationRecord::new(
                    ViolationKind::TabSwitch,
                    description,
                    event.at,
                )));

                if self.policy.warn_on_focus_loss {
                    actions.push(IntegrityAction::Warn {
                        message: "Leaving the quiz tab is recorded as a violation".to_string(),
                    });
                }

                if let Some(threshold) = self.policy.auto_submit_tab_switches {
                    if self.tab_switches >= threshold && !self.auto_submitted {
                        self.auto_submitted = true;
                        tracing::warn!(
                            "Tab switch threshold reached ({} of {}), forcing submission",
                            self.tab_switches,
                            threshold
                        );
                        actions.push(IntegrityAction::AutoSubmit);
                    }
                }
            }

            IntegrityEventKind::WindowBlur => {
                self.focus_lost_at = Some(event.at);
                let description = if self.policy.warn_on_focus_loss {
                    "window lost focus".to_string()
                } else {
                    "window lost focus, classified as cheating".to_string()
                };
                actions.push(IntegrityAction::Record(ViolationRecord::new(
                    ViolationKind::WindowBlur,
                    description,
                    event.at,
                )));

                if self.policy.warn_on_focus_loss {
                    actions.push(IntegrityAction::Warn {
                        message: "Keep the quiz window focused".to_string(),
                    });
                }
            }

            IntegrityEventKind::WindowFocus => {
                if let Some(lost_at) = self.focus_lost_at.take() {
                    let absence = (event.at - lost_at).num_seconds();
                    if absence >= self.policy.blur_anomaly_secs {
                        actions.push(IntegrityAction::Record(ViolationRecord::new(
                            ViolationKind::TimeAnomaly,
                            format!("returned after {absence}s away from the quiz"),
                            event.at,
                        )));
                    }
                    if let Some(severe) = self.policy.severe_blur_secs {
                        if absence >= severe && !self.auto_submitted {
                            self.auto_submitted = true;
                            tracing::warn!(
                                "Sustained absence of {}s under extreme security, forcing submission",
                                absence
                            );
                            actions.push(IntegrityAction::AutoSubmit);
                        }
                    }
                }
            }

            IntegrityEventKind::CopyAttempt
            | IntegrityEventKind::PasteAttempt
            | IntegrityEventKind::ContextMenuAttempt => {
                let what = match event.kind {
                    IntegrityEventKind::CopyAttempt => "copy",
                    IntegrityEventKind::PasteAttempt => "paste",
                    _ => "context menu",
                };
                actions.push(IntegrityAction::Record(ViolationRecord::new(
                    ViolationKind::CopyDetected,
                    format!("{what} attempt blocked"),
                    event.at,
                )));
                actions.push(IntegrityAction::Suppress {
                    description: format!("{what} attempt"),
                });
            }

            IntegrityEventKind::BeforeUnload => {
                actions.push(IntegrityAction::Record(ViolationRecord::new(
                    ViolationKind::BrowserClose,
                    "page close or refresh attempted".to_string(),
                    event.at,
                )));
                actions.push(IntegrityAction::InterceptClose);
            }
        }

        actions
    }
}
