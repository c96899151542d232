use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classified integrity violation, appended to the session's violation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub kind: ViolationKind,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl ViolationRecord {
    pub fn new(kind: ViolationKind, description: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            description: description.into(),
            timestamp: at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    TabSwitch,
    WindowBlur,
    CopyDetected,
    BrowserClose,
    TimeAnomaly,
    MultipleDevices,
    QuizAbandoned,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::TabSwitch => "tab_switch",
            ViolationKind::WindowBlur => "window_blur",
            ViolationKind::CopyDetected => "copy_detected",
            ViolationKind::BrowserClose => "browser_close",
            ViolationKind::TimeAnomaly => "time_anomaly",
            ViolationKind::MultipleDevices => "multiple_devices",
            ViolationKind::QuizAbandoned => "quiz_abandoned",
        }
    }
}

/// Raw device/browser signal delivered by the external event source. The
/// engine only consumes and classifies; it does not own capture mechanics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityEvent {
    pub kind: IntegrityEventKind,
    pub at: DateTime<Utc>,
}

impl IntegrityEvent {
    pub fn new(kind: IntegrityEventKind, at: DateTime<Utc>) -> Self {
        Self { kind, at }
    }

    pub fn now(kind: IntegrityEventKind) -> Self {
        Self::new(kind, Utc::now())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityEventKind {
    VisibilityHidden,
    WindowBlur,
    WindowFocus,
    CopyAttempt,
    PasteAttempt,
    ContextMenuAttempt,
    BeforeUnload,
}
