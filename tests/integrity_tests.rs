use std::time::Duration;

use chrono::Utc;

use assessment_engine::models::event::SessionEvent;
use assessment_engine::models::session::{SessionStatus, SubmissionReason};
use assessment_engine::models::violation::{IntegrityEvent, IntegrityEventKind, ViolationKind};
use assessment_engine::models::SecurityLevel;

mod common;

fn hidden() -> IntegrityEvent {
    IntegrityEvent::now(IntegrityEventKind::VisibilityHidden)
}

#[tokio::test]
async fn low_security_ignores_device_events() {
    let env = common::env_with(common::secured_quiz(SecurityLevel::Low));
    let mut controller = common::start_session(&env).await;

    for _ in 0..10 {
        assert!(!controller.observe_integrity(hidden()));
    }
    assert!(controller.session().violations.is_empty());
    assert_eq!(controller.session().warning_count, 0);
}

#[tokio::test]
async fn medium_security_warns_without_escalating() {
    let env = common::env_with(common::secured_quiz(SecurityLevel::Medium));
    let mut events = env.events.subscribe();
    let mut controller = common::start_session(&env).await;

    for _ in 0..6 {
        assert!(!controller.observe_integrity(hidden()));
    }

    assert_eq!(controller.session().warning_count, 6);
    assert_eq!(controller.session().violations.len(), 6);
    assert_eq!(controller.status(), SessionStatus::Active);

    let mut warning_events = 0;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::IntegrityWarning(w) = event {
            warning_events += 1;
            assert_eq!(w.kind, ViolationKind::TabSwitch);
        }
    }
    assert_eq!(warning_events, 6);
}

#[tokio::test]
async fn high_security_forces_submission_on_the_fourth_tab_switch() {
    let env = common::env_with(common::secured_quiz(SecurityLevel::High));
    let mut controller = common::start_session(&env).await;

    for n in 1..=3 {
        assert!(
            !controller.observe_integrity(hidden()),
            "escalated early at tab switch {n}"
        );
    }
    assert!(controller.observe_integrity(hidden()));

    controller
        .submit(SubmissionReason::IntegrityEscalation)
        .await
        .expect("forced submit");

    let results = env.attempt_store.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].reason, SubmissionReason::IntegrityEscalation);
    assert_eq!(results[0].violation_count, 4);
    assert!(results[0]
        .violations
        .iter()
        .all(|v| v.kind == ViolationKind::TabSwitch));
    assert_eq!(results[0].warning_count, 4);
}

#[tokio::test]
async fn extreme_security_classifies_as_cheating_and_escalates_at_three() {
    let env = common::env_with(common::secured_quiz(SecurityLevel::Extreme));
    let mut controller = common::start_session(&env).await;

    assert!(!controller.observe_integrity(hidden()));
    assert!(!controller.observe_integrity(hidden()));
    assert!(controller.observe_integrity(hidden()));

    // No warning dialogs at this level; events go straight to the log.
    assert_eq!(controller.session().warning_count, 0);
    assert!(controller
        .session()
        .violations
        .iter()
        .all(|v| v.description.contains("cheating")));
}

#[tokio::test]
async fn extended_absence_is_recorded_as_a_time_anomaly() {
    let env = common::env_with(common::secured_quiz(SecurityLevel::High));
    let mut controller = common::start_session(&env).await;
    let lost = Utc::now();

    controller.observe_integrity(IntegrityEvent::new(IntegrityEventKind::WindowBlur, lost));
    let escalate = controller.observe_integrity(IntegrityEvent::new(
        IntegrityEventKind::WindowFocus,
        lost + chrono::Duration::seconds(20),
    ));
    assert!(!escalate);

    assert!(controller
        .session()
        .violations
        .iter()
        .any(|v| v.kind == ViolationKind::TimeAnomaly));
}

#[tokio::test]
async fn sustained_absence_under_extreme_forces_submission() {
    let env = common::env_with(common::secured_quiz(SecurityLevel::Extreme));
    let mut controller = common::start_session(&env).await;
    let lost = Utc::now();

    controller.observe_integrity(IntegrityEvent::new(IntegrityEventKind::WindowBlur, lost));
    let escalate = controller.observe_integrity(IntegrityEvent::new(
        IntegrityEventKind::WindowFocus,
        lost + chrono::Duration::seconds(45),
    ));
    assert!(escalate);

    controller
        .submit(SubmissionReason::IntegrityEscalation)
        .await
        .expect("forced submit");
    assert_eq!(
        env.attempt_store.results()[0].reason,
        SubmissionReason::IntegrityEscalation
    );
}

#[tokio::test]
async fn clipboard_use_is_suppressed_and_logged() {
    let env = common::env_with(common::secured_quiz(SecurityLevel::Medium));
    let mut events = env.events.subscribe();
    let mut controller = common::start_session(&env).await;

    assert!(!controller.observe_integrity(IntegrityEvent::now(IntegrityEventKind::CopyAttempt)));
    assert!(!controller.observe_integrity(IntegrityEvent::now(IntegrityEventKind::PasteAttempt)));

    let copy_violations = controller
        .session()
        .violations
        .iter()
        .filter(|v| v.kind == ViolationKind::CopyDetected)
        .count();
    assert_eq!(copy_violations, 2);
    // Suppression is not a warning.
    assert_eq!(controller.session().warning_count, 0);

    let mut suppressed = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SessionEvent::ActionSuppressed(_)) {
            suppressed += 1;
        }
    }
    assert_eq!(suppressed, 2);
}

#[tokio::test]
async fn page_close_is_intercepted_but_not_terminal() {
    let env = common::env_with(common::secured_quiz(SecurityLevel::High));
    let mut events = env.events.subscribe();
    let mut controller = common::start_session(&env).await;

    assert!(!controller.observe_integrity(IntegrityEvent::now(IntegrityEventKind::BeforeUnload)));

    assert_eq!(controller.status(), SessionStatus::Active);
    assert!(controller
        .session()
        .violations
        .iter()
        .any(|v| v.kind == ViolationKind::BrowserClose));

    let mut intercepted = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SessionEvent::CloseIntercepted(_)) {
            intercepted = true;
        }
    }
    assert!(intercepted);
}

#[tokio::test]
async fn events_after_submission_are_ignored() {
    let env = common::env_with(common::secured_quiz(SecurityLevel::High));
    let mut controller = common::start_session(&env).await;

    controller
        .submit(SubmissionReason::UserInitiated)
        .await
        .expect("submit");

    assert!(!controller.observe_integrity(hidden()));
    assert!(controller.session().violations.is_empty());
}

#[tokio::test(start_paused = true)]
async fn runtime_escalation_submits_with_the_integrity_reason() {
    let env = common::env_with(common::secured_quiz(SecurityLevel::High));
    let controller = common::start_session(&env).await;
    let handle = assessment_engine::spawn(controller);

    for _ in 0..4 {
        handle.integrity(hidden()).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let results = env.attempt_store.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].reason, SubmissionReason::IntegrityEscalation);
    assert_eq!(results[0].violation_count, 4);
}
