//! Single logical thread of control per session: one spawned task owns the
//! controller and select!s over host commands, the 1 Hz tick, and the
//! autosave deadline. All session mutation happens inside this task, so
//! handlers are naturally serialized. Once the session reaches a terminal
//! state the tick and autosave arms disarm and only commands are served, so
//! a late submit replays the cached outcome instead of hitting a dead
//! channel; the task exits when the handle is dropped.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::SubmitError;
use crate::models::event::SessionEvent;
use crate::models::session::{SessionOutcome, SessionStatus, SubmissionReason};
use crate::models::violation::IntegrityEvent;
use crate::models::AnswerValue;
use crate::services::lifecycle::SessionController;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const COMMAND_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
pub enum SessionCommand {
    Answer {
        question_id: String,
        value: AnswerValue,
    },
    GoTo {
        index: usize,
    },
    Integrity(IntegrityEvent),
    Submit {
        reply: oneshot::Sender<Result<SessionOutcome, SubmitError>>,
    },
    Abandon,
}

/// Command/event endpoints of a running session. Dropping the handle closes
/// the command channel; an unfinished session is then abandoned after a
/// best-effort progress flush.
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn answer(&self, question_id: impl Into<String>, value: AnswerValue) {
        let _ = self
            .commands
            .send(SessionCommand::Answer {
                question_id: question_id.into(),
                value,
            })
            .await;
    }

    pub async fn go_to(&self, index: usize) {
        let _ = self.commands.send(SessionCommand::GoTo { index }).await;
    }

    pub async fn integrity(&self, event: IntegrityEvent) {
        let _ = self.commands.send(SessionCommand::Integrity(event)).await;
    }

    /// User-initiated submission. Retry-safe: re-invoking after a store
    /// failure hands off the identical result record.
    pub async fn submit(&self) -> Result<SessionOutcome, SubmitError> {
        let (reply, response) = oneshot::channel();
        if self
            .commands
            .send(SessionCommand::Submit { reply })
            .await
            .is_err()
        {
            return Err(SubmitError::NotActive);
        }
        response.await.unwrap_or(Err(SubmitError::NotActive))
    }

    pub async fn abandon(self) {
        let _ = self.commands.send(SessionCommand::Abandon).await;
        self.join().await;
    }

    /// Closes the command channel and waits for the session task to finish.
    pub async fn join(self) {
        drop(self.commands);
        let _ = self.task.await;
    }
}

/// Channel for the host to subscribe to before the session starts emitting.
pub fn event_channel() -> broadcast::Sender<SessionEvent> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}

pub fn spawn(controller: SessionController) -> SessionHandle {
    let (commands, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let events = controller_events(&controller);
    let task = tokio::spawn(run_session(controller, rx));
    SessionHandle {
        commands,
        events,
        task,
    }
}

fn controller_events(controller: &SessionController) -> broadcast::Sender<SessionEvent> {
    controller.events_sender()
}

async fn run_session(mut controller: SessionController, mut rx: mpsc::Receiver<SessionCommand>) {
    let session_id = controller.session().session_id.clone();
    let tick_period = Duration::from_secs(1);
    let mut tick = interval_at(Instant::now() + tick_period, tick_period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::debug!("Session {} runtime loop started", session_id);

    loop {
        let autosave_at = controller.autosave_deadline();

        tokio::select! {
            command = rx.recv() => match command {
                Some(SessionCommand::Answer { question_id, value }) => {
                    controller.answer(&question_id, value);
                }
                Some(SessionCommand::GoTo { index }) => {
                    controller.go_to(index);
                }
                Some(SessionCommand::Integrity(event)) => {
                    if controller.observe_integrity(event) {
                        let _ = controller
                            .submit(SubmissionReason::IntegrityEscalation)
                            .await;
                    }
                }
                Some(SessionCommand::Submit { reply }) => {
                    let result = controller.submit(SubmissionReason::UserInitiated).await;
                    let _ = reply.send(result);
                }
                Some(SessionCommand::Abandon) => {
                    if controller.status() == SessionStatus::Active {
                        controller.flush_progress_now().await;
                        controller.abandon();
                    }
                }
                None => {
                    // Handle dropped. Settle whatever state remains and stop.
                    controller.release().await;
                    break;
                }
            },

            _ = tick.tick(), if controller.is_active() => {
                if controller.tick() {
                    let _ = controller.submit(SubmissionReason::TimeExpired).await;
                }
            },

            _ = sleep_until_opt(autosave_at), if autosave_at.is_some() => {
                controller.flush_progress_if_due().await;
            },
        }
    }

    tracing::debug!(
        "Session {} runtime loop finished with status {:?}",
        session_id,
        controller.status()
    );
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
