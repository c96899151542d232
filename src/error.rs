use thiserror::Error;

/// Failure reported by an external store collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store rejected request: {0}")]
    Rejected(String),
}

/// Surfaced before any session is created. Non-recoverable for that call;
/// the caller may redirect away.
#[derive(Debug, Error)]
pub enum EligibilityError {
    #[error("quiz {0} not found")]
    QuizNotFound(String),
    #[error("no attempts remaining ({used} of {max} used)")]
    NoAttemptsRemaining { used: u32, max: u32 },
    #[error("quiz is not available at the current time")]
    OutsideAvailabilityWindow,
    #[error("invalid quiz definition: {0}")]
    InvalidQuiz(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Final-submission failure. The session stays in `Submitting` and the
/// caller may re-invoke submit; recomputation is deterministic.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("session is not in a submittable state")]
    NotActive,
    #[error("failed to persist result: {0}")]
    Store(#[from] StoreError),
}
