//! Collaborator contracts consumed by the engine. Storage technology is the
//! embedder's choice; the in-memory implementations below back tests and
//! local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::session::ResultRecord;
use crate::models::{AnswerValue, Quiz};

#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn get_quiz(&self, quiz_id: &str) -> Result<Option<Quiz>, StoreError>;
}

#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn count_completed_attempts(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> Result<u32, StoreError>;

    /// Idempotent upsert keyed by session id; overlapping retries must not
    /// corrupt stored state.
    async fn save_progress(&self, snapshot: &ProgressSnapshot) -> Result<(), StoreError>;

    async fn submit_result(&self, record: &ResultRecord) -> Result<(), StoreError>;
}

/// Durable partial-progress state: the full answers map plus position, read
/// atomically from the session at send time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub session_id: String,
    pub answers: HashMap<String, AnswerValue>,
    pub current_index: usize,
    pub saved_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryQuizStore {
    quizzes: RwLock<HashMap<String, Quiz>>,
}

impl MemoryQuizStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, quiz: Quiz) {
        self.quizzes
            .write()
            .expect("quiz store lock poisoned")
            .insert(quiz.id.clone(), quiz);
    }
}

#[async_trait]
impl QuizStore for MemoryQuizStore {
    async fn get_quiz(&self, quiz_id: &str) -> Result<Option<Quiz>, StoreError> {
        Ok(self
            .quizzes
            .read()
            .expect("quiz store lock poisoned")
            .get(quiz_id)
            .cloned())
    }
}

/// In-memory attempt store with injectable failures, so retry and
/// submission-failure paths are exercisable without a real backend.
#[derive(Default)]
pub struct MemoryAttemptStore {
    completed: RwLock<HashMap<(String, String), u32>>,
    snapshots: RwLock<HashMap<String, ProgressSnapshot>>,
    results: RwLock<Vec<ResultRecord>>,
    fail_saves: AtomicU32,
    fail_submits: AtomicU32,
    save_calls: AtomicU32,
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_completed_attempts(&self, user_id: &str, quiz_id: &str, count: u32) {
        self.completed
            .write()
            .expect("attempt store lock poisoned")
            .insert((user_id.to_string(), quiz_id.to_string()), count);
    }

    /// Fail the next `n` save_progress calls with a transient error.
    pub fn fail_next_saves(&self, n: u32) {
        self.fail_saves.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` submit_result calls with a transient error.
    pub fn fail_next_submits(&self, n: u32) {
        self.fail_submits.store(n, Ordering::SeqCst);
    }

    pub fn results(&self) -> Vec<ResultRecord> {
        self.results
            .read()
            .expect("attempt store lock poisoned")
            .clone()
    }

    pub fn snapshot(&self, session_id: &str) -> Option<ProgressSnapshot> {
        self.snapshots
            .read()
            .expect("attempt store lock poisoned")
            .get(session_id)
            .cloned()
    }

    /// Number of save_progress calls that reached the store, including ones
    /// that were made to fail.
    pub fn save_calls(&self) -> u32 {
        self.save_calls.load(Ordering::SeqCst)
    }

    fn take_failure(slot: &AtomicU32) -> bool {
        slot.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn count_completed_attempts(
        &self,
        user_id: &str,
        quiz_id: &str,
    ) -> Result<u32, StoreError> {
        Ok(self
            .completed
            .read()
            .expect("attempt store lock poisoned")
            .get(&(user_id.to_string(), quiz_id.to_string()))
            .copied()
            .unwrap_or(0))
    }

    async fn save_progress(&self, snapshot: &ProgressSnapshot) -> Result<(), StoreError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.fail_saves) {
            return Err(StoreError::Unavailable("injected save failure".to_string()));
        }
        self.snapshots
            .write()
            .expect("attempt store lock poisoned")
            .insert(snapshot.session_id.clone(), snapshot.clone());
        Ok(())
    }

    async fn submit_result(&self, record: &ResultRecord) -> Result<(), StoreError> {
        if Self::take_failure(&self.fail_submits) {
            return Err(StoreError::Unavailable(
                "injected submit failure".to_string(),
            ));
        }
        self.results
            .write()
            .expect("attempt store lock poisoned")
            .push(record.clone());
        Ok(())
    }
}
