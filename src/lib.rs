//! Timed assessment session engine: runs a single student's attempt at a
//! quiz from eligibility check to submission. Tracks the active question,
//! accumulates per-question and total time, autosaves partial progress,
//! enforces the time limit, classifies integrity violations under a
//! configurable security policy, and computes the final score.
//!
//! Storage, identity, and presentation live behind the trait seams in
//! [`stores`] and the event stream in [`models::event`]; the engine owns
//! only the attempt itself.

pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod services;
pub mod stores;
pub mod utils;

pub use config::EngineConfig;
pub use error::{EligibilityError, StoreError, SubmitError};
pub use services::lifecycle::SessionController;
pub use services::runtime::{event_channel, spawn, SessionHandle};
