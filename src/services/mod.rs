pub mod autosave;
pub mod integrity;
pub mod lifecycle;
pub mod runtime;
pub mod scoring;
pub mod timer;

pub use lifecycle::SessionController;
pub use runtime::{SessionCommand, SessionHandle};
