mod models;
mod service;

pub use models::{ActiveSession, SessionOutcome};
pub use service::{TimerService, DEFAULT_MIN_SESSION_MINUTES};
