//! Timer data models

use serde::{Deserialize, Serialize};

/// Persisted record of an in-progress reading session.
///
/// Written the moment the timer starts and removed on stop, cancel or
/// discard, so it exists exactly while a session is running and survives
/// an unclean shutdown until reconciled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    /// Session start, epoch milliseconds
    pub start_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_id: Option<i64>,
    /// When this record was written, epoch milliseconds
    pub saved_at: i64,
}

/// Result of settling a session, whether stopped normally or recovered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub minutes: u32,
    /// Whether the session met the minimum length to enter history
    pub is_valid_session: bool,
}
