//! Reading timer
//!
//! Single-slot session state machine: Idle or Running, one session
//! process-wide, no queueing. The active session is persisted the moment
//! it starts so an unexpected restart can recover it; recovery either
//! settles the session with the same stats/history logic as a normal stop,
//! or discards it.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::models::{ActiveSession, SessionOutcome};
use crate::clock::Clock;
use crate::state::models::HistoryEntry;
use crate::state::StateStore;
use crate::storage::{StorageBackend, ACTIVE_SESSION_KEY};

/// Sessions shorter than this many minutes never enter history
pub const DEFAULT_MIN_SESSION_MINUTES: u32 = 1;

#[derive(Debug, Clone, Copy)]
struct RunningSession {
    start_time_ms: i64,
    book_id: Option<i64>,
}

pub struct TimerService {
    clock: Rc<dyn Clock>,
    backend: Rc<dyn StorageBackend>,
    min_session_minutes: u32,
    running: Option<RunningSession>,
}

impl TimerService {
    pub fn new(clock: Rc<dyn Clock>, backend: Rc<dyn StorageBackend>) -> Self {
        Self {
            clock,
            backend,
            min_session_minutes: DEFAULT_MIN_SESSION_MINUTES,
            running: None,
        }
    }

    pub fn with_min_session_minutes(mut self, minutes: u32) -> Self {
        self.min_session_minutes = minutes;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    // ===== Transitions =====

    /// Start a session. Returns the persisted record, or `None` if a
    /// session is already running (the start is rejected, not queued).
    pub fn start_reading(&mut self, store: &StateStore, book_id: Option<i64>) -> Option<ActiveSession> {
        if self.running.is_some() {
            return None;
        }

        if let Some(id) = book_id {
            match store.get_book(id) {
                Some(book) => debug!("reading session started for '{}'", book.title),
                None => debug!("reading session started for unknown book {}", id),
            }
        }

        let now_ms = self.clock.now_ms();
        self.running = Some(RunningSession {
            start_time_ms: now_ms,
            book_id,
        });

        let session = ActiveSession {
            start_time: now_ms,
            book_id,
            saved_at: now_ms,
        };
        self.persist_active_session(&session);
        Some(session)
    }

    /// Stop the running session and settle it into stats and history.
    /// Returns `None` if no session is running.
    pub fn stop_reading(&mut self, store: &mut StateStore) -> Option<SessionOutcome> {
        let session = self.running.take()?;
        let end = self.clock.now();
        let outcome = self.settle(store, session.start_time_ms, session.book_id, end);
        self.clear_active_session();
        Some(outcome)
    }

    /// Discard the running session: no stats, no history, timer reset.
    /// Idempotent against an already-idle timer.
    pub fn cancel_reading(&mut self) {
        self.running = None;
        self.clear_active_session();
    }

    // ===== Projections =====

    /// Elapsed whole seconds while running, else 0
    pub fn get_seconds(&self) -> u64 {
        match &self.running {
            Some(session) => {
                let elapsed_ms = (self.clock.now_ms() - session.start_time_ms).max(0);
                (elapsed_ms / 1000) as u64
            }
            None => 0,
        }
    }

    /// Elapsed time as `M:SS`, minutes unbounded
    pub fn get_formatted_time(&self) -> String {
        let seconds = self.get_seconds();
        format!("{}:{:02}", seconds / 60, seconds % 60)
    }

    // ===== Crash recovery =====

    /// The persisted session record, if one survived. Absent or unparsable
    /// records yield `None`; this never fails.
    pub fn get_active_session(&self) -> Option<ActiveSession> {
        let raw = match self.backend.get(ACTIVE_SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!("failed to read active session: {}", err);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(err) => {
                warn!("unparsable active session ignored: {}", err);
                None
            }
        }
    }

    /// Settle a session recovered after an unclean shutdown, applying the
    /// same minute and validity logic as a normal stop. Callable before
    /// any new `start_reading`.
    pub fn record_incomplete_session(
        &self,
        store: &mut StateStore,
        session: &ActiveSession,
        end_time: DateTime<Utc>,
    ) -> SessionOutcome {
        let outcome = self.settle(store, session.start_time, session.book_id, end_time);
        self.clear_active_session();
        outcome
    }

    /// Drop a recovered session without any state mutation. Idempotent.
    pub fn discard_incomplete_session(&self) {
        self.clear_active_session();
    }

    // ===== Internals =====

    /// Shared stop/recovery path: stats always update, the book accumulates
    /// time if attached, and only a valid session enters history.
    fn settle(
        &self,
        store: &mut StateStore,
        start_time_ms: i64,
        book_id: Option<i64>,
        end: DateTime<Utc>,
    ) -> SessionOutcome {
        let elapsed_ms = (end.timestamp_millis() - start_time_ms).max(0);
        let minutes = (elapsed_ms / 60_000) as u32;
        let is_valid_session = minutes >= self.min_session_minutes;

        store.set_state(|mut state| {
            state.stats.total += minutes;
            state.stats.today += minutes;
            // Counts even sub-threshold sessions; history does not
            state.stats.sessions += 1;
            if state.stats.first_session_date.is_none() {
                state.stats.first_session_date = Some(end);
            }

            if let Some(id) = book_id {
                if let Some(book) = state.books.iter_mut().find(|b| b.id == id) {
                    book.reading_time += minutes;
                }
            }

            if is_valid_session && minutes > 0 {
                state.history.push(HistoryEntry::new(end, minutes, book_id));
            }
            state
        });

        SessionOutcome {
            minutes,
            is_valid_session,
        }
    }

    fn persist_active_session(&self, session: &ActiveSession) {
        let result = serde_json::to_string(session)
            .map_err(crate::storage::StorageError::from)
            .and_then(|json| self.backend.set(ACTIVE_SESSION_KEY, &json));
        if let Err(err) = result {
            // The in-memory session still runs; only recovery is degraded
            warn!("failed to persist active session: {}", err);
        }
    }

    fn clear_active_session(&self) {
        if let Err(err) = self.backend.remove(ACTIVE_SESSION_KEY) {
            warn!("failed to clear active session: {}", err);
        }
    }
}
