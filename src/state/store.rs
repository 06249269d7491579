//! In-memory state store
//!
//! Single owner of the root [`State`] document and the transient UI
//! sub-state. Every durable-slice mutator notifies subscribers after it
//! runs, including no-ops, so views can never go stale; UI setters are
//! silent. Operations referencing a missing id are non-erroring no-ops.

use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use log::warn;

use super::models::{
    ArchiveBucket, Book, BookPatch, BookStatus, HistoryEntry, Label, MetaPatch, Reflection, State,
    StatsPatch, MAX_LABEL_NAME_LEN,
};
use super::ui::UiState;

/// Handle returned by [`StateStore::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&State)>;

pub struct StateStore {
    state: State,
    ui: UiState,
    subscribers: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl StateStore {
    pub fn new(state: State) -> Self {
        Self {
            state,
            ui: UiState::default(),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Replace the durable document and reset UI state to defaults
    pub fn initialize(&mut self, document: State) {
        self.state = document;
        self.ui = UiState::default();
        self.notify();
    }

    pub fn get_state(&self) -> &State {
        &self.state
    }

    /// Reducer-style update: the function receives the previous state and
    /// returns the next one. Notifies after the replacement.
    pub fn set_state(&mut self, update: impl FnOnce(State) -> State) {
        let prev = std::mem::take(&mut self.state);
        self.state = update(prev);
        self.notify();
    }

    // ===== Subscriptions =====

    /// Register a listener invoked after every durable mutation, in
    /// registration order.
    pub fn subscribe(&mut self, listener: impl FnMut(&State) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sid, _)| *sid != id);
    }

    fn notify(&mut self) {
        let state = &self.state;
        for (id, listener) in self.subscribers.iter_mut() {
            // A panicking listener must not stop the rest from running
            if catch_unwind(AssertUnwindSafe(|| listener(state))).is_err() {
                warn!("subscriber {:?} panicked during notification", id);
            }
        }
    }

    // ===== Books =====

    pub fn add_book(&mut self, book: Book) {
        self.state.books.push(book);
        self.notify();
    }

    /// Merge non-`None` patch fields into the book. No-op if the id is
    /// absent; notifies either way.
    pub fn update_book(&mut self, id: i64, patch: BookPatch) {
        if let Some(book) = self.state.books.iter_mut().find(|b| b.id == id) {
            if let Some(title) = patch.title {
                book.title = title;
            }
            if let Some(status) = patch.status {
                book.status = status;
            }
            if patch.link.is_some() {
                book.link = patch.link;
            }
            if patch.cover_url.is_some() {
                book.cover_url = patch.cover_url;
            }
            if patch.started_at.is_some() {
                book.started_at = patch.started_at;
            }
            if patch.completed_at.is_some() {
                book.completed_at = patch.completed_at;
            }
            if let Some(reading_time) = patch.reading_time {
                book.reading_time = reading_time;
            }
            if patch.bookmark.is_some() {
                book.bookmark = patch.bookmark;
            }
            if patch.completion_note.is_some() {
                book.completion_note = patch.completion_note;
            }
            if let Some(label_ids) = patch.label_ids {
                book.label_ids = label_ids;
            }
        }
        self.notify();
    }

    pub fn remove_book(&mut self, id: i64) {
        self.state.books.retain(|b| b.id != id);
        self.notify();
    }

    pub fn get_book(&self, id: i64) -> Option<&Book> {
        self.state.books.iter().find(|b| b.id == id)
    }

    /// Append a dated reflection to a book. No-op if the id is absent.
    pub fn add_reflection(&mut self, book_id: i64, note: impl Into<String>, now: DateTime<Utc>) {
        if let Some(book) = self.state.books.iter_mut().find(|b| b.id == book_id) {
            book.reflections.push(Reflection {
                date: now,
                note: note.into(),
            });
        }
        self.notify();
    }

    // ===== History =====

    pub fn add_history(&mut self, entry: HistoryEntry) {
        self.state.history.push(entry);
        self.notify();
    }

    /// Bulk replace, used by the archival path
    pub fn set_history(&mut self, entries: Vec<HistoryEntry>) {
        self.state.history = entries;
        self.notify();
    }

    // ===== Archive =====

    /// Additive merge into a monthly bucket; creates the bucket if absent
    pub fn update_archived(&mut self, month_key: &str, sessions: u32, total_minutes: u32) {
        let bucket = self
            .state
            .archived
            .entry(month_key.to_string())
            .or_default();
        bucket.sessions += sessions;
        bucket.total_minutes += total_minutes;
        self.notify();
    }

    pub fn remove_archived(&mut self, month_key: &str) {
        self.state.archived.remove(month_key);
        self.notify();
    }

    pub fn get_archived(&self, month_key: &str) -> Option<&ArchiveBucket> {
        self.state.archived.get(month_key)
    }

    // ===== Stats and meta =====

    pub fn update_stats(&mut self, patch: StatsPatch) {
        let stats = &mut self.state.stats;
        if let Some(total) = patch.total {
            stats.total = total;
        }
        if let Some(today) = patch.today {
            stats.today = today;
        }
        if let Some(date) = patch.date {
            stats.date = date;
        }
        if let Some(sessions) = patch.sessions {
            stats.sessions = sessions;
        }
        // Set exactly once, on the first recorded session
        if stats.first_session_date.is_none() {
            if let Some(first) = patch.first_session_date {
                stats.first_session_date = Some(first);
            }
        }
        self.notify();
    }

    pub fn update_meta(&mut self, patch: MetaPatch) {
        let meta = &mut self.state.meta;
        if let Some(version) = patch.schema_version {
            // The schema version never decreases
            if version >= meta.schema_version {
                meta.schema_version = version;
            }
        }
        if patch.imported_at.is_some() {
            meta.imported_at = patch.imported_at;
        }
        self.notify();
    }

    // ===== Labels =====

    /// Add a label after trimming and structural validation. Returns the
    /// stored label, or `None` if the name is empty or too long after
    /// trimming (nothing is mutated and no notification fires).
    pub fn add_label(&mut self, id: i64, name: &str) -> Option<Label> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_LABEL_NAME_LEN {
            return None;
        }
        let label = Label {
            id,
            name: name.to_string(),
        };
        self.state.labels.push(label.clone());
        self.notify();
        Some(label)
    }

    /// Rename a label; same structural rules as [`Self::add_label`].
    /// Returns false on validation failure or a missing id.
    pub fn update_label(&mut self, id: i64, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_LABEL_NAME_LEN {
            return false;
        }
        let renamed = match self.state.labels.iter_mut().find(|l| l.id == id) {
            Some(label) => {
                label.name = name.to_string();
                true
            }
            None => false,
        };
        self.notify();
        renamed
    }

    /// Remove a label and detach it from every book
    pub fn remove_label(&mut self, id: i64) {
        self.state.labels.retain(|l| l.id != id);
        for book in self.state.books.iter_mut() {
            book.label_ids.retain(|lid| *lid != id);
        }
        self.notify();
    }

    pub fn get_label(&self, id: i64) -> Option<&Label> {
        self.state.labels.iter().find(|l| l.id == id)
    }

    // ===== UI sub-state =====

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    /// Generic UI mutation; immediately observable, never notifies
    pub fn update_ui(&mut self, update: impl FnOnce(&mut UiState)) {
        update(&mut self.ui);
    }

    pub fn set_selected_book(&mut self, id: Option<i64>) {
        self.ui.selected_book_id = id;
    }

    pub fn set_editing_book(&mut self, id: Option<i64>) {
        self.ui.editing_book_id = id;
    }

    pub fn set_deleting_book(&mut self, id: Option<i64>) {
        self.ui.deleting_book_id = id;
    }

    pub fn set_detail_book(&mut self, id: Option<i64>) {
        self.ui.detail_book_id = id;
    }

    pub fn set_dropping_book(&mut self, id: Option<i64>) {
        self.ui.dropping_book_id = id;
    }

    pub fn set_note_book(&mut self, id: Option<i64>) {
        self.ui.note_book_id = id;
    }

    pub fn set_filter_status(&mut self, status: Option<BookStatus>) {
        self.ui.filter_status = status;
    }
}
