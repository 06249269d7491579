//! Transient UI selection state
//!
//! Never persisted; fully reset whenever the store is re-initialized.

use super::models::BookStatus;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiState {
    /// Selection in the main list view
    pub selected_book_id: Option<i64>,
    pub editing_book_id: Option<i64>,
    pub deleting_book_id: Option<i64>,
    /// Book open in the detail view
    pub detail_book_id: Option<i64>,
    pub dropping_book_id: Option<i64>,
    /// Book a completion note is being written for
    pub note_book_id: Option<i64>,
    /// Current list filter, `None` for all statuses
    pub filter_status: Option<BookStatus>,
}
