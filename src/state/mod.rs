pub mod models;
mod store;
mod ui;

pub use models::*;
pub use store::{StateStore, SubscriptionId};
pub use ui::UiState;
