//! Meridian Storage Layer
//!
//! SQLite-backed persistence for browsing history, search history,
//! bookmarks and the best-effort session snapshot.

mod bookmarks;
mod database;
mod error;
mod migrations;

pub use bookmarks::Bookmark;
pub use database::{Database, SessionRow};
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
