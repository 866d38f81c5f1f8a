//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] meridian_storage::StorageError),

    #[error("Tab error: {0}")]
    Tab(#[from] meridian_tabs::TabError),

    #[error("Session error: {0}")]
    Session(#[from] meridian_session::SessionError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] meridian_navigation::NavigationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Browser runtime has shut down")]
    RuntimeClosed,
}
