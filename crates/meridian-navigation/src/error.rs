//! Navigation error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Bad intent URI {0}")]
    BadIntentUri(String),

    #[error("Storage error: {0}")]
    Storage(#[from] meridian_storage::StorageError),
}
