//! Meridian Session Persistence
//!
//! - The tab store is saved as one snapshot: ordered tabs plus the time the
//!   browser was last active
//! - Private tabs are restored only if that time is within the last 24h and
//!   not in the future
//! - A missing or unreadable snapshot is never fatal; the browser starts
//!   with a single home tab

mod error;
mod persistence;
mod session;

pub use error::SessionError;
pub use persistence::{ArtifactDirs, SessionPersistence};
pub use session::{SessionSnapshot, INCOGNITO_RESTORE_WINDOW_HOURS};

pub type Result<T> = std::result::Result<T, SessionError>;
