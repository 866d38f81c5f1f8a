//! Session snapshot data structure

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use meridian_tabs::StoreSnapshot;

/// Private tabs survive a restart only if the session was saved this
/// recently.
pub const INCOGNITO_RESTORE_WINDOW_HOURS: i64 = 24;

/// What survives a restart: the ordered tabs and when the browser was last
/// active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub saved_at: DateTime<Utc>,
    pub tabs: StoreSnapshot,
}

impl SessionSnapshot {
    pub fn new(tabs: StoreSnapshot, saved_at: DateTime<Utc>) -> Self {
        Self { saved_at, tabs }
    }

    /// Whether private tabs must be dropped when restoring at `now`: the
    /// snapshot is older than the restore window, or stamped in the future.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.saved_at > now
            || now - self.saved_at > Duration::hours(INCOGNITO_RESTORE_WINDOW_HOURS)
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.tabs.len()
    }
}
