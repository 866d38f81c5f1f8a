//! Session persistence
//!
//! Saves the tab store into the single session row and rebuilds it after a
//! restart. A snapshot that cannot be read is treated as absent: the
//! browser starts over with one home tab and stale on-disk artifacts are
//! purged.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use meridian_storage::Database;
use meridian_tabs::{StoreSnapshot, TabStore};

use crate::session::SessionSnapshot;
use crate::Result;

/// Directories holding per-tab files that must not outlive their tabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDirs {
    pub thumbnails: PathBuf,
    /// Private-browsing cache, cookies and databases
    pub incognito: PathBuf,
}

pub struct SessionPersistence {
    db: Database,
    dirs: ArtifactDirs,
    max_tabs: usize,
    home_url: String,
}

impl SessionPersistence {
    pub fn new(db: Database, dirs: ArtifactDirs, max_tabs: usize, home_url: String) -> Self {
        Self {
            db,
            dirs,
            max_tabs,
            home_url,
        }
    }

    pub fn dirs(&self) -> &ArtifactDirs {
        &self.dirs
    }

    /// Capture the tab sequence, stamped now, and write it.
    pub fn save(&self, store: &TabStore) -> Result<SessionSnapshot> {
        self.save_at(store, Utc::now())
    }

    pub fn save_at(&self, store: &TabStore, now: DateTime<Utc>) -> Result<SessionSnapshot> {
        let snapshot = SessionSnapshot::new(store.save_state(), now);
        let payload = serde_json::to_string(&snapshot.tabs)?;
        self.db.write_session(&payload, snapshot.saved_at)?;

        tracing::info!(tabs = snapshot.tab_count(), "Saved session");
        Ok(snapshot)
    }

    /// Read the stored snapshot. Malformed contents read as no snapshot.
    pub fn load(&self) -> Result<Option<SessionSnapshot>> {
        let Some(row) = self.db.read_session()? else {
            return Ok(None);
        };

        let saved_at = match DateTime::parse_from_rfc3339(&row.saved_at) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(e) => {
                tracing::warn!(error = %e, "Session timestamp unreadable, ignoring session");
                return Ok(None);
            }
        };

        match serde_json::from_str::<StoreSnapshot>(&row.payload) {
            Ok(tabs) => Ok(Some(SessionSnapshot::new(tabs, saved_at))),
            Err(e) => {
                tracing::warn!(error = %e, "Session payload malformed, ignoring session");
                Ok(None)
            }
        }
    }

    /// Rebuild the tab store from `snapshot` as of `now`.
    ///
    /// Private tabs are dropped, and their artifacts purged, when there is
    /// no snapshot or it is stale. The result always holds at least one
    /// tab.
    pub fn restore(&self, snapshot: Option<&SessionSnapshot>, now: DateTime<Utc>) -> TabStore {
        let drop_incognito = snapshot.map_or(true, |s| s.is_stale(now));
        let empty = StoreSnapshot::default();
        let tabs = snapshot.map_or(&empty, |s| &s.tabs);

        let mut store = TabStore::new(self.max_tabs, self.home_url.clone());
        let restored = store.restore_state(tabs, drop_incognito);

        if drop_incognito {
            if snapshot.is_some_and(|s| s.tabs.has_incognito()) {
                tracing::info!("Session too old to restore private tabs");
            }
            self.purge_incognito_artifacts();
        }
        if !restored {
            purge_dir(&self.dirs.thumbnails);
        }

        store
    }

    /// Load and restore in one step; storage failures start a fresh
    /// session.
    pub fn restore_latest(&self, now: DateTime<Utc>) -> TabStore {
        let snapshot = self.load().unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to read session");
            None
        });
        self.restore(snapshot.as_ref(), now)
    }

    /// Remove everything private browsing left on disk.
    pub fn purge_incognito_artifacts(&self) {
        purge_dir(&self.dirs.incognito);
    }
}

/// Empty `dir` without removing it. Missing directories are fine.
fn purge_dir(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };

        match result {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(error = %e, path = %path.display(), "Failed to purge"),
        }
    }

    tracing::debug!(dir = %dir.display(), removed, "Purged artifacts");
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use meridian_tabs::DEFAULT_MAX_TABS;

    const HOME: &str = "http://home.example/";

    struct Fixture {
        root: PathBuf,
        persistence: SessionPersistence,
    }

    impl Fixture {
        fn new() -> Self {
            let root = std::env::temp_dir().join(format!("meridian-session-{}", uuid::Uuid::new_v4()));
            let dirs = ArtifactDirs {
                thumbnails: root.join("thumbnails"),
                incognito: root.join("incognito"),
            };
            std::fs::create_dir_all(&dirs.thumbnails).unwrap();
            std::fs::create_dir_all(&dirs.incognito).unwrap();
            std::fs::write(dirs.thumbnails.join("a.png"), b"png").unwrap();
            std::fs::write(dirs.incognito.join("cookies"), b"c").unwrap();

            let persistence = SessionPersistence::new(
                Database::open_in_memory().unwrap(),
                dirs,
                DEFAULT_MAX_TABS,
                HOME.to_string(),
            );
            Self { root, persistence }
        }

        fn count(&self, dir: &Path) -> usize {
            std::fs::read_dir(dir).unwrap().count()
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.root);
        }
    }

    fn store_with_private_tab() -> TabStore {
        let mut store = TabStore::new(DEFAULT_MAX_TABS, HOME);
        let id = store
            .create_new_tab(false, None, Some("http://secret.example/".into()), true)
            .unwrap();
        store.set_current_tab(&id);
        store
    }

    #[test]
    fn test_old_private_session_yields_one_fresh_tab() {
        let fx = Fixture::new();
        let now = Utc::now();
        let snapshot = SessionSnapshot::new(store_with_private_tab().save_state(), now - Duration::hours(48));

        let store = fx.persistence.restore(Some(&snapshot), now);

        assert_eq!(store.len(), 1);
        let tab = store.current_tab().unwrap();
        assert_eq!(tab.url, HOME);
        assert!(!tab.incognito);
        assert_eq!(fx.count(&fx.persistence.dirs().incognito), 0);
        assert_eq!(fx.count(&fx.persistence.dirs().thumbnails), 0);
    }

    #[test]
    fn test_recent_session_restored_verbatim() {
        let fx = Fixture::new();
        let now = Utc::now();
        let snapshot = SessionSnapshot::new(store_with_private_tab().save_state(), now - Duration::hours(1));

        let store = fx.persistence.restore(Some(&snapshot), now);

        assert_eq!(store.len(), 1);
        assert!(store.current_tab().unwrap().incognito);
        assert_eq!(fx.count(&fx.persistence.dirs().incognito), 1);
        assert_eq!(fx.count(&fx.persistence.dirs().thumbnails), 1);
    }

    #[test]
    fn test_future_timestamp_drops_private_tabs() {
        let fx = Fixture::new();
        let now = Utc::now();
        let mut store = store_with_private_tab();
        store
            .create_new_tab(false, None, Some("http://public.example/".into()), false)
            .unwrap();
        let snapshot = SessionSnapshot::new(store.save_state(), now + Duration::hours(2));

        let restored = fx.persistence.restore(Some(&snapshot), now);

        assert_eq!(restored.len(), 1);
        assert_eq!(restored.current_tab().unwrap().url, "http://public.example/");
        assert_eq!(fx.count(&fx.persistence.dirs().incognito), 0);
        // Something was restored: thumbnails stay
        assert_eq!(fx.count(&fx.persistence.dirs().thumbnails), 1);
    }

    #[test]
    fn test_save_then_restore_latest() {
        let fx = Fixture::new();
        let mut store = TabStore::new(DEFAULT_MAX_TABS, HOME);
        let a = store
            .create_new_tab(false, None, Some("http://a.example/".into()), false)
            .unwrap();
        let b = store
            .create_new_tab(true, Some("com.example.mail".into()), Some("http://b.example/".into()), false)
            .unwrap();
        store.set_parent(&b, &a).unwrap();
        store.set_current_tab(&b);

        let saved = fx.persistence.save(&store).unwrap();
        assert_eq!(fx.persistence.load().unwrap(), Some(saved));

        let restored = fx.persistence.restore_latest(Utc::now());
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.current_id(), Some(&b));
        assert_eq!(restored.parent_of(&b).map(|t| &t.id), Some(&a));
        assert_eq!(
            restored.tab(&b).unwrap().app_id.as_deref(),
            Some("com.example.mail")
        );
    }

    #[test]
    fn test_malformed_session_resets() {
        let fx = Fixture::new();
        fx.persistence
            .db
            .write_session("{not json", Utc::now())
            .unwrap();

        assert_eq!(fx.persistence.load().unwrap(), None);

        let store = fx.persistence.restore_latest(Utc::now());
        assert_eq!(store.len(), 1);
        assert_eq!(store.current_tab().unwrap().url, HOME);
        assert_eq!(fx.count(&fx.persistence.dirs().thumbnails), 0);
        assert_eq!(fx.count(&fx.persistence.dirs().incognito), 0);
    }

    #[test]
    fn test_purge_missing_dir_is_harmless() {
        assert_eq!(purge_dir(Path::new("/nonexistent/meridian/dir")), 0);
    }
}
