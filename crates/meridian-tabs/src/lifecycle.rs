//! Per-tab load lifecycle
//!
//! ```text
//! Idle
//!   ↓ page started
//! ProvisionalLoad
//!   ↓ progress beyond the initial report
//! Loading
//!   ↓ page finished / stop
//! Finished ──(next page started)──▶ ProvisionalLoad
//! ```
//!
//! `in_load` is tracked separately from the main-frame state: the engine keeps
//! reporting progress for subframes after the main frame finishes, and only
//! the 100% edge ends a load. Repeated 100% reports are ignored until the next
//! page start.

use serde::{Deserialize, Serialize};

use crate::lock::LockIcon;

/// Progress shown as soon as a page starts, so the user sees the load begin.
pub const INITIAL_PROGRESS: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    Idle,
    ProvisionalLoad,
    Loading,
    Finished,
}

impl LoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::Idle => "idle",
            LoadState::ProvisionalLoad => "provisional_load",
            LoadState::Loading => "loading",
            LoadState::Finished => "finished",
        }
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadProgressSnapshot {
    pub percent: u8,
    pub in_load: bool,
}

/// Edge of the `in_load` flag produced by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadEdge {
    Began,
    Completed,
}

#[derive(Debug, Clone, Default)]
pub struct LoadLifecycle {
    state: LoadState,
    progress: u8,
    in_load: bool,
    /// Latched by the first 100% report of a load
    completed: bool,
    /// What the lock icon currently shows
    lock_icon: LockIcon,
    /// Classification of the load in flight, shown once it finishes
    security: LockIcon,
    /// Classification before the current load, restored on stop
    previous_security: LockIcon,
    stopped_by_user: bool,
}

impl LoadLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn in_load(&self) -> bool {
        self.in_load
    }

    pub fn snapshot(&self) -> LoadProgressSnapshot {
        LoadProgressSnapshot {
            percent: self.progress,
            in_load: self.in_load,
        }
    }

    pub fn lock_icon(&self) -> LockIcon {
        self.lock_icon
    }

    pub fn security(&self) -> LockIcon {
        self.security
    }

    pub fn stopped_by_user(&self) -> bool {
        self.stopped_by_user
    }

    /// A new main-frame navigation began.
    ///
    /// The lock icon drops to unsecure until the page finishes; the previous
    /// classification is kept so a stop can restore it.
    pub fn page_started(&mut self, url: &str) -> Option<LoadEdge> {
        self.previous_security = self.security;
        self.security = LockIcon::for_url(url);
        self.lock_icon = LockIcon::Unsecure;
        self.state = LoadState::ProvisionalLoad;
        self.completed = false;
        self.stopped_by_user = false;
        self.progress_changed(INITIAL_PROGRESS)
    }

    pub fn progress_changed(&mut self, percent: u8) -> Option<LoadEdge> {
        let percent = percent.min(100);
        self.progress = percent;

        if percent == 100 {
            self.completed = true;
            if self.in_load {
                self.in_load = false;
                return Some(LoadEdge::Completed);
            }
            return None;
        }

        match self.state {
            LoadState::ProvisionalLoad if percent > INITIAL_PROGRESS => {
                self.state = LoadState::Loading;
            }
            LoadState::Idle if percent > 0 => self.state = LoadState::Loading,
            _ => {}
        }

        if percent > 0 && !self.in_load && !self.completed {
            self.in_load = true;
            return Some(LoadEdge::Began);
        }

        None
    }

    /// The main frame finished; the lock icon now shows this load's
    /// classification.
    pub fn page_finished(&mut self) {
        self.lock_icon = self.security;
        self.state = LoadState::Finished;
    }

    /// Insecure content was loaded into a secure page.
    pub fn mark_mixed_content(&mut self) {
        if self.security == LockIcon::Secure {
            self.security = LockIcon::Mixed;
        }
    }

    /// The user stopped the load: revert the lock icon and end the load now.
    pub fn stop(&mut self) -> Option<LoadEdge> {
        self.stopped_by_user = true;
        self.security = self.previous_security;
        self.lock_icon = self.security;
        self.state = LoadState::Finished;
        self.completed = true;

        if self.in_load {
            self.in_load = false;
            Some(LoadEdge::Completed)
        } else {
            None
        }
    }

    /// Force `in_load` off without touching the rest of the state, used when
    /// the tab is about to be torn down.
    pub fn clear_in_load(&mut self) {
        self.in_load = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_completed_edge_for_repeated_full_progress() {
        let mut load = LoadLifecycle::new();
        let mut edges = Vec::new();

        edges.extend(load.page_started("http://example.com/"));
        edges.extend(load.progress_changed(10));
        edges.extend(load.progress_changed(90));
        edges.extend(load.progress_changed(100));
        edges.extend(load.progress_changed(100));

        assert_eq!(edges, vec![LoadEdge::Began, LoadEdge::Completed]);
        assert!(!load.in_load());
    }

    #[test]
    fn test_progress_after_completion_is_latched_until_next_start() {
        let mut load = LoadLifecycle::new();
        load.page_started("http://example.com/");
        load.progress_changed(100);

        assert_eq!(load.progress_changed(40), None);
        assert!(!load.in_load());
        assert_eq!(load.progress(), 40);

        assert_eq!(
            load.page_started("http://example.com/next"),
            Some(LoadEdge::Began)
        );
        assert!(load.in_load());
    }

    #[test]
    fn test_state_transitions() {
        let mut load = LoadLifecycle::new();
        assert_eq!(load.state(), LoadState::Idle);

        load.page_started("https://example.com/");
        assert_eq!(load.state(), LoadState::ProvisionalLoad);
        assert_eq!(load.progress(), INITIAL_PROGRESS);

        load.progress_changed(30);
        assert_eq!(load.state(), LoadState::Loading);

        load.page_finished();
        assert_eq!(load.state(), LoadState::Finished);

        load.page_started("https://example.com/again");
        assert_eq!(load.state(), LoadState::ProvisionalLoad);
    }

    #[test]
    fn test_subframe_progress_after_main_frame_finished() {
        let mut load = LoadLifecycle::new();
        load.page_started("http://example.com/");
        load.page_finished();

        // Still loading subframes: no new edge, load continues
        assert_eq!(load.progress_changed(70), None);
        assert!(load.in_load());
        assert_eq!(load.progress_changed(100), Some(LoadEdge::Completed));
    }

    #[test]
    fn test_lock_icon_follows_load() {
        let mut load = LoadLifecycle::new();

        load.page_started("https://bank.example/");
        assert_eq!(load.lock_icon(), LockIcon::Unsecure);
        load.mark_mixed_content();
        load.page_finished();
        assert_eq!(load.lock_icon(), LockIcon::Mixed);

        load.page_started("https://bank.example/clean");
        load.page_finished();
        assert_eq!(load.lock_icon(), LockIcon::Secure);
    }

    #[test]
    fn test_stop_reverts_lock_icon() {
        let mut load = LoadLifecycle::new();
        load.page_started("https://bank.example/");
        load.page_finished();
        load.progress_changed(100);

        load.page_started("http://plain.example/");
        assert_eq!(load.lock_icon(), LockIcon::Unsecure);

        assert_eq!(load.stop(), Some(LoadEdge::Completed));
        assert_eq!(load.lock_icon(), LockIcon::Secure);
        assert_eq!(load.state(), LoadState::Finished);
        assert!(load.stopped_by_user());

        // Engine echoes 100% after the stop
        assert_eq!(load.progress_changed(100), None);
    }
}
