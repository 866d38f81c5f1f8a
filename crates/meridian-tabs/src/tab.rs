//! Tab data structure
//!
//! A tab is one browsing context. Its title, favicon and lock icon are
//! written by the load lifecycle; its URL and app binding by navigation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lifecycle::{LoadEdge, LoadLifecycle};
use crate::lock::LockIcon;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TabId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TabId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The last page that finished loading in a tab.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommittedPage {
    pub url: String,
    pub title: String,
    pub favicon_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Tab {
    pub id: TabId,
    /// URL being shown or loaded
    pub url: String,
    pub title: String,
    pub favicon_url: Option<String>,
    /// Lookup-only; may dangle once the parent is closed
    pub parent: Option<TabId>,
    pub children: Vec<TabId>,
    /// Created to service an external request; torn down when backed out of
    pub close_on_exit: bool,
    /// External application this tab is bound to
    pub app_id: Option<String>,
    pub incognito: bool,
    pub voice_search_mode: bool,
    pub voice_title: Option<String>,
    pub load: LoadLifecycle,
    /// Reverted to when a load is stopped
    pub committed: Option<CommittedPage>,
    /// Distinct pages committed in this tab, mirrors the engine's history size
    pub visits: usize,
    pub touch_icon: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

impl Tab {
    pub fn new(
        close_on_exit: bool,
        app_id: Option<String>,
        url: Option<String>,
        incognito: bool,
    ) -> Self {
        Self {
            id: TabId::new(),
            url: url.unwrap_or_default(),
            title: String::new(),
            favicon_url: None,
            parent: None,
            children: Vec::new(),
            close_on_exit,
            app_id,
            incognito,
            voice_search_mode: false,
            voice_title: None,
            load: LoadLifecycle::new(),
            committed: None,
            visits: 0,
            touch_icon: None,
            created_at: Utc::now(),
        }
    }

    pub fn in_load(&self) -> bool {
        self.load.in_load()
    }

    pub fn lock_icon(&self) -> LockIcon {
        self.load.lock_icon()
    }

    pub fn page_started(&mut self, url: &str, favicon_url: Option<String>) -> Option<LoadEdge> {
        tracing::debug!(tab_id = %self.id, url = %url, "Page started");

        self.url = url.to_string();
        self.title = String::new();
        self.favicon_url = favicon_url;
        self.touch_icon = None;
        // A new navigation leaves voice-search mode
        self.voice_search_mode = false;
        self.voice_title = None;
        self.load.page_started(url)
    }

    pub fn progress_changed(&mut self, percent: u8) -> Option<LoadEdge> {
        let edge = self.load.progress_changed(percent);
        if let Some(edge) = edge {
            tracing::trace!(tab_id = %self.id, ?edge, percent, "Load edge");
        }
        edge
    }

    pub fn page_finished(&mut self, url: &str) {
        tracing::debug!(tab_id = %self.id, url = %url, "Page finished");

        self.load.page_finished();
        self.url = url.to_string();

        let is_new_page = self.committed.as_ref().map(|c| c.url.as_str()) != Some(url);
        if is_new_page {
            self.visits += 1;
        }

        self.committed = Some(CommittedPage {
            url: url.to_string(),
            title: self.title.clone(),
            favicon_url: self.favicon_url.clone(),
        });
    }

    pub fn set_title(&mut self, title: String) {
        if let Some(committed) = self.committed.as_mut() {
            if committed.url == self.url {
                committed.title = title.clone();
            }
        }
        self.title = title;
    }

    pub fn set_favicon(&mut self, favicon_url: Option<String>) {
        self.favicon_url = favicon_url;
    }

    /// Stop the load and show the last committed page again.
    pub fn stop_loading(&mut self) -> Option<LoadEdge> {
        let edge = self.load.stop();
        match self.committed.clone() {
            Some(page) => {
                self.url = page.url;
                self.title = page.title;
                self.favicon_url = page.favicon_url;
            }
            None => {
                self.title = String::new();
                self.favicon_url = None;
            }
        }
        edge
    }

    pub fn activate_voice_search(&mut self, title: String) {
        self.voice_search_mode = true;
        self.voice_title = Some(title);
    }

    pub fn add_child(&mut self, child: TabId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub fn remove_child(&mut self, child: &TabId) {
        self.children.retain(|c| c != child);
    }

    /// Whether this tab shows `url` and has not navigated anywhere else.
    pub fn is_unused_with_url(&self, url: &str) -> bool {
        if self.app_id.is_some() || self.visits > 1 {
            return false;
        }
        self.url == url
            || self
                .committed
                .as_ref()
                .is_some_and(|page| page.url == url)
    }

    /// Get display title (with fallback to URL)
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tab() {
        let tab = Tab::new(true, Some("com.example.mail".into()), None, false);
        assert!(tab.close_on_exit);
        assert_eq!(tab.app_id.as_deref(), Some("com.example.mail"));
        assert!(tab.url.is_empty());
        assert!(!tab.in_load());
        assert_eq!(tab.lock_icon(), LockIcon::Unsecure);
    }

    #[test]
    fn test_stop_reverts_title_to_committed_page() {
        let mut tab = Tab::new(false, None, None, false);
        tab.page_started("https://example.com/", None);
        tab.set_title("Example".into());
        tab.page_finished("https://example.com/");
        tab.progress_changed(100);

        tab.page_started("http://slow.example/", Some("http://slow.example/favicon.ico".into()));
        assert_eq!(tab.display_title(), "http://slow.example/");

        assert_eq!(tab.stop_loading(), Some(LoadEdge::Completed));
        assert_eq!(tab.url, "https://example.com/");
        assert_eq!(tab.title, "Example");
        assert_eq!(tab.favicon_url, None);
        assert_eq!(tab.lock_icon(), LockIcon::Secure);
    }

    #[test]
    fn test_visits_count_distinct_commits() {
        let mut tab = Tab::new(false, None, Some("http://a.example/".into()), false);
        assert!(tab.is_unused_with_url("http://a.example/"));

        tab.page_started("http://a.example/", None);
        tab.page_finished("http://a.example/");
        tab.page_finished("http://a.example/");
        assert_eq!(tab.visits, 1);
        assert!(tab.is_unused_with_url("http://a.example/"));

        tab.page_started("http://b.example/", None);
        tab.page_finished("http://b.example/");
        assert_eq!(tab.visits, 2);
        assert!(!tab.is_unused_with_url("http://b.example/"));
    }

    #[test]
    fn test_page_start_leaves_voice_mode() {
        let mut tab = Tab::new(false, None, None, false);
        tab.activate_voice_search("weather".into());
        assert!(tab.voice_search_mode);

        tab.page_started("http://example.com/", None);
        assert!(!tab.voice_search_mode);
        assert_eq!(tab.voice_title, None);
    }
}
