//! Serializable view of the tab store
//!
//! Only what is needed to bring tabs back after a restart: no load state,
//! no icons, no engine history.

use serde::{Deserialize, Serialize};

use crate::tab::{Tab, TabId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabSnapshot {
    pub id: TabId,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub parent: Option<TabId>,
    #[serde(default)]
    pub incognito: bool,
    #[serde(default)]
    pub close_on_exit: bool,
    #[serde(default)]
    pub app_id: Option<String>,
}

impl From<&Tab> for TabSnapshot {
    fn from(tab: &Tab) -> Self {
        // A tab mid-load is saved at the page the user last saw
        let (url, title) = match (&tab.committed, tab.in_load()) {
            (Some(page), true) => (page.url.clone(), page.title.clone()),
            _ => (tab.url.clone(), tab.title.clone()),
        };

        Self {
            id: tab.id.clone(),
            url,
            title,
            parent: tab.parent.clone(),
            incognito: tab.incognito,
            close_on_exit: tab.close_on_exit,
            app_id: tab.app_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub tabs: Vec<TabSnapshot>,
    /// Index into `tabs` of the tab that was current
    #[serde(default)]
    pub current: Option<usize>,
}

impl StoreSnapshot {
    pub fn has_incognito(&self) -> bool {
        self.tabs.iter().any(|t| t.incognito)
    }
}
