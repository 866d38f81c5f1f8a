//! Tab Store
//!
//! Ordered tab sequence with a single current-tab pointer. All mutation
//! happens on the browser's event queue, so the store itself is plain data.

use crate::error::TabError;
use crate::snapshot::{StoreSnapshot, TabSnapshot};
use crate::tab::{Tab, TabId};
use crate::Result;

pub const DEFAULT_MAX_TABS: usize = 8;

#[derive(Debug, Clone)]
pub struct TabStore {
    tabs: Vec<Tab>,
    current: Option<usize>,
    max_tabs: usize,
    /// Loaded into the tab synthesized when a store would otherwise be empty
    home_url: String,
}

impl TabStore {
    pub fn new(max_tabs: usize, home_url: impl Into<String>) -> Self {
        Self {
            tabs: Vec::new(),
            current: None,
            max_tabs: max_tabs.max(1),
            home_url: home_url.into(),
        }
    }

    pub fn max_tabs(&self) -> usize {
        self.max_tabs
    }

    pub fn home_url(&self) -> &str {
        &self.home_url
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn can_create_new_tab(&self) -> bool {
        self.tabs.len() < self.max_tabs
    }

    /// Append a tab. Callers at capacity are expected to reuse the current
    /// tab instead; this refuses rather than exceed `max_tabs`.
    pub fn create_new_tab(
        &mut self,
        close_on_exit: bool,
        app_id: Option<String>,
        url: Option<String>,
        incognito: bool,
    ) -> Result<TabId> {
        if !self.can_create_new_tab() {
            return Err(TabError::CapacityReached { max: self.max_tabs });
        }

        let tab = Tab::new(close_on_exit, app_id, url, incognito);
        let id = tab.id.clone();

        tracing::info!(
            tab_id = %id,
            close_on_exit,
            incognito,
            count = self.tabs.len() + 1,
            "Created new tab"
        );

        self.tabs.push(tab);
        Ok(id)
    }

    /// Link `child` under `parent`, detaching it from any previous parent.
    pub fn set_parent(&mut self, child: &TabId, parent: &TabId) -> Result<()> {
        if child == parent {
            return Err(TabError::SelfParent(child.clone()));
        }
        if self.index_of(parent).is_none() {
            return Err(TabError::NotFound(parent.clone()));
        }

        let old_parent = {
            let tab = self
                .tab_mut(child)
                .ok_or_else(|| TabError::NotFound(child.clone()))?;
            tab.parent.replace(parent.clone())
        };

        if let Some(old) = old_parent.and_then(|old| self.tab_mut(&old)) {
            old.remove_child(child);
        }
        if let Some(parent_tab) = self.tab_mut(parent) {
            parent_tab.add_child(child.clone());
        }
        Ok(())
    }

    /// Remove a tab from the sequence and hand it back so the caller can
    /// release its rendering surface.
    ///
    /// Children keep their parent id; it resolves to no parent from now on.
    /// If the current tab is removed, the tab before it becomes current
    /// (the first tab when it was first).
    pub fn remove_tab(&mut self, id: &TabId) -> Option<Tab> {
        let remove_index = self.index_of(id)?;
        let tab = self.tabs.remove(remove_index);

        if let Some(parent) = tab.parent.as_ref().and_then(|p| self.tab_mut(p)) {
            parent.remove_child(id);
        }

        self.current = match self.current {
            _ if self.tabs.is_empty() => None,
            Some(current) if current > remove_index => Some(current - 1),
            Some(current) if current == remove_index => Some(current.saturating_sub(1)),
            other => other,
        };

        tracing::info!(tab_id = %id, count = self.tabs.len(), "Removed tab");
        Some(tab)
    }

    /// Returns false if the tab is unknown or already current.
    pub fn set_current_tab(&mut self, id: &TabId) -> bool {
        let Some(index) = self.index_of(id) else {
            tracing::warn!(tab_id = %id, "Cannot make unknown tab current");
            return false;
        };
        if self.current == Some(index) {
            return false;
        }

        self.current = Some(index);
        tracing::debug!(tab_id = %id, index, "Current tab changed");
        true
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_id(&self) -> Option<&TabId> {
        self.current_tab().map(|t| &t.id)
    }

    pub fn current_tab(&self) -> Option<&Tab> {
        self.current.and_then(|i| self.tabs.get(i))
    }

    pub fn current_tab_mut(&mut self) -> Option<&mut Tab> {
        self.current.and_then(|i| self.tabs.get_mut(i))
    }

    pub fn is_current(&self, id: &TabId) -> bool {
        self.current_id() == Some(id)
    }

    pub fn index_of(&self, id: &TabId) -> Option<usize> {
        self.tabs.iter().position(|t| &t.id == id)
    }

    pub fn tab(&self, id: &TabId) -> Option<&Tab> {
        self.tabs.iter().find(|t| &t.id == id)
    }

    pub fn tab_mut(&mut self, id: &TabId) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| &t.id == id)
    }

    pub fn tab_at(&self, index: usize) -> Option<&Tab> {
        self.tabs.get(index)
    }

    /// Parent of `id`, or None when it has none or the parent was closed.
    pub fn parent_of(&self, id: &TabId) -> Option<&Tab> {
        let parent = self.tab(id)?.parent.as_ref()?;
        self.tab(parent)
    }

    /// Tab previously bound to an external application.
    pub fn get_tab_from_id(&self, app_id: &str) -> Option<&Tab> {
        self.tabs
            .iter()
            .find(|t| t.app_id.as_deref() == Some(app_id))
    }

    /// A tab that shows `url` and has not navigated elsewhere. The current
    /// tab is preferred.
    pub fn find_unused_tab_with_url(&self, url: &str) -> Option<&Tab> {
        if url.is_empty() {
            return None;
        }
        if let Some(current) = self.current_tab() {
            if current.is_unused_with_url(url) {
                return Some(current);
            }
        }
        self.tabs.iter().find(|t| t.is_unused_with_url(url))
    }

    pub fn has_any_incognito(&self) -> bool {
        self.tabs.iter().any(|t| t.incognito)
    }

    pub fn any_in_load(&self) -> bool {
        self.tabs.iter().any(|t| t.in_load())
    }

    pub fn save_state(&self) -> StoreSnapshot {
        StoreSnapshot {
            tabs: self.tabs.iter().map(TabSnapshot::from).collect(),
            current: self.current,
        }
    }

    /// Replace the store's contents with `snapshot`.
    ///
    /// Returns false if the snapshot yields no tabs; a default home tab is
    /// created in that case so the store is never left empty.
    pub fn restore_state(&mut self, snapshot: &StoreSnapshot, drop_incognito: bool) -> bool {
        self.tabs.clear();
        self.current = None;

        let saved_current = snapshot
            .current
            .and_then(|i| snapshot.tabs.get(i))
            .map(|t| t.id.clone());

        for saved in &snapshot.tabs {
            if drop_incognito && saved.incognito {
                tracing::debug!(tab_id = %saved.id, "Dropping incognito tab from session");
                continue;
            }
            if self.index_of(&saved.id).is_some() {
                tracing::warn!(tab_id = %saved.id, "Duplicate tab id in session, skipping");
                continue;
            }

            let mut tab = Tab::new(
                saved.close_on_exit,
                saved.app_id.clone(),
                Some(saved.url.clone()),
                saved.incognito,
            );
            tab.id = saved.id.clone();
            tab.title = saved.title.clone();
            self.tabs.push(tab);
        }

        if self.tabs.len() > self.max_tabs {
            tracing::warn!(
                saved = self.tabs.len(),
                max = self.max_tabs,
                "Session holds more tabs than allowed, truncating"
            );
            self.tabs.truncate(self.max_tabs);
        }

        // Re-link parents that survived; links to dropped tabs are cleared
        let links: Vec<(TabId, TabId)> = snapshot
            .tabs
            .iter()
            .filter_map(|s| Some((s.id.clone(), s.parent.clone()?)))
            .filter(|(child, parent)| {
                child != parent && self.index_of(child).is_some() && self.index_of(parent).is_some()
            })
            .collect();
        for (child, parent) in links {
            if let Some(tab) = self.tab_mut(&child) {
                tab.parent = Some(parent.clone());
            }
            if let Some(tab) = self.tab_mut(&parent) {
                tab.add_child(child);
            }
        }

        if self.tabs.is_empty() {
            tracing::info!("Session restored no tabs, opening home page");
            self.push_home_tab();
            return false;
        }

        self.current = saved_current
            .and_then(|id| self.index_of(&id))
            .or(Some(0));

        tracing::info!(count = self.tabs.len(), "Restored tabs");
        true
    }

    /// Ensure there is at least one tab and that one of them is current.
    pub fn ensure_tab(&mut self) -> &TabId {
        if self.tabs.is_empty() {
            self.push_home_tab();
        }
        let index = *self.current.get_or_insert(0);
        &self.tabs[index].id
    }

    fn push_home_tab(&mut self) {
        let tab = Tab::new(false, None, Some(self.home_url.clone()), false);
        self.tabs.push(tab);
        self.current = Some(self.tabs.len() - 1);
    }
}
