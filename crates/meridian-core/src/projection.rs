//! Chrome projection
//!
//! The title bar, progress indicator, lock icon and stop/reload toggle are
//! derived from the current tab on every change and published as one
//! value. Nothing in here feeds back into tab state.

use serde::{Deserialize, Serialize};

use meridian_tabs::{title_url, LockIcon, Tab, TabId, TabStore};

/// State of the options menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuState {
    #[default]
    Closed,
    /// Icon menu: the title bar stays visible above it
    Compact,
    /// Full list menu: covers the title bar
    Expanded,
}

/// Page interaction mode; a new page load ends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    #[default]
    Browse,
    Find,
    Select,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOrReload {
    Stop,
    #[default]
    Reload,
}

/// User-visible notice raised by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    NetworkUnavailable,
    TabLimitReached { max: usize },
    NoApplication { url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserStatus {
    #[default]
    Running,
    Paused,
    /// Moved behind other applications after backing out of the last page
    Background,
    /// Asked to exit
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChromeState {
    pub tab_count: usize,
    pub current_index: Option<usize>,
    pub current_tab: Option<TabId>,
    pub url: String,
    /// Host-only form of the URL shown in the title bar
    pub display_url: String,
    pub title: String,
    pub favicon_url: Option<String>,
    pub lock_icon: LockIcon,
    pub progress: u8,
    pub in_load: bool,
    pub incognito: bool,
    pub title_bar_visible: bool,
    pub menu: MenuState,
    pub interaction: InteractionMode,
    pub stop_or_reload: StopOrReload,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub can_create_new_tab: bool,
    pub notice: Option<Notice>,
    pub status: BrowserStatus,
}

/// Inputs to the projection that do not live on the tab.
#[derive(Debug, Clone, Default)]
pub struct ChromeInputs {
    pub menu: MenuState,
    pub interaction: InteractionMode,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub notice: Option<Notice>,
    pub status: BrowserStatus,
}

impl ChromeState {
    pub fn project(store: &TabStore, inputs: ChromeInputs) -> Self {
        let mut state = ChromeState {
            tab_count: store.len(),
            current_index: store.current_index(),
            can_create_new_tab: store.can_create_new_tab(),
            menu: inputs.menu,
            interaction: inputs.interaction,
            notice: inputs.notice,
            status: inputs.status,
            ..ChromeState::default()
        };

        let Some(tab) = store.current_tab() else {
            return state;
        };

        state.current_tab = Some(tab.id.clone());
        state.url = tab.url.clone();
        state.display_url = display_url(tab);
        state.title = display_title(tab);
        state.favicon_url = tab.favicon_url.clone();
        state.lock_icon = tab.lock_icon();
        state.progress = tab.load.progress();
        state.in_load = tab.in_load();
        state.incognito = tab.incognito;
        state.title_bar_visible = title_bar_visible(inputs.menu, state.in_load);
        state.stop_or_reload = if state.in_load {
            StopOrReload::Stop
        } else {
            StopOrReload::Reload
        };
        state.can_go_back = inputs.can_go_back;
        state.can_go_forward = inputs.can_go_forward;
        state
    }
}

/// The title bar shows while a page loads and whenever the compact menu is
/// open; the expanded menu always covers it.
pub fn title_bar_visible(menu: MenuState, in_load: bool) -> bool {
    match menu {
        MenuState::Closed => in_load,
        MenuState::Compact => true,
        MenuState::Expanded => false,
    }
}

fn display_title(tab: &Tab) -> String {
    if tab.voice_search_mode {
        if let Some(title) = &tab.voice_title {
            return title.clone();
        }
    }
    tab.display_title().to_string()
}

fn display_url(tab: &Tab) -> String {
    if tab.voice_search_mode {
        return tab.voice_title.clone().unwrap_or_default();
    }
    title_url(&tab.url).unwrap_or_else(|| tab.url.clone())
}
