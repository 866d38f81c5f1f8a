//! User commands

use serde::{Deserialize, Serialize};

use meridian_tabs::TabId;

/// Highest tab number reachable through a window shortcut.
pub const MAX_WINDOW_SHORTCUT: u8 = 8;

/// Everything the user can ask for from menus and key bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Address-bar submission
    Open { input: String },
    NewTab {
        url: Option<String>,
        #[serde(default)]
        incognito: bool,
    },
    /// Open a link from the current page in a child tab
    OpenInNewTab { url: String },
    CloseCurrentTab,
    CloseTab { tab: TabId },
    Back,
    Forward,
    Reload,
    Stop,
    /// Stop while loading, reload otherwise
    StopOrReload,
    Home,
    SwitchTo { tab: TabId },
    /// Window shortcut, 1-based
    SwitchToNumber { number: u8 },
    FindOnPage,
    SelectText,
    /// Leave find or selection mode
    EndInteraction,
    Bookmark,
    SetSearchEngine { template: String },
    SaveSession,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Open { .. } => "open",
            Command::NewTab { .. } => "new_tab",
            Command::OpenInNewTab { .. } => "open_in_new_tab",
            Command::CloseCurrentTab => "close_current_tab",
            Command::CloseTab { .. } => "close_tab",
            Command::Back => "back",
            Command::Forward => "forward",
            Command::Reload => "reload",
            Command::Stop => "stop",
            Command::StopOrReload => "stop_or_reload",
            Command::Home => "home",
            Command::SwitchTo { .. } => "switch_to",
            Command::SwitchToNumber { .. } => "switch_to_number",
            Command::FindOnPage => "find_on_page",
            Command::SelectText => "select_text",
            Command::EndInteraction => "end_interaction",
            Command::Bookmark => "bookmark",
            Command::SetSearchEngine { .. } => "set_search_engine",
            Command::SaveSession => "save_session",
        }
    }

    /// Tab index for a window shortcut, if `number` is in range.
    pub fn shortcut_index(number: u8) -> Option<usize> {
        (1..=MAX_WINDOW_SHORTCUT)
            .contains(&number)
            .then(|| usize::from(number - 1))
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcut_index() {
        assert_eq!(Command::shortcut_index(0), None);
        assert_eq!(Command::shortcut_index(1), Some(0));
        assert_eq!(Command::shortcut_index(8), Some(7));
        assert_eq!(Command::shortcut_index(9), None);
    }

    #[test]
    fn test_command_json() {
        let command: Command =
            serde_json::from_str(r#"{"command": "new_tab", "url": null}"#).unwrap();
        assert_eq!(
            command,
            Command::NewTab {
                url: None,
                incognito: false
            }
        );
        assert_eq!(command.to_string(), "new_tab");
    }
}
