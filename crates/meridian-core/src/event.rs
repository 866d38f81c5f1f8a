//! Inputs to the browser event loop

use tokio::sync::oneshot;

use meridian_navigation::ExternalIntent;
use meridian_tabs::TabId;

use crate::command::Command;
use crate::projection::MenuState;
use crate::worker::BackgroundResult;

/// Engine callbacks carry the tab they concern; results for tabs that were
/// closed or navigated away in the meantime are dropped.
#[derive(Debug)]
pub enum Event {
    PageStarted {
        tab: TabId,
        url: String,
        favicon_url: Option<String>,
    },
    ProgressChanged {
        tab: TabId,
        percent: u8,
    },
    PageFinished {
        tab: TabId,
        url: String,
    },
    ReceivedTitle {
        tab: TabId,
        title: String,
    },
    ReceivedFavicon {
        tab: TabId,
        url: Option<String>,
    },
    MixedContent {
        tab: TabId,
    },
    TouchIconUrl {
        tab: TabId,
        url: String,
    },
    /// The engine is about to follow a link; answer whether the browser
    /// took it over.
    OverrideUrlLoading {
        tab: TabId,
        url: String,
        reply: oneshot::Sender<bool>,
    },
    Command(Command),
    Intent(ExternalIntent),
    MenuChanged(MenuState),
    NetworkChanged {
        available: bool,
    },
    Pause,
    Resume,
    WakeLockExpired {
        token: u64,
    },
    Background(BackgroundResult),
    Shutdown,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::PageStarted { .. } => "page_started",
            Event::ProgressChanged { .. } => "progress_changed",
            Event::PageFinished { .. } => "page_finished",
            Event::ReceivedTitle { .. } => "received_title",
            Event::ReceivedFavicon { .. } => "received_favicon",
            Event::MixedContent { .. } => "mixed_content",
            Event::TouchIconUrl { .. } => "touch_icon_url",
            Event::OverrideUrlLoading { .. } => "override_url_loading",
            Event::Command(_) => "command",
            Event::Intent(_) => "intent",
            Event::MenuChanged(_) => "menu_changed",
            Event::NetworkChanged { .. } => "network_changed",
            Event::Pause => "pause",
            Event::Resume => "resume",
            Event::WakeLockExpired { .. } => "wake_lock_expired",
            Event::Background(_) => "background",
            Event::Shutdown => "shutdown",
        }
    }
}
