//! Meridian Core
//!
//! Browser runtime: owns the tab store and coordinates the rendering engine,
//! navigation routing, session persistence and pause/resume. The engine and
//! windowing layer are collaborators behind traits; they hold no browser
//! state of their own.

mod browser;
mod command;
mod config;
mod error;
mod event;
mod fetch;
mod pause;
mod projection;
mod runtime;
mod services;
mod worker;

pub use browser::{BackOutcome, Browser};
pub use command::{Command, MAX_WINDOW_SHORTCUT};
pub use config::{Config, DEFAULT_TOUCH_ICON_MAX_BYTES, DEFAULT_WAKE_LOCK_TIMEOUT_SECS};
pub use error::CoreError;
pub use event::Event;
pub use fetch::{fetch_touch_icon, http_client};
pub use pause::{PauseOutcome, PauseResumeCoordinator, ResumeOutcome, Settled};
pub use projection::{
    title_bar_visible, BrowserStatus, ChromeInputs, ChromeState, InteractionMode, MenuState,
    Notice, StopOrReload,
};
pub use runtime::{BrowserHandle, Runtime};
pub use services::{
    Collaborators, Engine, JobSink, PresentationSurface, Scheduler, SearchProvider, WakeLock,
};
pub use worker::{thumbnail_path, BackgroundResult, Job, JobSearchLog, Worker};

// Re-export the component crates
pub use meridian_navigation::{
    AppResolver, ExternalIntent, HandoffIntent, HistoryEntry, HistoryManager, IntentAction,
    LinkRoute, NavigationDecision, NavigationError, NavigationRouter, SearchLog, ShortcutTable,
    TrackingParamProvider,
};
pub use meridian_session::{ArtifactDirs, SessionError, SessionPersistence, SessionSnapshot};
pub use meridian_storage::{Database, StorageError};
pub use meridian_tabs::{LoadLifecycle, LockIcon, Tab, TabError, TabId, TabStore};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
