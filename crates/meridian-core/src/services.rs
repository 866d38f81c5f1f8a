//! Collaborators the browser drives but does not own.
//!
//! The rendering engine, the windowing layer and platform services sit
//! behind these traits so the runtime can be exercised without them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use meridian_navigation::{AppResolver, TrackingParamProvider};
use meridian_tabs::TabId;

use crate::worker::Job;

/// Per-tab rendering engine.
pub trait Engine: Send + Sync {
    fn load_url(&self, tab: &TabId, url: &str, headers: &HashMap<String, String>);
    fn stop_loading(&self, tab: &TabId);
    fn reload(&self, tab: &TabId);
    fn go_back(&self, tab: &TabId);
    fn go_forward(&self, tab: &TabId);
    fn can_go_back(&self, tab: &TabId) -> bool;
    fn can_go_forward(&self, tab: &TabId) -> bool;
    /// Suspend script timers of every tab
    fn pause_timers(&self);
    fn resume_timers(&self);
    /// PNG of what the tab currently shows
    fn capture_thumbnail(&self, tab: &TabId) -> Option<Vec<u8>>;
    /// Release the tab's engine state for good
    fn destroy(&self, tab: &TabId);
    fn set_network_available(&self, available: bool);
}

/// Windowing layer showing one tab at a time.
pub trait PresentationSurface: Send + Sync {
    fn attach(&self, tab: &TabId);
    fn detach(&self, tab: &TabId);
    fn set_visible(&self, tab: &TabId, visible: bool);
}

/// External search front end.
pub trait SearchProvider: Send + Sync {
    /// Start a search. Returns the page to load in the tab, or None when
    /// the provider took over the flow with its own UI.
    fn start_search(&self, query: &str, source: Option<&str>) -> Option<String>;
}

/// Keeps the device awake while paused loads finish.
pub trait WakeLock: Send + Sync {
    fn acquire(&self, timeout: Duration);
    fn release(&self);
}

/// Delivers the wake-lock expiry back to the browser.
pub trait Scheduler: Send + Sync {
    fn schedule_wake_lock_expiry(&self, token: u64, after: Duration);
    fn cancel_wake_lock_expiry(&self);
}

/// Accepts work that must not block the event loop.
pub trait JobSink: Send + Sync {
    fn submit(&self, job: Job);
}

/// Everything supplied by the embedder.
#[derive(Clone)]
pub struct Collaborators {
    pub engine: Arc<dyn Engine>,
    pub surface: Arc<dyn PresentationSurface>,
    pub wake_lock: Arc<dyn WakeLock>,
    pub resolver: Arc<dyn AppResolver>,
    pub search: Option<Arc<dyn SearchProvider>>,
    pub tracking: Option<Arc<dyn TrackingParamProvider>>,
}
