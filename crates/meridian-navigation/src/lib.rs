//! Meridian Navigation
//!
//! Turns what the user typed, what another application sent, or what a
//! page link points at into a navigation decision:
//! - direct load (scheme normalized)
//! - search (default engine or a quick-search shortcut)
//! - handoff to an external application, sanitized to browsable targets
//!
//! Searches and intent-delivered visits are written through a
//! [`SearchLog`]; [`HistoryManager`] is the SQLite-backed one.

mod error;
mod history;
mod input;
mod intent;
mod router;
mod shortcuts;
mod tracking;

pub use error::NavigationError;
pub use history::{HistoryEntry, HistoryManager};
pub use input::{compose_search_url, fix_url, looks_like_url};
pub use intent::{
    parse_intent_uri, ExternalIntent, HandoffIntent, IntentAction, ACTION_VIEW,
    CATEGORY_BROWSABLE,
};
pub use router::{
    AppResolver, LinkRoute, NavigationDecision, NavigationRouter, SearchLog,
    DEFAULT_SEARCH_TEMPLATE,
};
pub use shortcuts::ShortcutTable;
pub use tracking::{needs_tracking_param, TrackingParamProvider, TRACKING_PARAM};

pub type Result<T> = std::result::Result<T, NavigationError>;
