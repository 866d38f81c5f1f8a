//! Meridian Tab Runtime
//!
//! Owns the ordered set of browsing contexts, the single current-tab
//! pointer and the load-progress state machine each tab carries.
//! Tab order is insertion order and is significant: window shortcuts
//! index into it.

mod error;
mod lifecycle;
mod lock;
mod snapshot;
mod store;
mod tab;

pub use error::TabError;
pub use lifecycle::{LoadEdge, LoadLifecycle, LoadProgressSnapshot, LoadState, INITIAL_PROGRESS};
pub use lock::{title_url, LockIcon};
pub use snapshot::{StoreSnapshot, TabSnapshot};
pub use store::{TabStore, DEFAULT_MAX_TABS};
pub use tab::{CommittedPage, Tab, TabId};

pub type Result<T> = std::result::Result<T, TabError>;
