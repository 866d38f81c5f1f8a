//! Attribution parameter for first-party search queries

use std::sync::{Arc, OnceLock};
use url::Url;

pub const TRACKING_PARAM: &str = "rlz";

/// Source of the attribution token. Asked at most once per process.
pub trait TrackingParamProvider: Send + Sync {
    fn tracking_param(&self) -> Option<String>;
}

/// Whether `url` is a Google search that does not carry the parameter yet.
///
/// Accepts `google.<tld>`, `google.co.<cc>` and `google.com.<cc>` hosts,
/// never `corp.google.*`.
pub fn needs_tracking_param(url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }

    let mut has_query = false;
    for (key, _) in url.query_pairs() {
        match key.as_ref() {
            "q" => has_query = true,
            TRACKING_PARAM => return false,
            _ => {}
        }
    }
    if !has_query {
        return false;
    }

    let Some(host) = url.host_str() else {
        return false;
    };
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() < 2 {
        return false;
    }

    let mut google = parts.len() - 2;
    if parts[google] != "google" {
        if parts.len() < 3 || !matches!(parts[google], "co" | "com") {
            return false;
        }
        google = parts.len() - 3;
        if parts[google] != "google" {
            return false;
        }
    }

    !(google > 0 && parts[google - 1] == "corp")
}

/// Caches the provider's answer for the lifetime of the router.
pub(crate) struct TrackingParam {
    provider: Arc<dyn TrackingParamProvider>,
    value: OnceLock<Option<String>>,
}

impl TrackingParam {
    pub(crate) fn new(provider: Arc<dyn TrackingParamProvider>) -> Self {
        Self {
            provider,
            value: OnceLock::new(),
        }
    }

    pub(crate) fn value(&self) -> Option<&str> {
        self.value
            .get_or_init(|| {
                let value = self.provider.tracking_param();
                tracing::debug!(present = value.is_some(), "Looked up tracking parameter");
                value
            })
            .as_deref()
    }

    /// `url` with the parameter appended, if it needs one and one is known.
    pub(crate) fn apply(&self, url: &str) -> Option<String> {
        let mut parsed = Url::parse(url).ok()?;
        if !needs_tracking_param(&parsed) {
            return None;
        }
        let value = self.value()?;
        parsed.query_pairs_mut().append_pair(TRACKING_PARAM, value);
        Some(parsed.into())
    }
}
