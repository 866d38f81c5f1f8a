//! Transport-security indicator and the title-bar text derived from a URL

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockIcon {
    #[default]
    Unsecure,
    Secure,
    /// Secure main frame with insecure subresources
    Mixed,
}

impl LockIcon {
    /// Classification a load starts with, before any mixed-content report.
    pub fn for_url(url: &str) -> Self {
        match Url::parse(url) {
            Ok(parsed) if parsed.scheme() == "https" => LockIcon::Secure,
            _ => LockIcon::Unsecure,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LockIcon::Unsecure => "unsecure",
            LockIcon::Secure => "secure",
            LockIcon::Mixed => "mixed",
        }
    }
}

impl std::fmt::Display for LockIcon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Title-bar form of a URL.
///
/// The host alone, `https://host` for secure pages, an empty string for
/// host-less URLs such as `file:` and `None` when the URL does not parse.
pub fn title_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = match parsed.host_str() {
        Some(host) if !host.is_empty() => host,
        _ => return Some(String::new()),
    };

    if parsed.scheme().eq_ignore_ascii_case("https") {
        Some(format!("https://{}", host))
    } else {
        Some(host.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_for_url() {
        assert_eq!(LockIcon::for_url("https://example.com/"), LockIcon::Secure);
        assert_eq!(LockIcon::for_url("http://example.com/"), LockIcon::Unsecure);
        assert_eq!(LockIcon::for_url("about:blank"), LockIcon::Unsecure);
        assert_eq!(LockIcon::for_url("not a url"), LockIcon::Unsecure);
    }

    #[test]
    fn test_title_url() {
        assert_eq!(
            title_url("http://www.example.com/path?q=1").as_deref(),
            Some("www.example.com")
        );
        assert_eq!(
            title_url("https://bank.example/login").as_deref(),
            Some("https://bank.example")
        );
        assert_eq!(title_url("file:///sdcard/page.html").as_deref(), Some(""));
        assert_eq!(title_url("::not a url::"), None);
    }
}
