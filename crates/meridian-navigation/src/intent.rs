//! Intents: requests arriving from other applications, and requests handed
//! off to them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::NavigationError;
use crate::Result;

pub const ACTION_VIEW: &str = "android.intent.action.VIEW";
pub const CATEGORY_BROWSABLE: &str = "android.intent.category.BROWSABLE";

/// What an incoming request asks the browser to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentAction {
    /// Show `data`
    View,
    Search,
    WebSearch,
    MediaSearch,
    /// Show the first voice-search result page
    VoiceSearchResults,
    /// Plain launch or bring-to-front
    Main,
}

impl IntentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentAction::View => "view",
            IntentAction::Search => "search",
            IntentAction::WebSearch => "web_search",
            IntentAction::MediaSearch => "media_search",
            IntentAction::VoiceSearchResults => "voice_search_results",
            IntentAction::Main => "main",
        }
    }
}

impl std::fmt::Display for IntentAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request delivered to the browser by another application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIntent {
    pub action: IntentAction,
    pub data: Option<String>,
    /// Search terms for search actions, display title for voice results
    pub query: Option<String>,
    /// Resolved type of a `content:` data URI
    pub mime_type: Option<String>,
    /// Extra request headers, honoured for http(s) data only
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Identity of the sending application
    pub app_id: Option<String>,
    /// Search source declared by the sender
    pub search_source: Option<String>,
    /// The browser was brought to the front to serve this request
    #[serde(default)]
    pub brought_to_front: bool,
}

impl ExternalIntent {
    pub fn new(action: IntentAction) -> Self {
        Self {
            action,
            data: None,
            query: None,
            mime_type: None,
            headers: HashMap::new(),
            app_id: None,
            search_source: None,
            brought_to_front: false,
        }
    }

    pub fn view(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            ..Self::new(IntentAction::View)
        }
    }

    pub fn search(action: IntentAction, query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::new(action)
        }
    }

    pub fn from_app(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = Some(app_id.into());
        self
    }
}

/// A request the browser hands to another application.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HandoffIntent {
    pub action: String,
    pub data: Option<String>,
    pub mime_type: Option<String>,
    pub package: Option<String>,
    /// Explicit `package/class` target
    pub component: Option<String>,
    pub categories: Vec<String>,
    pub extras: HashMap<String, String>,
}

impl HandoffIntent {
    pub fn view(data: impl Into<String>) -> Self {
        Self {
            action: ACTION_VIEW.to_string(),
            data: Some(data.into()),
            ..Self::default()
        }
    }

    /// App-store search for a package that has no installed handler.
    pub fn market_search(package: &str) -> Self {
        let mut intent = Self::view(format!("market://search?q=pname:{}", package));
        intent.add_category(CATEGORY_BROWSABLE);
        intent
    }

    pub fn add_category(&mut self, category: &str) {
        if !self.categories.iter().any(|c| c == category) {
            self.categories.push(category.to_string());
        }
    }

    /// Restrict the intent to browsable handlers so page content cannot
    /// target arbitrary components.
    pub fn sanitize(&mut self) {
        self.add_category(CATEGORY_BROWSABLE);
        self.component = None;
    }

    pub fn is_browsable(&self) -> bool {
        self.categories.iter().any(|c| c == CATEGORY_BROWSABLE)
    }
}

/// Turn a link target into a handoff intent.
///
/// `intent:` URIs carry their target in a `#Intent;key=value;...;end`
/// fragment; anything else becomes a plain view of the URI.
pub fn parse_intent_uri(uri: &str) -> Result<HandoffIntent> {
    let Some(rest) = uri.strip_prefix("intent:") else {
        return Ok(HandoffIntent::view(uri));
    };

    let Some(marker) = rest.find("#Intent;") else {
        return Ok(HandoffIntent::view(uri));
    };

    let (data, fragment) = rest.split_at(marker);
    let fragment = &fragment["#Intent;".len()..];

    let mut intent = HandoffIntent {
        action: ACTION_VIEW.to_string(),
        ..HandoffIntent::default()
    };
    let mut scheme = None;
    let mut ended = false;

    for part in fragment.split(';') {
        if part == "end" {
            ended = true;
            break;
        }
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| bad_uri(uri, "expected key=value"))?;
        let value = value.to_string();

        match key {
            "action" => intent.action = value,
            "category" => intent.add_category(&value),
            "type" => intent.mime_type = Some(value),
            "package" => intent.package = Some(value),
            "component" => intent.component = Some(value),
            "scheme" => scheme = Some(value),
            _ => {
                if let Some(name) = key.strip_prefix("S.") {
                    intent.extras.insert(name.to_string(), value);
                } else {
                    tracing::debug!(key = %key, "Ignoring unknown intent field");
                }
            }
        }
    }

    if !ended {
        return Err(bad_uri(uri, "missing end"));
    }

    if !data.is_empty() {
        intent.data = Some(match scheme {
            Some(scheme) => format!("{}:{}", scheme, data),
            None => format!("intent:{}", data),
        });
    }

    Ok(intent)
}

fn bad_uri(uri: &str, reason: &str) -> NavigationError {
    NavigationError::BadIntentUri(format!("{}: {}", uri, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_uri_is_view() {
        let intent = parse_intent_uri("geo:0,0?q=coffee").unwrap();
        assert_eq!(intent.action, ACTION_VIEW);
        assert_eq!(intent.data.as_deref(), Some("geo:0,0?q=coffee"));
        assert!(intent.categories.is_empty());
    }

    #[test]
    fn test_parse_intent_scheme() {
        let intent = parse_intent_uri(
            "intent://scan/#Intent;scheme=zxing;package=com.example.scanner;\
             component=com.example.scanner/.Main;category=android.intent.category.DEFAULT;\
             S.mode=qr;end",
        )
        .unwrap();

        assert_eq!(intent.data.as_deref(), Some("zxing://scan/"));
        assert_eq!(intent.package.as_deref(), Some("com.example.scanner"));
        assert_eq!(
            intent.component.as_deref(),
            Some("com.example.scanner/.Main")
        );
        assert_eq!(intent.extras.get("mode").map(String::as_str), Some("qr"));
    }

    #[test]
    fn test_bad_intent_uri() {
        assert!(matches!(
            parse_intent_uri("intent:#Intent;package=com.example"),
            Err(NavigationError::BadIntentUri(_))
        ));
        assert!(matches!(
            parse_intent_uri("intent:#Intent;garbage;end"),
            Err(NavigationError::BadIntentUri(_))
        ));
    }

    #[test]
    fn test_sanitize_strips_component() {
        let mut intent = parse_intent_uri(
            "intent://x#Intent;scheme=app;component=com.example/.Secret;end",
        )
        .unwrap();
        intent.sanitize();
        intent.sanitize();

        assert_eq!(intent.component, None);
        assert_eq!(intent.categories, vec![CATEGORY_BROWSABLE.to_string()]);
    }

    #[test]
    fn test_market_search() {
        let intent = HandoffIntent::market_search("com.example.app");
        assert_eq!(
            intent.data.as_deref(),
            Some("market://search?q=pname:com.example.app")
        );
        assert!(intent.is_browsable());
    }
}
