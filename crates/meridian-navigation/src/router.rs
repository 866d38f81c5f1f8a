//! Navigation Router
//!
//! Classifies address-bar text, external requests and in-page link targets.
//! Text is classified by the first matching rule:
//!
//! 1. telephony/mail/map schemes → external handoff
//! 2. `about:` → loaded internally
//! 3. allow-listed scheme → direct load (scheme lowercased, spaces encoded)
//! 4. `<letter><space>terms` with a known letter → shortcut search
//! 5. anything else containing a space → search
//! 6. scheme-less web address → direct load with `http://` prepended
//! 7. fallback → search with the default engine

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::NavigationError;
use crate::input::{
    accept_scheme, compose_search_url, fix_url, guess_url, has_accepted_scheme, looks_like_url,
};
use crate::intent::{parse_intent_uri, ExternalIntent, HandoffIntent, IntentAction};
use crate::shortcuts::ShortcutTable;
use crate::tracking::{TrackingParam, TrackingParamProvider};
use crate::Result;

pub const DEFAULT_SEARCH_TEMPLATE: &str = "http://www.google.com/m?q=%s";

/// Marker placed in suggestion URLs; replaced with the requesting app's
/// declared search source.
const SUGGEST_SOURCE_MARKER: &str = "&source=android-browser-suggest&";
const UNKNOWN_SOURCE: &str = "unknown";

const WTAI_PREFIX: &str = "wtai://wp/";
const WTAI_MAKE_CALL: &str = "wtai://wp/mc;";
const WTAI_SEND_DTMF: &str = "wtai://wp/sd;";
const WTAI_ADD_PHONEBOOK: &str = "wtai://wp/ap;";

/// Schemes owned by platform applications rather than the browser.
const HANDOFF_SCHEMES: &[&str] = &["tel:", "mailto:", "geo:", "sms:", "smsto:"];

/// Fire-and-forget history sink for searches and intent-delivered visits.
pub trait SearchLog: Send + Sync {
    fn add_search(&self, term: &str);
    fn add_visit(&self, url: &str);
}

/// Installed-application lookup.
pub trait AppResolver: Send + Sync {
    /// Package that would receive `intent`, if any is installed.
    fn resolve(&self, intent: &HandoffIntent) -> Option<String>;

    /// Start the handler. Returns false if no application took the intent.
    fn launch(&self, intent: &HandoffIntent) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationDecision {
    DirectLoad {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    SearchQuery {
        query: String,
        source: Option<String>,
    },
    ExternalHandoff {
        intent: HandoffIntent,
    },
    ShortcutSearch {
        template: String,
        query: String,
    },
}

impl NavigationDecision {
    pub fn direct(url: impl Into<String>) -> Self {
        NavigationDecision::DirectLoad {
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NavigationDecision::DirectLoad { .. } => "direct_load",
            NavigationDecision::SearchQuery { .. } => "search_query",
            NavigationDecision::ExternalHandoff { .. } => "external_handoff",
            NavigationDecision::ShortcutSearch { .. } => "shortcut_search",
        }
    }

    /// URL to load, for decisions that carry their own destination.
    pub fn resolved_url(&self) -> Option<String> {
        match self {
            NavigationDecision::DirectLoad { url, .. } => Some(url.clone()),
            NavigationDecision::ShortcutSearch { template, query } => {
                Some(compose_search_url(template, query))
            }
            NavigationDecision::SearchQuery { .. } | NavigationDecision::ExternalHandoff { .. } => {
                None
            }
        }
    }
}

/// Outcome of intercepting a link the engine is about to follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkRoute {
    /// The engine loads it as usual
    Continue,
    /// Load this URL in the same tab instead
    LoadInPlace(String),
    /// Give it to another application
    Handoff(HandoffIntent),
}

pub struct NavigationRouter {
    shortcuts: ShortcutTable,
    /// Default engine, `%s` replaced with the encoded query
    search_template: String,
    /// Package name of the browser itself
    self_package: String,
    search_log: Arc<dyn SearchLog>,
    resolver: Arc<dyn AppResolver>,
    tracking: Option<TrackingParam>,
}

impl NavigationRouter {
    pub fn new(
        search_log: Arc<dyn SearchLog>,
        resolver: Arc<dyn AppResolver>,
        self_package: impl Into<String>,
    ) -> Self {
        Self {
            shortcuts: ShortcutTable::default(),
            search_template: DEFAULT_SEARCH_TEMPLATE.to_string(),
            self_package: self_package.into(),
            search_log,
            resolver,
            tracking: None,
        }
    }

    pub fn with_shortcuts(mut self, shortcuts: ShortcutTable) -> Self {
        self.shortcuts = shortcuts;
        self
    }

    pub fn with_search_engine(mut self, template: String) -> Result<Self> {
        self.set_search_engine(template)?;
        Ok(self)
    }

    pub fn with_tracking_provider(mut self, provider: Arc<dyn TrackingParamProvider>) -> Self {
        self.tracking = Some(TrackingParam::new(provider));
        self
    }

    pub fn set_search_engine(&mut self, template: String) -> Result<()> {
        if !template.contains("%s") {
            return Err(NavigationError::InvalidUrl(template));
        }
        self.search_template = template;
        Ok(())
    }

    pub fn search_template(&self) -> &str {
        &self.search_template
    }

    pub fn resolver(&self) -> &Arc<dyn AppResolver> {
        &self.resolver
    }

    /// Classify address-bar text, recording searches.
    pub fn classify(&self, input: &str) -> NavigationDecision {
        self.classify_with(input, false)
    }

    /// Classify address-bar text. Nothing is written to history for a
    /// private tab.
    pub fn classify_with(&self, input: &str, private: bool) -> NavigationDecision {
        let input = input.trim();
        if input.is_empty() {
            return NavigationDecision::direct("about:blank");
        }

        if let Some(target) = handoff_target(input) {
            return self.handoff_or_load(HandoffIntent::view(target.clone()), target);
        }

        if let Some(url) = accept_scheme(input) {
            // Rules 2 and 3: about: and the other allow-listed schemes
            return NavigationDecision::direct(url);
        }

        if input.contains(' ') {
            if let Some((template, query)) = self.shortcuts.parse(input) {
                self.log_search(input, private);
                return NavigationDecision::ShortcutSearch {
                    template: template.to_string(),
                    query: query.to_string(),
                };
            }

            self.log_search(input, private);
            return NavigationDecision::SearchQuery {
                query: input.to_string(),
                source: None,
            };
        }

        if looks_like_url(input) {
            if let Some(url) = guess_url(input) {
                return NavigationDecision::direct(url);
            }
        }

        self.log_search(input, private);
        NavigationDecision::SearchQuery {
            query: input.to_string(),
            source: None,
        }
    }

    /// Classify a request from another application. Returns None if it
    /// carries nothing to load.
    pub fn classify_intent(
        &self,
        intent: &ExternalIntent,
        private: bool,
    ) -> Option<NavigationDecision> {
        match intent.action {
            IntentAction::Main => None,
            IntentAction::View | IntentAction::VoiceSearchResults => {
                let data = intent.data.as_deref().map(str::trim).filter(|d| !d.is_empty())?;
                let mut decision = self.classify_with(data, private);

                if let NavigationDecision::DirectLoad { url, headers } = &mut decision {
                    if url.starts_with("content:") {
                        if let Some(mime) = &intent.mime_type {
                            url.push('?');
                            url.push_str(mime);
                        }
                    }
                    if url.starts_with("http") && !intent.headers.is_empty() {
                        *headers = intent.headers.clone();
                    }
                }
                Some(decision)
            }
            IntentAction::Search | IntentAction::WebSearch | IntentAction::MediaSearch => {
                let query = intent.query.as_deref().map(str::trim).filter(|q| !q.is_empty())?;
                let fixed = fix_url(query);
                let fixed = fixed.trim();

                if !self.is_addressable(fixed) {
                    if !private {
                        self.search_log.add_visit(fixed);
                        self.search_log.add_search(fixed);
                    }
                    return Some(NavigationDecision::SearchQuery {
                        query: fixed.to_string(),
                        source: intent.search_source.clone(),
                    });
                }

                let mut decision = self.classify_with(fixed, private);
                if let NavigationDecision::DirectLoad { url, .. } = &mut decision {
                    if !private {
                        self.search_log.add_visit(url);
                    }
                    if url.contains(SUGGEST_SOURCE_MARKER) {
                        let source = intent
                            .search_source
                            .as_deref()
                            .filter(|s| !s.is_empty())
                            .unwrap_or(UNKNOWN_SOURCE);
                        *url = url.replace(
                            SUGGEST_SOURCE_MARKER,
                            &format!("&source=android-{}&", source),
                        );
                    }
                }
                Some(decision)
            }
        }
    }

    /// Where a decision leads inside the browser. Searches go to the
    /// default engine; handoffs have no in-browser destination.
    pub fn destination(&self, decision: &NavigationDecision) -> Option<String> {
        let url = match decision {
            NavigationDecision::SearchQuery { query, .. } => {
                Some(compose_search_url(&self.search_template, query))
            }
            other => other.resolved_url(),
        };
        url.map(|url| self.with_tracking_param(url))
    }

    /// Append the attribution parameter if `url` is a first-party search.
    pub fn with_tracking_param(&self, url: String) -> String {
        self.tracking
            .as_ref()
            .and_then(|t| t.apply(&url))
            .unwrap_or(url)
    }

    /// Decide what happens to a link the engine is about to follow in a
    /// tab.
    pub fn route_link(&self, url: &str, private: bool) -> LinkRoute {
        // Links never leave the browser from a private tab
        if private {
            return LinkRoute::LoadInPlace(url.to_string());
        }

        if url.starts_with(WTAI_PREFIX) {
            if let Some(number) = url.strip_prefix(WTAI_MAKE_CALL) {
                return LinkRoute::Handoff(HandoffIntent::view(format!("tel:{}", number)));
            }
            if url.starts_with(WTAI_SEND_DTMF) || url.starts_with(WTAI_ADD_PHONEBOOK) {
                return LinkRoute::Continue;
            }
        }

        if url.starts_with("about:") {
            return LinkRoute::Continue;
        }

        if let Some(tracked) = self.tracking.as_ref().and_then(|t| t.apply(url)) {
            return LinkRoute::LoadInPlace(tracked);
        }

        let intent = match parse_intent_uri(url) {
            Ok(intent) => intent,
            Err(e) => {
                tracing::warn!(error = %e, "Handling link internally");
                return LinkRoute::Continue;
            }
        };

        match self.external_handoff(intent) {
            Some(intent) => LinkRoute::Handoff(intent),
            None => LinkRoute::Continue,
        }
    }

    fn handoff_or_load(&self, intent: HandoffIntent, fallback: String) -> NavigationDecision {
        match self.external_handoff(intent) {
            Some(intent) => NavigationDecision::ExternalHandoff { intent },
            None => NavigationDecision::direct(fallback),
        }
    }

    /// The intent to hand off, sanitized, or None to handle it internally.
    fn external_handoff(&self, mut intent: HandoffIntent) -> Option<HandoffIntent> {
        match self.resolver.resolve(&intent) {
            Some(handler) if handler == self.self_package => None,
            Some(handler) => {
                tracing::debug!(handler = %handler, "Handing off to external application");
                intent.sanitize();
                Some(intent)
            }
            None => intent
                .package
                .as_deref()
                .map(HandoffIntent::market_search),
        }
    }

    /// Whether text names a location rather than search terms.
    fn is_addressable(&self, input: &str) -> bool {
        looks_like_url(input)
            || has_accepted_scheme(input)
            || self.shortcuts.parse(input).is_some()
    }

    fn log_search(&self, term: &str, private: bool) {
        if !private {
            self.search_log.add_search(term);
        }
    }
}

/// Platform-native target for telephony, mail and map input.
fn handoff_target(input: &str) -> Option<String> {
    if let Some(number) = input.strip_prefix(WTAI_MAKE_CALL) {
        return Some(format!("tel:{}", number));
    }

    let lower = input.to_ascii_lowercase();
    HANDOFF_SCHEMES
        .iter()
        .find(|scheme| lower.starts_with(*scheme))
        .map(|scheme| format!("{}{}", scheme, &input[scheme.len()..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLog {
        searches: Mutex<Vec<String>>,
        visits: Mutex<Vec<String>>,
    }

    impl SearchLog for RecordingLog {
        fn add_search(&self, term: &str) {
            self.searches.lock().unwrap().push(term.to_string());
        }

        fn add_visit(&self, url: &str) {
            self.visits.lock().unwrap().push(url.to_string());
        }
    }

    /// Resolves by data-URI prefix
    #[derive(Default)]
    struct FakeResolver {
        handlers: Vec<(&'static str, &'static str)>,
    }

    impl AppResolver for FakeResolver {
        fn resolve(&self, intent: &HandoffIntent) -> Option<String> {
            let data = intent.data.as_deref()?;
            self.handlers
                .iter()
                .find(|(prefix, _)| data.starts_with(prefix))
                .map(|(_, package)| package.to_string())
        }

        fn launch(&self, intent: &HandoffIntent) -> bool {
            self.resolve(intent).is_some()
        }
    }

    struct FixedTracking;

    impl TrackingParamProvider for FixedTracking {
        fn tracking_param(&self) -> Option<String> {
            Some("1T4".into())
        }
    }

    const SELF: &str = "com.example.browser";

    fn router_with(handlers: Vec<(&'static str, &'static str)>) -> (NavigationRouter, Arc<RecordingLog>) {
        let log = Arc::new(RecordingLog::default());
        let router = NavigationRouter::new(log.clone(), Arc::new(FakeResolver { handlers }), SELF);
        (router, log)
    }

    fn router() -> (NavigationRouter, Arc<RecordingLog>) {
        router_with(Vec::new())
    }

    fn url_of(decision: &NavigationDecision) -> String {
        match decision {
            NavigationDecision::DirectLoad { url, .. } => url.clone(),
            other => panic!("Expected DirectLoad, got {:?}", other),
        }
    }

    #[test]
    fn test_allow_listed_schemes_load_directly() {
        let (router, log) = router();
        for (input, expected) in [
            ("HTTPS://Example.com/A Path", "https://Example.com/A%20Path"),
            ("file:///sdcard/page.html", "file:///sdcard/page.html"),
            ("Data:text/html,<b>hi</b>", "data:text/html,<b>hi</b>"),
            ("content://media/1", "content://media/1"),
            ("javascript:void(0)", "javascript:void(0)"),
            ("About:Blank", "about:Blank"),
        ] {
            assert_eq!(url_of(&router.classify(input)), expected);
        }
        assert!(log.searches.lock().unwrap().is_empty());
    }

    #[test]
    fn test_direct_load_is_idempotent() {
        let (router, _) = router();
        for input in ["HTTP://a.example/x y", "example.com/path", "192.168.1.1:8080", "about:blank"] {
            let first = url_of(&router.classify(input));
            let second = url_of(&router.classify(&first));
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_shortcut_search() {
        let (router, log) = router();
        let mut table = ShortcutTable::new();
        table.insert('g', "http://example/search?q=%s");
        let router = router.with_shortcuts(table);

        let decision = router.classify("g search terms");
        assert_eq!(
            decision,
            NavigationDecision::ShortcutSearch {
                template: "http://example/search?q=%s".into(),
                query: "search terms".into(),
            }
        );
        assert_eq!(
            decision.resolved_url().as_deref(),
            Some("http://example/search?q=search%20terms")
        );
        assert_eq!(*log.searches.lock().unwrap(), vec!["g search terms".to_string()]);
    }

    #[test]
    fn test_search_and_scheme_guess() {
        let (router, log) = router();

        assert_eq!(
            router.classify("rust borrow checker"),
            NavigationDecision::SearchQuery {
                query: "rust borrow checker".into(),
                source: None
            }
        );
        assert_eq!(url_of(&router.classify("example.com")), "http://example.com");
        assert_eq!(
            router.classify("hello"),
            NavigationDecision::SearchQuery {
                query: "hello".into(),
                source: None
            }
        );
        assert_eq!(log.searches.lock().unwrap().len(), 2);

        let search = router.classify_with("private terms", true);
        assert_eq!(
            router.destination(&search).as_deref(),
            Some("http://www.google.com/m?q=private%20terms")
        );
        assert_eq!(log.searches.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_telephony_handoff() {
        let (router, _) = router_with(vec![("tel:", "com.example.dialer")]);

        match router.classify("wtai://wp/mc;5551234") {
            NavigationDecision::ExternalHandoff { intent } => {
                assert_eq!(intent.data.as_deref(), Some("tel:5551234"));
                assert!(intent.is_browsable());
            }
            other => panic!("Expected handoff, got {:?}", other),
        }

        // No handler installed: handled internally
        assert_eq!(url_of(&router.classify("mailto:a@example.com")), "mailto:a@example.com");
    }

    #[test]
    fn test_about_never_handed_off() {
        let (router, _) = router_with(vec![("about:", "com.example.other")]);
        assert_eq!(url_of(&router.classify("about:blank")), "about:blank");
        assert_eq!(router.route_link("about:blank", false), LinkRoute::Continue);
    }

    #[test]
    fn test_route_link() {
        let (router, _) = router_with(vec![
            ("http://maps.example/", "com.example.maps"),
            ("http://self.example/", SELF),
        ]);

        match router.route_link("http://maps.example/place", false) {
            LinkRoute::Handoff(intent) => {
                assert!(intent.is_browsable());
                assert_eq!(intent.component, None);
            }
            other => panic!("Expected handoff, got {:?}", other),
        }
        assert_eq!(router.route_link("http://self.example/", false), LinkRoute::Continue);
        assert_eq!(router.route_link("http://plain.example/", false), LinkRoute::Continue);
        assert_eq!(
            router.route_link("http://maps.example/place", true),
            LinkRoute::LoadInPlace("http://maps.example/place".into())
        );
        assert_eq!(router.route_link("wtai://wp/sd;123", false), LinkRoute::Continue);
        assert_eq!(
            router.route_link("wtai://wp/mc;123", false),
            LinkRoute::Handoff(HandoffIntent::view("tel:123"))
        );
    }

    #[test]
    fn test_route_link_market_fallback_and_bad_uri() {
        let (router, _) = router();
        match router.route_link("intent://x#Intent;scheme=app;package=com.example.app;end", false) {
            LinkRoute::Handoff(intent) => assert_eq!(
                intent.data.as_deref(),
                Some("market://search?q=pname:com.example.app")
            ),
            other => panic!("Expected market handoff, got {:?}", other),
        }
        assert_eq!(
            router.route_link("intent://x#Intent;scheme=app", false),
            LinkRoute::Continue
        );
    }

    #[test]
    fn test_route_link_adds_tracking_param() {
        let (router, _) = router();
        let router = router.with_tracking_provider(Arc::new(FixedTracking));
        assert_eq!(
            router.route_link("http://www.google.com/search?q=rust", false),
            LinkRoute::LoadInPlace("http://www.google.com/search?q=rust&rlz=1T4".into())
        );
        assert_eq!(
            router.route_link("http://www.google.com/search?q=rust&rlz=1T4", false),
            LinkRoute::Continue
        );
    }

    #[test]
    fn test_view_intent() {
        let (router, _) = router();

        let mut intent = ExternalIntent::view("content://downloads/7");
        intent.mime_type = Some("text/html".into());
        assert_eq!(
            url_of(&router.classify_intent(&intent, false).unwrap()),
            "content://downloads/7?text/html"
        );

        let mut intent = ExternalIntent::view("http://example.com/");
        intent.headers.insert("Referer".into(), "app".into());
        match router.classify_intent(&intent, false).unwrap() {
            NavigationDecision::DirectLoad { headers, .. } => {
                assert_eq!(headers.get("Referer").map(String::as_str), Some("app"))
            }
            other => panic!("Expected DirectLoad, got {:?}", other),
        }

        assert!(router
            .classify_intent(&ExternalIntent::new(IntentAction::Main), false)
            .is_none());
    }

    #[test]
    fn test_search_intent() {
        let (router, log) = router();

        let mut intent = ExternalIntent::search(IntentAction::WebSearch, "weather today");
        intent.search_source = Some("launcher".into());
        assert_eq!(
            router.classify_intent(&intent, false),
            Some(NavigationDecision::SearchQuery {
                query: "weather today".into(),
                source: Some("launcher".into())
            })
        );
        assert_eq!(*log.searches.lock().unwrap(), vec!["weather today".to_string()]);

        let intent = ExternalIntent::search(
            IntentAction::Search,
            "HTTP:/www.google.com/search?q=x&source=android-browser-suggest&hl=en",
        );
        assert_eq!(
            url_of(&router.classify_intent(&intent, false).unwrap()),
            "http://www.google.com/search?q=x&source=android-unknown&hl=en"
        );
        assert_eq!(log.visits.lock().unwrap().len(), 2);
    }
}
