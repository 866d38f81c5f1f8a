//! Browser
//!
//! Single owner of the tab store. Engine callbacks, user commands, requests
//! from other applications and lifecycle changes arrive as [`Event`]s and
//! are handled one at a time. Anything slow goes to the [`JobSink`]; its
//! results come back as events and are checked against the tab they were
//! started for.

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use meridian_navigation::{
    ExternalIntent, IntentAction, LinkRoute, NavigationDecision, NavigationRouter,
};
use meridian_session::SessionPersistence;
use meridian_storage::Database;
use meridian_tabs::{LoadEdge, TabId, TabStore};

use crate::command::Command;
use crate::config::Config;
use crate::event::Event;
use crate::pause::{PauseOutcome, PauseResumeCoordinator, ResumeOutcome};
use crate::projection::{
    BrowserStatus, ChromeInputs, ChromeState, InteractionMode, MenuState, Notice,
};
use crate::services::{
    Collaborators, Engine, JobSink, PresentationSurface, Scheduler, SearchProvider, WakeLock,
};
use crate::worker::{BackgroundResult, Job, JobSearchLog};
use crate::Result;

const SEARCH_ENGINE_SETTING: &str = "search_engine";

/// What backing out of the current page did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    WentBack,
    /// Child tab closed, its parent shown
    ClosedToParent,
    /// The browser went behind other applications; `closed_tab` tells
    /// whether a close-on-exit tab was torn down first
    MovedToBackground { closed_tab: bool },
    /// The last tab was a close-on-exit tab: the browser exits
    Finish,
}

type Headers = HashMap<String, String>;

pub struct Browser {
    config: Config,
    store: TabStore,
    router: NavigationRouter,
    persistence: SessionPersistence,
    engine: Arc<dyn Engine>,
    surface: Arc<dyn PresentationSurface>,
    wake_lock: Arc<dyn WakeLock>,
    search: Option<Arc<dyn SearchProvider>>,
    jobs: Arc<dyn JobSink>,
    scheduler: Arc<dyn Scheduler>,
    pause: PauseResumeCoordinator,
    /// Restored tabs whose page has not been requested from the engine yet
    unloaded: HashSet<TabId>,
    menu: MenuState,
    interaction: InteractionMode,
    network_available: bool,
    notice: Option<Notice>,
    status: BrowserStatus,
}

impl Browser {
    /// Restore the last session and show its current tab.
    pub fn new(
        config: Config,
        db: Database,
        collaborators: Collaborators,
        jobs: Arc<dyn JobSink>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self> {
        config.validate()?;

        let mut router = NavigationRouter::new(
            Arc::new(JobSearchLog(jobs.clone())),
            collaborators.resolver.clone(),
            config.app_id.clone(),
        )
        .with_shortcuts(config.shortcuts.clone())
        .with_search_engine(config.search_engine.clone())?;

        if let Some(template) = db.get_setting(SEARCH_ENGINE_SETTING)? {
            if let Err(e) = router.set_search_engine(template) {
                tracing::warn!(error = %e, "Ignoring stored search engine");
            }
        }
        if let Some(tracking) = collaborators.tracking.clone() {
            router = router.with_tracking_provider(tracking);
        }

        let persistence = SessionPersistence::new(
            db,
            config.artifact_dirs(),
            config.max_tabs,
            config.homepage.clone(),
        );
        let store = persistence.restore_latest(Utc::now());
        let unloaded = store.tabs().iter().map(|t| t.id.clone()).collect();

        let mut browser = Self {
            pause: PauseResumeCoordinator::new(config.wake_lock_timeout()),
            config,
            store,
            router,
            persistence,
            engine: collaborators.engine,
            surface: collaborators.surface,
            wake_lock: collaborators.wake_lock,
            search: collaborators.search,
            jobs,
            scheduler,
            unloaded,
            menu: MenuState::Closed,
            interaction: InteractionMode::Browse,
            network_available: true,
            notice: None,
            status: BrowserStatus::Running,
        };

        tracing::info!(tabs = browser.store.len(), "Browser initialized");
        browser.attach_current();
        Ok(browser)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &TabStore {
        &self.store
    }

    pub fn router(&self) -> &NavigationRouter {
        &self.router
    }

    pub fn status(&self) -> BrowserStatus {
        self.status
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Classify address-bar text as the current tab would.
    pub fn classify(&self, input: &str) -> NavigationDecision {
        let private = self.store.current_tab().is_some_and(|t| t.incognito);
        self.router.classify_with(input, private)
    }

    pub fn chrome(&self) -> ChromeState {
        let current = self.store.current_id();
        ChromeState::project(
            &self.store,
            ChromeInputs {
                menu: self.menu,
                interaction: self.interaction,
                can_go_back: current.is_some_and(|id| self.engine.can_go_back(id)),
                can_go_forward: current.is_some_and(|id| self.engine.can_go_forward(id)),
                notice: self.notice.clone(),
                status: self.status,
            },
        )
    }

    /// Process one event. Returns false once the browser has shut down.
    pub fn handle(&mut self, event: Event) -> bool {
        tracing::trace!(event = event.name(), "Handling event");

        match event {
            Event::PageStarted {
                tab,
                url,
                favicon_url,
            } => self.on_page_started(&tab, &url, favicon_url),
            Event::ProgressChanged { tab, percent } => self.on_progress_changed(&tab, percent),
            Event::PageFinished { tab, url } => self.on_page_finished(&tab, &url),
            Event::ReceivedTitle { tab, title } => self.on_received_title(&tab, title),
            Event::ReceivedFavicon { tab, url } => match self.store.tab_mut(&tab) {
                Some(t) => t.set_favicon(url),
                None => stale(&tab, "favicon"),
            },
            Event::MixedContent { tab } => match self.store.tab_mut(&tab) {
                Some(t) => t.load.mark_mixed_content(),
                None => stale(&tab, "mixed content"),
            },
            Event::TouchIconUrl { tab, url } => self.on_touch_icon_url(&tab, url),
            Event::OverrideUrlLoading { tab, url, reply } => {
                let handled = self.should_override_url_loading(&tab, &url);
                if reply.send(handled).is_err() {
                    tracing::debug!(tab_id = %tab, "Engine stopped waiting for link decision");
                }
            }
            Event::Command(command) => self.execute(command),
            Event::Intent(intent) => self.handle_intent(intent),
            Event::MenuChanged(menu) => self.menu = menu,
            Event::NetworkChanged { available } => self.set_network_available(available),
            Event::Pause => self.pause(),
            Event::Resume => self.resume(),
            Event::WakeLockExpired { token } => self.wake_lock_expired(token),
            Event::Background(result) => self.on_background_result(result),
            Event::Shutdown => {
                self.shutdown();
                return false;
            }
        }
        true
    }

    // Load lifecycle

    pub fn on_page_started(&mut self, tab: &TabId, url: &str, favicon_url: Option<String>) {
        let Some(t) = self.store.tab_mut(tab) else {
            return stale(tab, "page start");
        };
        t.page_started(url, favicon_url);
        self.unloaded.remove(tab);

        if self.store.is_current(tab) {
            self.interaction = InteractionMode::Browse;
        }
        if self.config.tracing {
            tracing::debug!(tab_id = %tab, url = %url, "Trace started");
        }
        if self.pause.load_started() {
            tracing::debug!("Resuming timers for background load");
            self.engine.resume_timers();
        }
        if !self.network_available {
            self.engine.set_network_available(false);
            self.notice = Some(Notice::NetworkUnavailable);
        }
    }

    pub fn on_progress_changed(&mut self, tab: &TabId, percent: u8) {
        let Some(t) = self.store.tab_mut(tab) else {
            return stale(tab, "progress");
        };
        if t.progress_changed(percent) == Some(LoadEdge::Completed) {
            self.settle_loads();
        }
    }

    pub fn on_page_finished(&mut self, tab: &TabId, url: &str) {
        let Some(t) = self.store.tab_mut(tab) else {
            return stale(tab, "page finish");
        };
        t.page_finished(url);
        let incognito = t.incognito;
        let title = t.title.clone();

        if self.config.tracing {
            tracing::debug!(tab_id = %tab, url = %url, "Trace stopped");
        }

        if !incognito {
            self.jobs.submit(Job::RecordVisit {
                url: url.to_string(),
                title,
            });
            if let Some(png) = self.engine.capture_thumbnail(tab) {
                self.jobs.submit(Job::SaveThumbnail {
                    url: url.to_string(),
                    png,
                });
            }
        }

        self.settle_loads();
    }

    fn on_received_title(&mut self, tab: &TabId, title: String) {
        let Some(t) = self.store.tab_mut(tab) else {
            return stale(tab, "title");
        };
        t.set_title(title.clone());

        if !t.incognito && !title.trim().is_empty() {
            let url = t.url.clone();
            self.jobs.submit(Job::UpdateTitle { url, title });
        }
    }

    fn on_touch_icon_url(&mut self, tab: &TabId, icon_url: String) {
        let Some(t) = self.store.tab(tab) else {
            return stale(tab, "touch icon url");
        };
        if t.incognito {
            return;
        }
        self.jobs.submit(Job::FetchTouchIcon {
            tab: tab.clone(),
            page_url: t.url.clone(),
            icon_url,
        });
    }

    fn on_background_result(&mut self, result: BackgroundResult) {
        match result {
            BackgroundResult::TouchIcon {
                tab,
                page_url,
                icon,
            } => {
                let is_current = self.store.is_current(&tab);
                match self.store.tab_mut(&tab) {
                    Some(t) if is_current && t.url == page_url => {
                        tracing::debug!(tab_id = %tab, bytes = icon.len(), "Applied touch icon");
                        t.touch_icon = Some(icon);
                    }
                    _ => stale(&tab, "touch icon"),
                }
            }
        }
    }

    /// Stop the tab's load and show its last committed page.
    pub fn stop_loading(&mut self, tab: &TabId) {
        let Some(t) = self.store.tab_mut(tab) else {
            return;
        };
        t.stop_loading();
        self.engine.stop_loading(tab);
        self.settle_loads();
    }

    fn stop_all_loading(&mut self) {
        let loading: Vec<TabId> = self
            .store
            .tabs()
            .iter()
            .filter(|t| t.in_load())
            .map(|t| t.id.clone())
            .collect();

        for id in &loading {
            if let Some(t) = self.store.tab_mut(id) {
                t.stop_loading();
            }
            self.engine.stop_loading(id);
        }
        self.settle_loads();
    }

    /// Suspend timers once a paused browser has nothing left loading.
    fn settle_loads(&mut self) {
        let Some(settled) = self.pause.load_settled(self.store.any_in_load()) else {
            return;
        };
        self.engine.pause_timers();
        if settled.release_wake_lock {
            self.scheduler.cancel_wake_lock_expiry();
            self.wake_lock.release();
        }
        tracing::debug!("Loads settled, timers paused");
    }

    // Navigation

    /// Decide whether the browser takes over a link the engine is about to
    /// follow in `tab`.
    pub fn should_override_url_loading(&mut self, tab: &TabId, url: &str) -> bool {
        let Some(t) = self.store.tab(tab) else {
            stale(tab, "link");
            return false;
        };

        match self.router.route_link(url, t.incognito) {
            LinkRoute::Continue => false,
            LinkRoute::LoadInPlace(target) => {
                self.load_in(tab, &target, &Headers::new());
                true
            }
            LinkRoute::Handoff(intent) => {
                if self.router.resolver().launch(&intent) {
                    self.close_empty_child_tab();
                    true
                } else {
                    tracing::warn!(url = %url, "No application took the link, loading it here");
                    false
                }
            }
        }
    }

    /// Load address-bar text in the current tab.
    pub fn load_input(&mut self, input: &str) {
        let Some(current) = self.store.current_id().cloned() else {
            return;
        };
        let decision = self.classify(input);
        tracing::debug!(kind = decision.kind(), "Classified input");

        if let Some((url, headers)) = self.resolve_decision(decision) {
            self.load_in(&current, &url, &headers);
        }
    }

    /// Serve a request from another application.
    pub fn handle_intent(&mut self, intent: ExternalIntent) {
        if self.store.is_empty() {
            tracing::warn!(action = %intent.action, "No tabs, ignoring intent");
            return;
        }
        if self.store.current_id().is_none() {
            if let Some(first) = self.store.tab_at(0).map(|t| t.id.clone()) {
                self.switch_to_tab(&first);
            }
        }
        let Some(current) = self.store.current_id().cloned() else {
            return;
        };

        let private = self.store.tab(&current).is_some_and(|t| t.incognito);
        let Some(decision) = self.router.classify_intent(&intent, private) else {
            tracing::debug!(action = %intent.action, "Intent carries nothing to load");
            return;
        };
        let Some((url, headers)) = self.resolve_decision(decision) else {
            return;
        };

        let voice = intent.action == IntentAction::VoiceSearchResults;
        // Voice results without an app id come from the browser itself
        let app_request = intent.action == IntentAction::View || (voice && intent.app_id.is_some());
        let foreign_app = intent.app_id.as_deref() != Some(self.config.app_id.as_str());

        let target = if app_request && foreign_app && intent.brought_to_front {
            self.route_app_intent(intent.app_id, url.clone(), headers);
            self.store.current_id().cloned()
        } else {
            // A new request unbinds the current tab from its application
            if let Some(t) = self.store.tab_mut(&current) {
                t.app_id = None;
            }
            self.load_in(&current, &url, &headers);
            Some(current)
        };

        if voice {
            let title = intent.query.unwrap_or(url);
            if let Some(t) = target.and_then(|id| self.store.tab_mut(&id)) {
                t.activate_voice_search(title);
            }
        }
    }

    fn route_app_intent(&mut self, app_id: Option<String>, url: String, headers: Headers) {
        let app_tab = app_id
            .as_deref()
            .and_then(|app| self.store.get_tab_from_id(app))
            .map(|t| t.id.clone());

        if let Some(tab) = app_tab {
            tracing::info!(tab_id = %tab, "Reusing application tab");
            self.reuse_tab(&tab, &url, &headers);
            return;
        }

        if let Some(tab) = self.store.find_unused_tab_with_url(&url).map(|t| t.id.clone()) {
            self.switch_to_tab(&tab);
            return;
        }

        self.open_tab_and_show(Some(url), headers, true, app_id, false);
    }

    /// Show an application's tab again, reloading unless it already shows
    /// `url`.
    fn reuse_tab(&mut self, tab: &TabId, url: &str, headers: &Headers) {
        let needs_load = self.store.tab(tab).map_or(true, |t| {
            t.url != url || t.committed.as_ref().map(|c| c.url.as_str()) != Some(url)
        });

        if !self.store.is_current(tab) {
            self.switch_to_tab(tab);
        }
        if needs_load {
            self.load_in(tab, url, headers);
        }
    }

    /// Turn a decision into a page to load. Handoffs and searches taken
    /// over by the search provider leave nothing to load.
    fn resolve_decision(&mut self, decision: NavigationDecision) -> Option<(String, Headers)> {
        match decision {
            NavigationDecision::ExternalHandoff { intent } => {
                if self.router.resolver().launch(&intent) {
                    self.close_empty_child_tab();
                } else {
                    let url = intent.data.unwrap_or_default();
                    tracing::warn!(url = %url, "External application refused handoff");
                    self.notice = Some(Notice::NoApplication { url });
                }
                None
            }
            NavigationDecision::SearchQuery { ref query, ref source } => {
                if let Some(search) = &self.search {
                    let url = search.start_search(query, source.as_deref())?;
                    return Some((self.router.with_tracking_param(url), Headers::new()));
                }
                let url = self.router.destination(&decision)?;
                Some((url, Headers::new()))
            }
            NavigationDecision::DirectLoad { ref headers, .. } => {
                let headers = headers.clone();
                let url = self.router.destination(&decision)?;
                Some((url, headers))
            }
            NavigationDecision::ShortcutSearch { .. } => {
                let url = self.router.destination(&decision)?;
                Some((url, Headers::new()))
            }
        }
    }

    fn load_in(&mut self, tab: &TabId, url: &str, headers: &Headers) {
        self.unloaded.remove(tab);
        tracing::debug!(tab_id = %tab, url = %url, "Loading");
        self.engine.load_url(tab, url, headers);
    }

    // Tabs

    /// Open `url` (the home page if None) in a new tab and show it. At
    /// capacity the current tab is reused; the flag tells which happened.
    pub fn open_tab_and_show(
        &mut self,
        url: Option<String>,
        headers: Headers,
        close_on_exit: bool,
        app_id: Option<String>,
        incognito: bool,
    ) -> (TabId, bool) {
        let url = url.unwrap_or_else(|| self.config.homepage.clone());

        if self.store.can_create_new_tab() {
            match self
                .store
                .create_new_tab(close_on_exit, app_id, Some(url.clone()), incognito)
            {
                Ok(id) => {
                    self.switch_to_tab(&id);
                    self.load_in(&id, &url, &headers);
                    return (id, true);
                }
                Err(e) => tracing::warn!(error = %e, "Reusing current tab"),
            }
        }

        let current = self.store.ensure_tab().clone();
        self.load_in(&current, &url, &headers);
        (current, false)
    }

    /// Open a link from the current page in a child tab of the same
    /// privacy.
    pub fn open_child_tab(&mut self, url: String) -> Option<TabId> {
        let parent = self.store.current_tab()?;
        let parent_id = parent.id.clone();
        let incognito = parent.incognito;

        let id = match self
            .store
            .create_new_tab(false, None, Some(url.clone()), incognito)
        {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot open child tab");
                self.notice = Some(Notice::TabLimitReached {
                    max: self.store.max_tabs(),
                });
                return None;
            }
        };

        if let Err(e) = self.store.set_parent(&id, &parent_id) {
            tracing::warn!(error = %e, "Failed to link child tab");
        }
        self.switch_to_tab(&id);
        self.load_in(&id, &url, &Headers::new());
        Some(id)
    }

    /// Make `tab` current and move the presentation surface to it.
    pub fn switch_to_tab(&mut self, tab: &TabId) -> bool {
        let previous = self.store.current_id().cloned();
        if !self.store.set_current_tab(tab) {
            return false;
        }
        if let Some(previous) = previous {
            self.surface.set_visible(&previous, false);
            self.surface.detach(&previous);
        }
        self.interaction = InteractionMode::Browse;
        self.attach_current();
        true
    }

    pub fn switch_to_index(&mut self, index: usize) -> bool {
        match self.store.tab_at(index).map(|t| t.id.clone()) {
            Some(id) => self.switch_to_tab(&id),
            None => false,
        }
    }

    fn attach_current(&mut self) {
        let Some(current) = self.store.current_id().cloned() else {
            return;
        };
        self.surface.attach(&current);
        self.surface.set_visible(&current, !self.pause.is_paused());

        if self.unloaded.remove(&current) {
            let url = match self.store.tab(&current) {
                Some(t) if !t.url.is_empty() => t.url.clone(),
                _ => self.config.homepage.clone(),
            };
            self.load_in(&current, &url, &Headers::new());
        }
    }

    /// Remove a tab and release its engine state. Private-browsing files
    /// are purged once the last private tab is gone.
    pub fn close_tab(&mut self, tab: &TabId) -> bool {
        let was_current = self.store.is_current(tab);
        let Some(closed) = self.store.remove_tab(tab) else {
            return false;
        };

        if was_current {
            self.surface.detach(tab);
        }
        self.engine.destroy(tab);
        self.unloaded.remove(tab);

        if was_current {
            self.attach_current();
        }
        if closed.incognito && !self.store.has_any_incognito() {
            self.persistence.purge_incognito_artifacts();
        }
        true
    }

    /// Close the current tab, showing its parent, else the tab to its
    /// right, else the one to its left. Closing the only tab leaves a home
    /// tab behind.
    pub fn close_current_window(&mut self) {
        let Some(current) = self.store.current_id().cloned() else {
            return;
        };

        if self.store.len() == 1 {
            let (_, created) = self.open_tab_and_show(None, Headers::new(), false, None, false);
            if created {
                self.close_tab(&current);
            }
            return;
        }

        let next = self.store.parent_of(&current).map(|t| t.id.clone()).or_else(|| {
            let index = self.store.current_index()?;
            self.store
                .tab_at(index + 1)
                .or_else(|| index.checked_sub(1).and_then(|i| self.store.tab_at(i)))
                .map(|t| t.id.clone())
        });

        if let Some(next) = next {
            self.switch_to_tab(&next);
        }
        self.close_tab(&current);
    }

    /// Back button: go back in the tab, else close a child tab into its
    /// parent, else leave the foreground.
    pub fn go_back_or_quit(&mut self) -> BackOutcome {
        let Some(current) = self.store.current_id().cloned() else {
            self.status = BrowserStatus::Finished;
            return BackOutcome::Finish;
        };

        if self.engine.can_go_back(&current) {
            self.engine.go_back(&current);
            return BackOutcome::WentBack;
        }

        if let Some(parent) = self.store.parent_of(&current).map(|t| t.id.clone()) {
            self.switch_to_tab(&parent);
            self.close_tab(&current);
            return BackOutcome::ClosedToParent;
        }

        let close_on_exit = self.store.tab(&current).is_some_and(|t| t.close_on_exit);
        if close_on_exit {
            // The tab is going away; its load must not keep timers alive
            if let Some(t) = self.store.tab_mut(&current) {
                t.load.clear_in_load();
            }
            if self.store.len() == 1 {
                self.status = BrowserStatus::Finished;
                return BackOutcome::Finish;
            }
            self.close_tab(&current);
        }

        self.status = BrowserStatus::Background;
        BackOutcome::MovedToBackground {
            closed_tab: close_on_exit,
        }
    }

    /// After a handoff, drop the current tab if it is a child that never
    /// showed a page.
    pub fn close_empty_child_tab(&mut self) {
        let Some(current) = self.store.current_tab() else {
            return;
        };
        if current.visits > 0 {
            return;
        }
        let current_id = current.id.clone();
        let Some(parent) = self.store.parent_of(&current_id).map(|t| t.id.clone()) else {
            return;
        };

        tracing::debug!(tab_id = %current_id, "Closing empty child tab");
        self.switch_to_tab(&parent);
        self.close_tab(&current_id);
    }

    // Commands

    pub fn execute(&mut self, command: Command) {
        tracing::debug!(command = %command, "Executing command");
        let current = self.store.current_id().cloned();

        match command {
            Command::Open { input } => self.load_input(&input),
            Command::NewTab { url, incognito } => {
                let (_, created) = self.open_tab_and_show(url, Headers::new(), false, None, incognito);
                if !created {
                    self.notice = Some(Notice::TabLimitReached {
                        max: self.store.max_tabs(),
                    });
                }
            }
            Command::OpenInNewTab { url } => {
                self.open_child_tab(url);
            }
            Command::CloseCurrentTab => self.close_current_window(),
            Command::CloseTab { tab } => {
                if current.as_ref() == Some(&tab) {
                    self.close_current_window();
                } else {
                    self.close_tab(&tab);
                }
            }
            Command::Back => {
                let outcome = self.go_back_or_quit();
                tracing::debug!(?outcome, "Back");
            }
            Command::Forward => {
                if let Some(id) = current.filter(|id| self.engine.can_go_forward(id)) {
                    self.engine.go_forward(&id);
                }
            }
            Command::Reload => {
                if let Some(id) = current {
                    self.engine.reload(&id);
                }
            }
            Command::Stop => {
                if let Some(id) = current {
                    self.stop_loading(&id);
                }
            }
            Command::StopOrReload => {
                if let Some(id) = current {
                    if self.store.tab(&id).is_some_and(|t| t.in_load()) {
                        self.stop_loading(&id);
                    } else {
                        self.engine.reload(&id);
                    }
                }
            }
            Command::Home => {
                if let Some(id) = current {
                    let home = self.config.homepage.clone();
                    self.load_in(&id, &home, &Headers::new());
                }
            }
            Command::SwitchTo { tab } => {
                self.switch_to_tab(&tab);
            }
            Command::SwitchToNumber { number } => match Command::shortcut_index(number) {
                Some(index) => {
                    self.switch_to_index(index);
                }
                None => tracing::warn!(number, "No window shortcut for number"),
            },
            Command::FindOnPage => self.interaction = InteractionMode::Find,
            Command::SelectText => self.interaction = InteractionMode::Select,
            Command::EndInteraction => self.interaction = InteractionMode::Browse,
            Command::Bookmark => {
                if let Some(t) = self.store.current_tab().filter(|t| !t.url.is_empty()) {
                    self.jobs.submit(Job::AddBookmark {
                        url: t.url.clone(),
                        title: t.display_title().to_string(),
                    });
                }
            }
            Command::SetSearchEngine { template } => {
                match self.router.set_search_engine(template.clone()) {
                    Ok(()) => self.jobs.submit(Job::SetSetting {
                        key: SEARCH_ENGINE_SETTING.to_string(),
                        value: template,
                    }),
                    Err(e) => tracing::warn!(error = %e, "Rejected search engine"),
                }
            }
            Command::SaveSession => self.save_session(),
        }
    }

    // Lifecycle

    pub fn pause(&mut self) {
        match self.pause.pause(self.store.any_in_load()) {
            PauseOutcome::Ignored => {
                tracing::warn!("Browser is already paused");
                return;
            }
            PauseOutcome::TimersPaused => self.engine.pause_timers(),
            PauseOutcome::WakeLockHeld { token, timeout } => {
                tracing::info!(timeout_secs = timeout.as_secs(), "Paused mid-load, holding wake lock");
                self.wake_lock.acquire(timeout);
                self.scheduler.schedule_wake_lock_expiry(token, timeout);
            }
        }

        if let Some(current) = self.store.current_id() {
            self.surface.set_visible(current, false);
        }
        if self.status == BrowserStatus::Running {
            self.status = BrowserStatus::Paused;
        }
        self.save_session();
    }

    pub fn resume(&mut self) {
        match self.pause.resume() {
            ResumeOutcome::Ignored => {
                tracing::warn!("Browser is already resumed");
                return;
            }
            ResumeOutcome::Resumed {
                resume_timers,
                release_wake_lock,
            } => {
                if resume_timers {
                    self.engine.resume_timers();
                }
                if release_wake_lock {
                    self.scheduler.cancel_wake_lock_expiry();
                    self.wake_lock.release();
                }
            }
        }

        if let Some(current) = self.store.current_id() {
            self.surface.set_visible(current, true);
        }
        self.status = BrowserStatus::Running;
    }

    /// Loads ran too long in the background: stop them all.
    fn wake_lock_expired(&mut self, token: u64) {
        if !self.pause.wake_lock_expired(token) {
            tracing::debug!(token, "Ignoring expiry of released wake lock");
            return;
        }
        tracing::info!("Background loading timed out, stopping all loads");
        self.wake_lock.release();
        self.stop_all_loading();
    }

    pub fn set_network_available(&mut self, available: bool) {
        if self.network_available == available {
            return;
        }
        self.network_available = available;
        self.engine.set_network_available(available);
        tracing::info!(available, "Network availability changed");

        if available {
            if self.notice == Some(Notice::NetworkUnavailable) {
                self.notice = None;
            }
        } else if self.store.current_tab().is_some_and(|t| t.in_load()) {
            self.notice = Some(Notice::NetworkUnavailable);
        }
    }

    pub fn save_session(&self) {
        if let Err(e) = self.persistence.save(&self.store) {
            tracing::error!(error = %e, "Failed to save session");
        }
    }

    fn shutdown(&mut self) {
        self.save_session();
        if self.pause.wake_lock_held() {
            self.scheduler.cancel_wake_lock_expiry();
            self.wake_lock.release();
        }
        self.status = BrowserStatus::Finished;
        tracing::info!("Browser shut down");
    }
}

fn stale(tab: &TabId, what: &str) {
    tracing::debug!(tab_id = %tab, what, "Dropping stale result");
}
