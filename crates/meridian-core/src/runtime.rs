//! Event loop
//!
//! One task owns the [`Browser`] and feeds it events in arrival order.
//! Embedders talk to it through a cloneable [`BrowserHandle`]; the chrome
//! projection is republished after every event.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use meridian_navigation::ExternalIntent;
use meridian_storage::Database;
use meridian_tabs::TabId;

use crate::browser::Browser;
use crate::command::Command;
use crate::config::Config;
use crate::error::CoreError;
use crate::event::Event;
use crate::projection::ChromeState;
use crate::services::{Collaborators, Scheduler};
use crate::worker::Worker;
use crate::Result;

/// Wake-lock expiry on tokio timers. Only the latest schedule is live.
struct TokioScheduler {
    events: mpsc::UnboundedSender<Event>,
    handle: Handle,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler for TokioScheduler {
    fn schedule_wake_lock_expiry(&self, token: u64, after: Duration) {
        let events = self.events.clone();
        let task = self.handle.spawn(async move {
            tokio::time::sleep(after).await;
            if events.send(Event::WakeLockExpired { token }).is_err() {
                tracing::debug!(token, "Browser gone before wake lock expired");
            }
        });

        if let Some(previous) = self.pending.lock().replace(task) {
            previous.abort();
        }
    }

    fn cancel_wake_lock_expiry(&self) {
        if let Some(task) = self.pending.lock().take() {
            task.abort();
        }
    }
}

pub struct Runtime;

impl Runtime {
    /// Open the database at `config.database_path` and start.
    pub async fn start_with_config(
        config: Config,
        collaborators: Collaborators,
    ) -> Result<(BrowserHandle, JoinHandle<()>)> {
        config.ensure_dirs()?;
        let db = Database::open(&config.database_path)?;
        tracing::info!(path = %config.database_path.display(), "Opened database");
        Self::start(config, db, collaborators).await
    }

    /// Restore the session and start the event loop on the current tokio
    /// runtime. The returned task ends after [`BrowserHandle::shutdown`],
    /// once queued background jobs have drained.
    pub async fn start(
        config: Config,
        db: Database,
        collaborators: Collaborators,
    ) -> Result<(BrowserHandle, JoinHandle<()>)> {
        config.ensure_dirs()?;

        let handle = Handle::current();
        let (events, mut rx) = mpsc::unbounded_channel();

        let (worker, worker_task) = Worker::spawn(
            handle.clone(),
            events.clone(),
            db.clone(),
            config.thumbnail_dir.clone(),
            config.touch_icon_max_bytes,
        )?;
        let scheduler = Arc::new(TokioScheduler {
            events: events.clone(),
            handle: handle.clone(),
            pending: Mutex::new(None),
        });

        let mut browser = Browser::new(config, db, collaborators, Arc::new(worker), scheduler)?;
        let chrome = Arc::new(RwLock::new(browser.chrome()));

        let published = chrome.clone();
        let task = handle.spawn(async move {
            while let Some(event) = rx.recv().await {
                let running = browser.handle(event);
                *published.write() = browser.chrome();
                if !running {
                    break;
                }
            }

            drop(browser);
            if let Err(e) = worker_task.await {
                tracing::warn!(error = %e, "Job queue ended abnormally");
            }
            tracing::info!("Event loop stopped");
        });

        Ok((BrowserHandle { events, chrome }, task))
    }
}

#[derive(Clone)]
pub struct BrowserHandle {
    events: mpsc::UnboundedSender<Event>,
    chrome: Arc<RwLock<ChromeState>>,
}

impl BrowserHandle {
    pub fn send(&self, event: Event) -> Result<()> {
        self.events.send(event).map_err(|_| CoreError::RuntimeClosed)
    }

    pub fn command(&self, command: Command) -> Result<()> {
        self.send(Event::Command(command))
    }

    pub fn intent(&self, intent: ExternalIntent) -> Result<()> {
        self.send(Event::Intent(intent))
    }

    /// Ask whether the browser takes over a link; the engine holds the
    /// navigation until this resolves.
    pub async fn should_override_url_loading(&self, tab: TabId, url: String) -> Result<bool> {
        let (reply, answer) = oneshot::channel();
        self.send(Event::OverrideUrlLoading { tab, url, reply })?;
        answer.await.map_err(|_| CoreError::RuntimeClosed)
    }

    /// Latest published chrome state.
    pub fn chrome(&self) -> ChromeState {
        self.chrome.read().clone()
    }

    /// Save the session and stop the event loop.
    pub fn shutdown(&self) -> Result<()> {
        self.send(Event::Shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::tests::{
        test_config, FakeEngine, FakeResolver, FakeSurface, FakeWakeLock, HOME,
    };
    use crate::projection::BrowserStatus;
    use meridian_session::SessionPersistence;

    fn collaborators(engine: Arc<FakeEngine>, resolver: Arc<FakeResolver>) -> Collaborators {
        Collaborators {
            engine,
            surface: Arc::new(FakeSurface::default()),
            wake_lock: Arc::new(FakeWakeLock::default()),
            resolver,
            search: None,
            tracking: None,
        }
    }

    #[tokio::test]
    async fn test_scheduler_fires_latest_and_cancels() {
        let (events, mut rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler {
            events,
            handle: Handle::current(),
            pending: Mutex::new(None),
        };

        scheduler.schedule_wake_lock_expiry(1, Duration::from_millis(200));
        scheduler.schedule_wake_lock_expiry(2, Duration::from_millis(10));
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, Event::WakeLockExpired { token: 2 }));

        scheduler.schedule_wake_lock_expiry(3, Duration::from_millis(20));
        scheduler.cancel_wake_lock_expiry();
        assert!(tokio::time::timeout(Duration::from_millis(400), rx.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_runtime_round_trip() {
        let root = std::env::temp_dir().join(format!("meridian-runtime-{}", uuid::Uuid::new_v4()));
        let config = test_config(&root, 8);
        let artifact_dirs = config.artifact_dirs();
        let db = Database::open_in_memory().unwrap();
        let engine = Arc::new(FakeEngine::default());
        let resolver = Arc::new(FakeResolver {
            handlers: vec![("tel:", "com.example.dialer")],
            ..FakeResolver::default()
        });

        let (handle, task) = Runtime::start(
            config,
            db.clone(),
            collaborators(engine.clone(), resolver.clone()),
        )
        .await
        .unwrap();

        let chrome = handle.chrome();
        assert_eq!(chrome.tab_count, 1);
        let tab = chrome.current_tab.unwrap();

        handle
            .command(Command::NewTab {
                url: Some("http://b.example/".into()),
                incognito: false,
            })
            .unwrap();
        let taken = handle
            .should_override_url_loading(tab, "wtai://wp/mc;5551234".into())
            .await
            .unwrap();
        assert!(taken);
        assert_eq!(resolver.launched.lock().len(), 1);
        assert_eq!(handle.chrome().tab_count, 2);

        handle.shutdown().unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(handle.command(Command::Reload).is_err());

        let persistence = SessionPersistence::new(db, artifact_dirs, 8, HOME.to_string());
        let snapshot = persistence.load().unwrap().unwrap();
        assert_eq!(snapshot.tabs.tabs.len(), 2);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_session_persists_in_configured_database() {
        let root = std::env::temp_dir().join(format!("meridian-runtime-{}", uuid::Uuid::new_v4()));
        let config = test_config(&root, 8);
        let database_path = config.database_path.clone();

        let (handle, task) = Runtime::start_with_config(
            config.clone(),
            collaborators(
                Arc::new(FakeEngine::default()),
                Arc::new(FakeResolver::default()),
            ),
        )
        .await
        .unwrap();
        handle
            .command(Command::NewTab {
                url: Some("http://b.example/".into()),
                incognito: false,
            })
            .unwrap();
        handle.shutdown().unwrap();
        task.await.unwrap();
        assert!(database_path.exists());

        let (handle, task) = Runtime::start_with_config(
            config,
            collaborators(
                Arc::new(FakeEngine::default()),
                Arc::new(FakeResolver::default()),
            ),
        )
        .await
        .unwrap();
        assert_eq!(handle.chrome().tab_count, 2);
        handle.shutdown().unwrap();
        task.await.unwrap();

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_status_published_on_shutdown() {
        let root = std::env::temp_dir().join(format!("meridian-runtime-{}", uuid::Uuid::new_v4()));
        let (handle, task) = Runtime::start(
            test_config(&root, 8),
            Database::open_in_memory().unwrap(),
            collaborators(
                Arc::new(FakeEngine::default()),
                Arc::new(FakeResolver::default()),
            ),
        )
        .await
        .unwrap();

        handle.send(Event::Pause).unwrap();
        handle.shutdown().unwrap();
        task.await.unwrap();
        assert_eq!(handle.chrome().status, BrowserStatus::Finished);

        let _ = std::fs::remove_dir_all(&root);
    }
}
