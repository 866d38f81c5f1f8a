//! Background work
//!
//! Database writes and thumbnail files run on the blocking pool, one job at
//! a time and in submission order, so a visit is always recorded before its
//! title update. Touch-icon downloads run concurrently. Results that the
//! browser must see come back as [`Event::Background`].

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use meridian_navigation::{HistoryManager, SearchLog};
use meridian_storage::Database;
use meridian_tabs::TabId;

use crate::error::CoreError;
use crate::event::Event;
use crate::fetch::{fetch_touch_icon, http_client};
use crate::services::JobSink;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    RecordVisit { url: String, title: String },
    UpdateTitle { url: String, title: String },
    RecordSearch { term: String },
    AddBookmark { url: String, title: String },
    SaveThumbnail { url: String, png: Vec<u8> },
    SetSetting { key: String, value: String },
    FetchTouchIcon { tab: TabId, page_url: String, icon_url: String },
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::RecordVisit { .. } => "record_visit",
            Job::UpdateTitle { .. } => "update_title",
            Job::RecordSearch { .. } => "record_search",
            Job::AddBookmark { .. } => "add_bookmark",
            Job::SaveThumbnail { .. } => "save_thumbnail",
            Job::SetSetting { .. } => "set_setting",
            Job::FetchTouchIcon { .. } => "fetch_touch_icon",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundResult {
    /// Icon for the page `page_url` was showing when the fetch started
    TouchIcon {
        tab: TabId,
        page_url: String,
        icon: Vec<u8>,
    },
}

/// Thumbnail file for `url`: the hex SHA-256 of the URL.
pub fn thumbnail_path(dir: &Path, url: &str) -> PathBuf {
    let digest = Sha256::digest(url.as_bytes());
    let name: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    dir.join(format!("{}.png", name))
}

/// State shared by jobs on the blocking pool.
#[derive(Clone)]
struct JobContext {
    db: Database,
    history: HistoryManager,
    thumbnails: PathBuf,
}

impl JobContext {
    fn run(&self, job: Job) -> Result<()> {
        match job {
            Job::RecordVisit { url, title } => self.history.record_visit(&url, &title)?,
            Job::UpdateTitle { url, title } => self.history.update_title(&url, &title)?,
            Job::RecordSearch { term } => self.history.record_search(&term)?,
            Job::AddBookmark { url, title } => {
                self.db.add_bookmark(&url, &title)?;
                tracing::info!(url = %url, "Bookmarked page");
            }
            Job::SaveThumbnail { url, png } => {
                let path = thumbnail_path(&self.thumbnails, &url);
                std::fs::create_dir_all(&self.thumbnails)?;
                std::fs::write(&path, &png)?;
                let bookmarked = self.db.set_bookmark_thumbnail(&url, &png)?;
                tracing::debug!(url = %url, path = %path.display(), bookmarked, "Saved thumbnail");
            }
            Job::SetSetting { key, value } => self.db.set_setting(&key, &value)?,
            Job::FetchTouchIcon { .. } => {
                return Err(CoreError::Config("touch icons are not blocking jobs".into()));
            }
        }
        Ok(())
    }
}

/// Job sink backed by the tokio runtime.
pub struct Worker {
    jobs: mpsc::UnboundedSender<Job>,
    handle: tokio::runtime::Handle,
    events: mpsc::UnboundedSender<Event>,
    client: reqwest::Client,
    touch_icon_max_bytes: usize,
}

impl Worker {
    /// Start the job queue on `handle`. The returned task ends once the
    /// worker is dropped and the queue drained.
    pub fn spawn(
        handle: tokio::runtime::Handle,
        events: mpsc::UnboundedSender<Event>,
        db: Database,
        thumbnails: PathBuf,
        touch_icon_max_bytes: usize,
    ) -> Result<(Self, JoinHandle<()>)> {
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();
        let context = JobContext {
            history: HistoryManager::new(db.clone()),
            db,
            thumbnails,
        };

        let task = handle.spawn(async move {
            while let Some(job) = queue.recv().await {
                let name = job.name();
                let context = context.clone();
                let result = tokio::task::spawn_blocking(move || context.run(job))
                    .await
                    .unwrap_or_else(|e| Err(CoreError::Io(std::io::Error::other(e.to_string()))));

                if let Err(e) = result {
                    tracing::warn!(job = name, error = %e, "Background job failed");
                }
            }
            tracing::debug!("Job queue closed");
        });

        let worker = Self {
            jobs,
            handle,
            events,
            client: http_client()?,
            touch_icon_max_bytes,
        };
        Ok((worker, task))
    }

    fn fetch_touch_icon(&self, tab: TabId, page_url: String, icon_url: String) {
        let client = self.client.clone();
        let events = self.events.clone();
        let max_bytes = self.touch_icon_max_bytes;

        self.handle.spawn(async move {
            match fetch_touch_icon(&client, &icon_url, max_bytes).await {
                Ok(icon) => {
                    let result = BackgroundResult::TouchIcon {
                        tab,
                        page_url,
                        icon,
                    };
                    if events.send(Event::Background(result)).is_err() {
                        tracing::debug!("Browser gone before touch icon arrived");
                    }
                }
                Err(e) => tracing::warn!(url = %icon_url, error = %e, "Touch icon fetch failed"),
            }
        });
    }
}

impl JobSink for Worker {
    fn submit(&self, job: Job) {
        match job {
            Job::FetchTouchIcon {
                tab,
                page_url,
                icon_url,
            } => self.fetch_touch_icon(tab, page_url, icon_url),
            job => {
                let name = job.name();
                if self.jobs.send(job).is_err() {
                    tracing::warn!(job = name, "Job queue closed, dropping job");
                }
            }
        }
    }
}

/// Routes router-side history writes through the job queue.
pub struct JobSearchLog(pub Arc<dyn JobSink>);

impl SearchLog for JobSearchLog {
    fn add_search(&self, term: &str) {
        self.0.submit(Job::RecordSearch {
            term: term.to_string(),
        });
    }

    fn add_visit(&self, url: &str) {
        self.0.submit(Job::RecordVisit {
            url: url.to_string(),
            title: String::new(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_thumbnail_path_is_url_digest() {
        let path = thumbnail_path(Path::new("/thumbs"), "abc");
        assert_eq!(
            path,
            PathBuf::from(
                "/thumbs/ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad.png"
            )
        );
    }

    #[test]
    fn test_job_context_writes_history_and_thumbnails() {
        let dir = std::env::temp_dir().join(format!("meridian-worker-{}", uuid::Uuid::new_v4()));
        let db = Database::open_in_memory().unwrap();
        db.add_bookmark("https://example.com/", "Example").unwrap();
        let context = JobContext {
            history: HistoryManager::new(db.clone()),
            db: db.clone(),
            thumbnails: dir.clone(),
        };

        context
            .run(Job::RecordVisit {
                url: "https://example.com/".into(),
                title: String::new(),
            })
            .unwrap();
        context
            .run(Job::UpdateTitle {
                url: "https://example.com/".into(),
                title: "Example Domain".into(),
            })
            .unwrap();
        context
            .run(Job::SaveThumbnail {
                url: "https://example.com/".into(),
                png: vec![1, 2, 3],
            })
            .unwrap();

        let recent = context.history.recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].title, "Example Domain");
        assert_eq!(
            std::fs::read(thumbnail_path(&dir, "https://example.com/")).unwrap(),
            vec![1, 2, 3]
        );
        assert!(db.bookmarks().unwrap()[0].has_thumbnail);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_worker_runs_jobs_in_order() {
        let db = Database::open_in_memory().unwrap();
        let (events, _rx) = mpsc::unbounded_channel();
        let (worker, task) = Worker::spawn(
            tokio::runtime::Handle::current(),
            events,
            db.clone(),
            std::env::temp_dir(),
            1024,
        )
        .unwrap();

        let log = JobSearchLog(Arc::new(worker));
        log.add_search("first");
        log.add_search("second");
        drop(log);

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();

        let history = HistoryManager::new(db);
        assert_eq!(
            history.recent_searches(10).unwrap(),
            vec!["second".to_string(), "first".to_string()]
        );
    }
}
