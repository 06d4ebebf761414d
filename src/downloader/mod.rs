//! Download orchestration engine
//!
//! [`DouyinDownloader`] is the public face of the engine: it accepts
//! download submissions, spawns one execution task per run, and answers
//! status polls from the shared task registry. The work itself is organized
//! by domain:
//! - [`pagination`] - Cursor pagination driver
//! - [`relay`] - Workspace-to-bucket relay
//! - [`task`] - Per-run execution

mod pagination;
mod relay;
mod task;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use pagination::{PageDecision, PaginationDriver};

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{ContentFetcher, DouyinFetcher};
use crate::registry::TaskRegistry;
use crate::storage::{HttpObjectStore, ObjectStore};
use crate::types::{
    DownloadOptions, DownloadReport, DownloadTask, Event, LiveStatus, TaskId, UserProfile,
};

use task::{run_download_task, RunContext};

/// Capacity of the event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// The download orchestration engine.
///
/// Submissions return immediately with a task id; the run proceeds on a
/// spawned task and its outcome is observed by polling
/// [`get_download_status`](Self::get_download_status) or subscribing to
/// events. Cheap to share behind an [`Arc`].
pub struct DouyinDownloader {
    registry: Arc<TaskRegistry>,
    fetcher: Arc<dyn ContentFetcher>,
    store: Arc<dyn ObjectStore>,
    config: Config,
    event_tx: broadcast::Sender<Event>,
    cancel: CancellationToken,
}

impl DouyinDownloader {
    /// Build a downloader with production collaborators from configuration.
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = Arc::new(DouyinFetcher::new(&config.douyin, &config.download)?);
        let store = Arc::new(HttpObjectStore::new(&config.storage)?);
        Ok(Self::with_collaborators(config, fetcher, store))
    }

    /// Build a downloader around injected collaborators.
    ///
    /// This is the seam tests and embedders use to substitute the platform
    /// client or the storage backend.
    pub fn with_collaborators(
        config: Config,
        fetcher: Arc<dyn ContentFetcher>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let registry = Arc::new(TaskRegistry::new(config.registry.task_retention));
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        TaskRegistry::spawn_sweeper(
            registry.clone(),
            config.registry.sweep_interval,
            cancel.child_token(),
            event_tx.clone(),
        );

        Self {
            registry,
            fetcher,
            store,
            config,
            event_tx,
            cancel,
        }
    }

    /// Submit a download for a creator's content.
    ///
    /// Always accepted: the record is inserted as pending and the run is
    /// spawned. Nonexistent users and upstream failures surface later
    /// through the task record, not here.
    pub async fn start_download(
        &self,
        user_id: impl Into<String>,
        options: DownloadOptions,
    ) -> TaskId {
        let user_id = user_id.into();
        let task_id = TaskId::generate();
        let task = DownloadTask::new(task_id.clone(), user_id.clone(), &options);
        self.registry.insert(task).await;

        self.event_tx
            .send(Event::TaskQueued {
                task_id: task_id.clone(),
                user_id: user_id.clone(),
            })
            .ok();
        tracing::info!(task_id = %task_id, user_id = %user_id, "Download submitted");

        let ctx = RunContext {
            registry: self.registry.clone(),
            fetcher: self.fetcher.clone(),
            store: self.store.clone(),
            config: self.config.clone(),
            event_tx: self.event_tx.clone(),
            cancel: self.cancel.child_token(),
            task_id: task_id.clone(),
            user_id,
            options,
        };
        tokio::spawn(run_download_task(ctx));

        task_id
    }

    /// Snapshot the current report for a task.
    ///
    /// Unknown ids, including tasks already evicted after their retention
    /// window, are a [`Error::NotFound`].
    pub async fn get_download_status(&self, task_id: &TaskId) -> Result<DownloadReport> {
        match self.registry.get(task_id).await {
            Some(task) => Ok(DownloadReport::from(&task)),
            None => Err(Error::NotFound(format!("operation {task_id}"))),
        }
    }

    /// Fetch a creator's profile synchronously.
    pub async fn get_user_info(&self, user_id: &str) -> Result<UserProfile> {
        self.fetcher.fetch_profile(user_id).await
    }

    /// Resolve a creator's livestream status.
    ///
    /// The profile's live flag selects whether a room lookup happens at all;
    /// the room snapshot then has the final say on whether the stream is
    /// still on air.
    pub async fn get_live_status(&self, user_id: &str) -> Result<LiveStatus> {
        let profile = self.fetcher.fetch_profile(user_id).await?;

        let room = match profile.room_id.filter(|_| profile.is_living) {
            Some(room_id) => Some(self.fetcher.fetch_room_info(room_id).await?),
            None => None,
        };

        Ok(LiveStatus {
            user_id: profile.user_id,
            is_living: room.as_ref().is_some_and(|r| r.is_live),
            room,
        })
    }

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Number of tracked tasks.
    pub async fn task_count(&self) -> usize {
        self.registry.len().await
    }

    /// Stop the background sweeper and signal in-flight runs to wind down.
    pub fn shutdown(&self) {
        tracing::info!("Downloader shutting down");
        self.cancel.cancel();
        self.event_tx.send(Event::Shutdown).ok();
    }

    /// Engine configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}
