//! In-memory task registry with retention-based eviction
//!
//! The registry is the single synchronized view of all download tasks. A
//! mapping-wide `RwLock` is sufficient: updates are tiny and polling reads
//! are cheap clones. Terminal tasks stay pollable for a retention window
//! measured from `finished_at`, after which a periodic background sweep
//! evicts them.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::types::{DownloadTask, Event, TaskId};

/// Synchronized map of task id to task record.
pub struct TaskRegistry {
    tasks: RwLock<HashMap<TaskId, DownloadTask>>,
    retention: Duration,
}

impl TaskRegistry {
    /// Create an empty registry with the given terminal-task retention window.
    pub fn new(retention: Duration) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Insert a new task record.
    pub async fn insert(&self, task: DownloadTask) {
        let mut tasks = self.tasks.write().await;
        tasks.insert(task.task_id.clone(), task);
    }

    /// Snapshot a task record by id.
    pub async fn get(&self, id: &TaskId) -> Option<DownloadTask> {
        let tasks = self.tasks.read().await;
        tasks.get(id).cloned()
    }

    /// Mutate a task record under the write lock.
    ///
    /// All fields touched by the closure change atomically with respect to
    /// readers; this is what keeps `progress` and `downloaded_items`
    /// consistent in snapshots. Returns false if the id is unknown.
    pub async fn update<F>(&self, id: &TaskId, mutate: F) -> bool
    where
        F: FnOnce(&mut DownloadTask),
    {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(id) {
            Some(task) => {
                mutate(task);
                true
            }
            None => false,
        }
    }

    /// Remove a task record, returning it if present.
    pub async fn remove(&self, id: &TaskId) -> Option<DownloadTask> {
        let mut tasks = self.tasks.write().await;
        tasks.remove(id)
    }

    /// Number of tracked tasks.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Whether the registry is empty.
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Evict terminal tasks whose retention window has elapsed as of `now`.
    ///
    /// Returns the evicted ids so the caller can emit events. Non-terminal
    /// tasks and recently finished tasks are untouched.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<TaskId> {
        let retention = match chrono::Duration::from_std(self.retention) {
            Ok(d) => d,
            Err(_) => return Vec::new(),
        };

        let mut tasks = self.tasks.write().await;
        let expired: Vec<TaskId> = tasks
            .values()
            .filter(|t| {
                t.status.is_terminal()
                    && t.finished_at
                        .is_some_and(|finished| finished + retention <= now)
            })
            .map(|t| t.task_id.clone())
            .collect();

        for id in &expired {
            tasks.remove(id);
        }
        expired
    }

    /// Spawn the background eviction sweeper.
    ///
    /// Runs `sweep_expired` every `interval` until `cancel` fires, emitting a
    /// [`Event::TaskEvicted`] per removal.
    pub fn spawn_sweeper(
        registry: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
        event_tx: tokio::sync::broadcast::Sender<Event>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a fresh downloader
            // does not sweep before anything can finish.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Registry sweeper stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        let evicted = registry.sweep_expired(Utc::now()).await;
                        if !evicted.is_empty() {
                            tracing::info!(count = evicted.len(), "Evicted expired tasks");
                        }
                        for task_id in evicted {
                            event_tx.send(Event::TaskEvicted { task_id }).ok();
                        }
                    }
                }
            }
        })
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DownloadOptions, TaskStatus};

    fn make_task(id: &str) -> DownloadTask {
        DownloadTask::new(TaskId::from(id), "user-1", &DownloadOptions::default())
    }

    #[tokio::test]
    async fn insert_then_get_returns_snapshot() {
        let registry = TaskRegistry::new(Duration::from_secs(3600));
        registry.insert(make_task("t-1")).await;

        let snapshot = registry.get(&TaskId::from("t-1")).await.unwrap();
        assert_eq!(snapshot.status, TaskStatus::Pending);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn get_unknown_id_is_none() {
        let registry = TaskRegistry::new(Duration::from_secs(3600));
        assert!(registry.get(&TaskId::from("missing")).await.is_none());
    }

    #[tokio::test]
    async fn update_mutates_counters_together() {
        let registry = TaskRegistry::new(Duration::from_secs(3600));
        registry.insert(make_task("t-1")).await;

        let updated = registry
            .update(&TaskId::from("t-1"), |task| {
                task.downloaded_items = 40;
                task.progress = 40.0;
            })
            .await;
        assert!(updated);

        let snapshot = registry.get(&TaskId::from("t-1")).await.unwrap();
        assert_eq!(
            (snapshot.downloaded_items, snapshot.progress),
            (40, 40.0),
            "both counters must appear updated in the same snapshot"
        );
    }

    #[tokio::test]
    async fn update_unknown_id_returns_false() {
        let registry = TaskRegistry::new(Duration::from_secs(3600));
        let updated = registry
            .update(&TaskId::from("missing"), |task| task.progress = 1.0)
            .await;
        assert!(!updated);
    }

    #[tokio::test]
    async fn sweep_evicts_only_expired_terminal_tasks() {
        let registry = TaskRegistry::new(Duration::from_secs(3600));

        // Running task, should never be swept
        registry.insert(make_task("running")).await;
        registry
            .update(&TaskId::from("running"), |t| {
                t.status = TaskStatus::Running
            })
            .await;

        // Terminal task finished two hours ago — past retention
        let mut old = make_task("old");
        old.finish(TaskStatus::Completed, 100.0, None);
        old.finished_at = Some(Utc::now() - chrono::Duration::hours(2));
        registry.insert(old).await;

        // Terminal task finished just now — within retention
        let mut fresh = make_task("fresh");
        fresh.finish(TaskStatus::Failed, 0.0, Some("boom".into()));
        registry.insert(fresh).await;

        let evicted = registry.sweep_expired(Utc::now()).await;

        assert_eq!(evicted, vec![TaskId::from("old")]);
        assert!(registry.get(&TaskId::from("old")).await.is_none());
        assert!(registry.get(&TaskId::from("running")).await.is_some());
        assert!(registry.get(&TaskId::from("fresh")).await.is_some());
    }

    #[tokio::test]
    async fn sweep_on_empty_registry_is_noop() {
        let registry = TaskRegistry::new(Duration::from_secs(1));
        assert!(registry.sweep_expired(Utc::now()).await.is_empty());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn sweeper_task_evicts_and_emits_events() {
        let registry = Arc::new(TaskRegistry::new(Duration::from_millis(10)));
        let (event_tx, mut event_rx) = tokio::sync::broadcast::channel(16);
        let cancel = CancellationToken::new();

        let mut done = make_task("done");
        done.finish(TaskStatus::Completed, 100.0, None);
        registry.insert(done).await;

        let handle = TaskRegistry::spawn_sweeper(
            registry.clone(),
            Duration::from_millis(20),
            cancel.clone(),
            event_tx,
        );

        // Wait for the task to be evicted
        let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_secs(2);
        loop {
            if registry.is_empty().await {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "sweeper did not evict within 2s"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let event = event_rx.recv().await.unwrap();
        assert!(matches!(event, Event::TaskEvicted { task_id } if task_id == TaskId::from("done")));

        cancel.cancel();
        handle.await.unwrap();
    }
}
