//! Core types for douyin-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unique identifier for a download task (UUID v4, opaque to callers)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a fresh random task id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Download task status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Accepted, not yet started
    Pending,
    /// Actively paginating and relaying content
    Running,
    /// All declared content downloaded and relayed
    Completed,
    /// Finished with fewer items than declared
    Partial,
    /// Aborted by an unrecoverable error
    Failed,
}

impl TaskStatus {
    /// Whether this status is terminal (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Partial | TaskStatus::Failed
        )
    }

    /// Lowercase string form matching the serialized representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Partial => "partial",
            TaskStatus::Failed => "failed",
        }
    }
}

/// Options controlling what a download task fetches
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadOptions {
    /// Include the creator's own posts (default: true)
    #[serde(default = "default_true")]
    pub include_posts: bool,

    /// Include the creator's liked content (default: false)
    #[serde(default)]
    pub include_likes: bool,

    /// Cap on the number of items to download (None = everything)
    #[serde(default)]
    pub max_items: Option<u64>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            include_posts: true,
            include_likes: false,
            max_items: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Registry record for a single download task
///
/// `progress` and `downloaded_items` are only ever mutated together under the
/// registry's write lock, so a snapshot never shows one without the other.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadTask {
    /// Task identifier
    pub task_id: TaskId,
    /// Platform user id the task downloads from
    pub user_id: String,
    /// Current lifecycle status
    pub status: TaskStatus,
    /// Completion percentage (0.0 to 100.0)
    pub progress: f64,
    /// Declared content count, recorded once after the profile fetch
    pub total_items: u64,
    /// Items downloaded so far (monotonically increasing)
    pub downloaded_items: u64,
    /// Error message for failed/partial outcomes
    pub error: Option<String>,
    /// Whether posts are included
    pub include_posts: bool,
    /// Whether likes are included
    pub include_likes: bool,
    /// Optional item cap
    pub max_items: Option<u64>,
    /// When the task was accepted
    pub started_at: DateTime<Utc>,
    /// When the task reached a terminal status (drives registry eviction)
    pub finished_at: Option<DateTime<Utc>>,
}

impl DownloadTask {
    /// Create a fresh pending task record
    pub fn new(task_id: TaskId, user_id: impl Into<String>, options: &DownloadOptions) -> Self {
        Self {
            task_id,
            user_id: user_id.into(),
            status: TaskStatus::Pending,
            progress: 0.0,
            total_items: 0,
            downloaded_items: 0,
            error: None,
            include_posts: options.include_posts,
            include_likes: options.include_likes,
            max_items: options.max_items,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Set a terminal status with its progress and optional error message.
    ///
    /// A task that is already terminal is left untouched.
    pub fn finish(&mut self, status: TaskStatus, progress: f64, error: Option<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        self.progress = progress;
        self.error = error;
        self.finished_at = Some(Utc::now());
    }
}

/// Snapshot of a task returned to API consumers
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadReport {
    /// Task identifier to poll with
    pub task_id: TaskId,
    /// Current status
    pub status: TaskStatus,
    /// Human-readable status message
    pub message: String,
    /// Completion percentage (0.0 to 100.0)
    pub progress: f64,
    /// Declared content count (0 until the profile fetch completes)
    pub total_items: u64,
    /// Items downloaded so far
    pub downloaded_items: u64,
    /// Error message, if the task failed or fell short
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&DownloadTask> for DownloadReport {
    fn from(task: &DownloadTask) -> Self {
        let message = match task.status {
            TaskStatus::Pending => "Download queued".to_string(),
            TaskStatus::Running => "Download in progress".to_string(),
            TaskStatus::Completed => "Download completed".to_string(),
            TaskStatus::Partial => "Download finished with missing items".to_string(),
            TaskStatus::Failed => "Download failed".to_string(),
        };
        Self {
            task_id: task.task_id.clone(),
            status: task.status,
            message,
            progress: task.progress,
            total_items: task.total_items,
            downloaded_items: task.downloaded_items,
            error: task.error.clone(),
        }
    }
}

/// Creator profile as reported by the platform
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    /// Platform user id
    pub user_id: String,
    /// Display name; an empty nickname means the profile does not resolve
    pub nickname: String,
    /// Avatar image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Profile bio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Accounts this creator follows
    pub following_count: i64,
    /// Follower count
    pub follower_count: i64,
    /// Total likes received across all content
    pub total_favorited: i64,
    /// Whether the creator is currently live
    pub is_living: bool,
    /// Live room id when live
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<i64>,
    /// Declared content count (drives total_items)
    pub post_count: u64,
}

/// Live room snapshot from the platform's webcast API
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LiveRoomInfo {
    /// Webcast room id
    pub room_id: i64,
    /// Room title
    pub title: String,
    /// Whether the stream is currently live
    pub is_live: bool,
    /// Raw platform status code (2 while live)
    pub status: i64,
    /// Current viewer count
    pub viewer_count: i64,
    /// Best available HLS stream URL while live
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
}

/// Livestream status for a creator, combining the profile and room lookups
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LiveStatus {
    /// Platform user id
    pub user_id: String,
    /// Whether the creator is currently streaming
    pub is_living: bool,
    /// Room snapshot, present when a live room resolves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<LiveRoomInfo>,
}

/// One downloadable content item from a paginated listing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentItem {
    /// Platform item id
    pub item_id: String,
    /// Item description / caption
    pub description: String,
    /// Creation time (unix seconds)
    pub created_at: i64,
    /// Media URLs to materialise (one per file)
    pub media_urls: Vec<String>,
}

/// One page of a creator's content listing
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContentPage {
    /// Items on this page (empty page terminates pagination)
    pub items: Vec<ContentItem>,
    /// Cursor for the next page as reported by the platform
    pub cursor: u64,
    /// Whether the platform claims more pages exist
    pub has_more: bool,
}

/// Event emitted during the download task lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task accepted and queued
    TaskQueued {
        /// Task identifier
        task_id: TaskId,
        /// Platform user id
        user_id: String,
    },

    /// Task transitioned to running
    TaskStarted {
        /// Task identifier
        task_id: TaskId,
    },

    /// Progress update after a relayed batch
    TaskProgress {
        /// Task identifier
        task_id: TaskId,
        /// Completion percentage (0.0 to 100.0)
        percent: f64,
        /// Items downloaded so far
        downloaded: u64,
        /// Declared content count
        total: u64,
    },

    /// Task finished with all declared content
    TaskCompleted {
        /// Task identifier
        task_id: TaskId,
        /// Items downloaded
        downloaded: u64,
        /// Declared content count
        total: u64,
    },

    /// Task finished short of the declared count
    TaskPartial {
        /// Task identifier
        task_id: TaskId,
        /// Items downloaded
        downloaded: u64,
        /// Declared content count
        total: u64,
    },

    /// Task aborted by an error
    TaskFailed {
        /// Task identifier
        task_id: TaskId,
        /// Error message
        error: String,
    },

    /// Terminal task evicted from the registry after its retention window
    TaskEvicted {
        /// Task identifier
        task_id: TaskId,
    },

    /// Downloader is shutting down
    Shutdown,
}
