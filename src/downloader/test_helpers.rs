//! Shared mock collaborators for downloader tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{ContentFetcher, PageRequest};
use crate::storage::{ObjectMetadata, ObjectStore};
use crate::types::{ContentItem, ContentPage, LiveRoomInfo, UserProfile};

/// Scripted [`ContentFetcher`]: responses are popped in order.
#[derive(Default)]
pub(crate) struct MockFetcher {
    pub profiles: Mutex<VecDeque<Result<UserProfile>>>,
    pub pages: Mutex<VecDeque<Result<ContentPage>>>,
    pub rooms: Mutex<VecDeque<Result<LiveRoomInfo>>>,
    /// Item counts of each materialised batch, in call order.
    pub batches: Mutex<Vec<usize>>,
}

impl MockFetcher {
    pub fn with_profile(profile: UserProfile) -> Self {
        let fetcher = Self::default();
        fetcher.profiles.lock().unwrap().push_back(Ok(profile));
        fetcher
    }

    pub fn with_profile_error(error: Error) -> Self {
        let fetcher = Self::default();
        fetcher.profiles.lock().unwrap().push_back(Err(error));
        fetcher
    }

    pub fn script_page(&self, page: Result<ContentPage>) {
        self.pages.lock().unwrap().push_back(page);
    }

    pub fn script_room(&self, room: Result<LiveRoomInfo>) {
        self.rooms.lock().unwrap().push_back(room);
    }
}

#[async_trait::async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile> {
        self.profiles
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Other(format!("no profile scripted for {user_id}"))))
    }

    async fn fetch_page(&self, request: PageRequest<'_>) -> Result<ContentPage> {
        self.pages.lock().unwrap().pop_front().unwrap_or_else(|| {
            // Unscripted pages read as an exhausted listing
            Ok(ContentPage {
                items: Vec::new(),
                cursor: request.cursor,
                has_more: false,
            })
        })
    }

    async fn download_items(&self, items: &[ContentItem], dest: &Path) -> Result<()> {
        self.batches.lock().unwrap().push(items.len());
        tokio::fs::create_dir_all(dest).await?;
        for item in items {
            tokio::fs::write(dest.join(format!("{}.mp4", item.item_id)), b"media").await?;
        }
        Ok(())
    }

    async fn fetch_room_info(&self, room_id: i64) -> Result<LiveRoomInfo> {
        self.rooms
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::NotFound(format!("live room {room_id}"))))
    }
}

/// Recording [`ObjectStore`] that accepts every upload.
#[derive(Default)]
pub(crate) struct MockStore {
    pub uploads: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl ObjectStore for MockStore {
    async fn put(
        &self,
        _local: &Path,
        remote_path: &str,
        _metadata: &ObjectMetadata,
    ) -> Result<()> {
        self.uploads.lock().unwrap().push(remote_path.to_string());
        Ok(())
    }
}

/// Profile with the given declared content count.
pub(crate) fn profile_with(post_count: u64) -> UserProfile {
    UserProfile {
        user_id: "sec-user".to_string(),
        nickname: "creator".to_string(),
        avatar_url: None,
        signature: None,
        following_count: 1,
        follower_count: 2,
        total_favorited: 3,
        is_living: false,
        room_id: None,
        post_count,
    }
}

/// A live room snapshot currently on air.
pub(crate) fn live_room(room_id: i64) -> LiveRoomInfo {
    LiveRoomInfo {
        room_id,
        title: "evening stream".to_string(),
        is_live: true,
        status: 2,
        viewer_count: 100,
        stream_url: Some("https://pull.test/full_hd1.m3u8".to_string()),
    }
}

/// A content page of `count` items with ids unique across `start`.
pub(crate) fn page_of(count: usize, start: usize, cursor: u64, has_more: bool) -> ContentPage {
    let items = (0..count)
        .map(|i| ContentItem {
            item_id: format!("item-{}", start + i),
            description: format!("post {}", start + i),
            created_at: (start + i) as i64,
            media_urls: vec![format!("https://cdn.test/item-{}.mp4", start + i)],
        })
        .collect();
    ContentPage {
        items,
        cursor,
        has_more,
    }
}

/// Configuration tuned for fast tests: no page delay, single-attempt retry,
/// workspace under the given temp dir.
pub(crate) fn test_config(temp_dir: &Path) -> Config {
    let mut config = Config::default();
    config.download.temp_dir = temp_dir.to_path_buf();
    config.download.page_delay = Duration::ZERO;
    config.download.retry.max_attempts = 1;
    config.download.retry.initial_delay = Duration::from_millis(1);
    config.registry.sweep_interval = Duration::from_secs(3600);
    config
}
