//! Content source client
//!
//! [`ContentFetcher`] is the seam between the orchestration engine and the
//! platform: profile lookup, cursor-paginated content listing, and media
//! materialisation to disk. The production implementation,
//! [`DouyinFetcher`], talks to the Douyin web API over reqwest; tests inject
//! their own implementations.

use futures::StreamExt;
use serde::Deserialize;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::config::{DouyinConfig, DownloadConfig};
use crate::error::{Error, Result};
use crate::types::{ContentItem, ContentPage, LiveRoomInfo, UserProfile};
use crate::utils::sanitize_filename;

/// Parameters for one content page fetch.
#[derive(Clone, Copy, Debug)]
pub struct PageRequest<'a> {
    /// Platform user id
    pub user_id: &'a str,
    /// Cursor from the previous page (0 for the first page)
    pub cursor: u64,
    /// Items requested per page
    pub page_size: usize,
    /// Overall item cap for the run, if any
    pub max_items: Option<u64>,
    /// Fetch the liked-content listing instead of posts
    pub include_likes: bool,
}

/// Abstraction over the content platform, enabling testability.
#[async_trait::async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch a creator's profile. A profile the platform cannot resolve
    /// (no nickname) surfaces as [`Error::UserNotFound`].
    async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile>;

    /// Fetch one page of the creator's content listing.
    async fn fetch_page(&self, request: PageRequest<'_>) -> Result<ContentPage>;

    /// Materialise a batch of items to disk under `dest`.
    ///
    /// Individual media failures are logged and skipped; only a failure that
    /// prevents writing anything (e.g. the directory cannot be created)
    /// returns an error.
    async fn download_items(&self, items: &[ContentItem], dest: &Path) -> Result<()>;

    /// Fetch the state of a live room. A room the platform cannot resolve
    /// surfaces as [`Error::NotFound`].
    async fn fetch_room_info(&self, room_id: i64) -> Result<LiveRoomInfo>;
}

/// Production [`ContentFetcher`] backed by the Douyin web API.
pub struct DouyinFetcher {
    client: reqwest::Client,
    api_base: String,
    webcast_base: String,
    naming_template: String,
}

impl DouyinFetcher {
    /// Build a fetcher from platform and download configuration.
    pub fn new(douyin: &DouyinConfig, download: &DownloadConfig) -> Result<Self> {
        Url::parse(&douyin.api_base).map_err(|e| Error::Config {
            message: format!("invalid api_base '{}': {}", douyin.api_base, e),
            key: Some("douyin.api_base".to_string()),
        })?;
        Url::parse(&douyin.webcast_base).map_err(|e| Error::Config {
            message: format!("invalid webcast_base '{}': {}", douyin.webcast_base, e),
            key: Some("douyin.webcast_base".to_string()),
        })?;

        let mut headers = reqwest::header::HeaderMap::new();
        if !douyin.cookie.is_empty() {
            let value = reqwest::header::HeaderValue::from_str(&douyin.cookie).map_err(|e| {
                Error::Config {
                    message: format!("invalid cookie header: {}", e),
                    key: Some("douyin.cookie".to_string()),
                }
            })?;
            headers.insert(reqwest::header::COOKIE, value);
        }
        if let Ok(value) = reqwest::header::HeaderValue::from_str(&douyin.referer) {
            headers.insert(reqwest::header::REFERER, value);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(douyin.user_agent.clone())
            .default_headers(headers)
            .timeout(douyin.request_timeout);

        if let Some(proxy_url) = &douyin.proxy {
            let proxy = reqwest::Proxy::all(proxy_url.as_str()).map_err(|e| Error::Config {
                message: format!("invalid proxy '{}': {}", proxy_url, e),
                key: Some("douyin.proxy".to_string()),
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            api_base: douyin.api_base.trim_end_matches('/').to_string(),
            webcast_base: douyin.webcast_base.trim_end_matches('/').to_string(),
            naming_template: download.naming_template.clone(),
        })
    }

    /// Filename for one media URL of an item, following the naming template.
    fn item_filename(&self, item: &ContentItem, url: &str, index: usize) -> String {
        let base = self
            .naming_template
            .replace("{create}", &item.created_at.to_string())
            .replace("{desc}", &item.description);
        let base = sanitize_filename(&base);

        let extension = media_extension(url);
        if item.media_urls.len() > 1 {
            format!("{base}_{index}.{extension}")
        } else {
            format!("{base}.{extension}")
        }
    }
}

/// File extension inferred from a media URL (video by default).
fn media_extension(url: &str) -> &'static str {
    let path = url.split('?').next().unwrap_or(url);
    for ext in ["jpeg", "jpg", "png", "webp"] {
        if path.ends_with(&format!(".{ext}")) {
            return ext;
        }
    }
    "mp4"
}

// Wire formats for the platform's JSON responses. Only the fields we read.

#[derive(Deserialize)]
struct ProfileEnvelope {
    user: Option<RawUser>,
}

#[derive(Deserialize)]
struct RawUser {
    nickname: Option<String>,
    signature: Option<String>,
    avatar_larger: Option<RawUrlList>,
    #[serde(default)]
    following_count: i64,
    #[serde(default)]
    follower_count: i64,
    #[serde(default)]
    total_favorited: i64,
    #[serde(default)]
    aweme_count: u64,
    #[serde(default)]
    live_status: i64,
    room_id: Option<i64>,
}

#[derive(Deserialize)]
struct PageEnvelope {
    #[serde(default)]
    aweme_list: Vec<RawAweme>,
    #[serde(default)]
    max_cursor: u64,
    #[serde(default)]
    has_more: i64,
}

#[derive(Deserialize)]
struct RawAweme {
    aweme_id: String,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    create_time: i64,
    video: Option<RawVideo>,
    images: Option<Vec<RawUrlList>>,
}

#[derive(Deserialize)]
struct RawVideo {
    play_addr: Option<RawUrlList>,
}

#[derive(Deserialize)]
struct RawUrlList {
    #[serde(default)]
    url_list: Vec<String>,
}

#[derive(Deserialize)]
struct RoomEnvelope {
    data: Option<RoomData>,
}

#[derive(Deserialize)]
struct RoomData {
    room: Option<RawRoom>,
}

#[derive(Deserialize)]
struct RawRoom {
    #[serde(default)]
    id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    status: i64,
    #[serde(default)]
    user_count: i64,
    stream_url: Option<RawStreamUrl>,
}

#[derive(Deserialize)]
struct RawStreamUrl {
    #[serde(default)]
    hls_pull_url_map: std::collections::HashMap<String, String>,
}

impl RawAweme {
    /// Pick the downloadable URLs: one per image for photo posts, the first
    /// play address for videos.
    fn media_urls(&self) -> Vec<String> {
        if let Some(images) = &self.images {
            return images
                .iter()
                .filter_map(|img| img.url_list.first().cloned())
                .collect();
        }
        self.video
            .as_ref()
            .and_then(|v| v.play_addr.as_ref())
            .and_then(|addr| addr.url_list.first().cloned())
            .into_iter()
            .collect()
    }
}

#[async_trait::async_trait]
impl ContentFetcher for DouyinFetcher {
    async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile> {
        let url = format!("{}/aweme/v1/web/user/profile/other/", self.api_base);
        let response = self
            .client
            .get(&url)
            .query(&[("sec_user_id", user_id)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "profile fetch returned {} for user {}",
                response.status(),
                user_id
            )));
        }

        let envelope: ProfileEnvelope = response.json().await?;
        let user = envelope
            .user
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;

        let nickname = user.nickname.unwrap_or_default();
        if nickname.is_empty() {
            return Err(Error::UserNotFound(user_id.to_string()));
        }

        Ok(UserProfile {
            user_id: user_id.to_string(),
            nickname,
            avatar_url: user
                .avatar_larger
                .and_then(|a| a.url_list.into_iter().next()),
            signature: user.signature.filter(|s| !s.is_empty()),
            following_count: user.following_count,
            follower_count: user.follower_count,
            total_favorited: user.total_favorited,
            is_living: user.live_status == 1,
            room_id: user.room_id.filter(|id| *id != 0),
            post_count: user.aweme_count,
        })
    }

    async fn fetch_page(&self, request: PageRequest<'_>) -> Result<ContentPage> {
        let endpoint = if request.include_likes {
            "/aweme/v1/web/aweme/favorite/"
        } else {
            "/aweme/v1/web/aweme/post/"
        };
        let url = format!("{}{}", self.api_base, endpoint);

        // Never request more than the remaining cap allows
        let count = match request.max_items {
            Some(cap) => (request.page_size as u64).min(cap).max(1),
            None => request.page_size as u64,
        };

        let response = self
            .client
            .get(&url)
            .query(&[
                ("sec_user_id", request.user_id.to_string()),
                ("max_cursor", request.cursor.to_string()),
                ("count", count.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "content page fetch returned {} at cursor {}",
                response.status(),
                request.cursor
            )));
        }

        let envelope: PageEnvelope = response.json().await?;
        let items = envelope
            .aweme_list
            .into_iter()
            .map(|aweme| ContentItem {
                media_urls: aweme.media_urls(),
                item_id: aweme.aweme_id,
                description: aweme.desc,
                created_at: aweme.create_time,
            })
            .collect();

        Ok(ContentPage {
            items,
            cursor: envelope.max_cursor,
            has_more: envelope.has_more != 0,
        })
    }

    async fn fetch_room_info(&self, room_id: i64) -> Result<LiveRoomInfo> {
        let url = format!("{}/webcast/room/reflow/info/", self.webcast_base);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("type_id", "0".to_string()),
                ("live_id", "1".to_string()),
                ("room_id", room_id.to_string()),
                ("app_id", "1128".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "room info fetch returned {} for room {}",
                response.status(),
                room_id
            )));
        }

        let envelope: RoomEnvelope = response.json().await?;
        let room = envelope
            .data
            .and_then(|d| d.room)
            .ok_or_else(|| Error::NotFound(format!("live room {room_id}")))?;

        // Status 2 means the stream is live
        let is_live = room.status == 2;
        let stream_url = room.stream_url.and_then(|s| {
            // Prefer the highest quality HLS variant
            s.hls_pull_url_map
                .get("FULL_HD1")
                .or_else(|| s.hls_pull_url_map.get("HD1"))
                .cloned()
        });

        Ok(LiveRoomInfo {
            room_id: if room.id != 0 { room.id } else { room_id },
            title: room.title,
            is_live,
            status: room.status,
            viewer_count: room.user_count,
            stream_url,
        })
    }

    async fn download_items(&self, items: &[ContentItem], dest: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dest).await?;

        for item in items {
            for (index, media_url) in item.media_urls.iter().enumerate() {
                let filename = self.item_filename(item, media_url, index);
                let path = dest.join(&filename);

                if let Err(e) = self.download_media(media_url, &path).await {
                    tracing::error!(
                        item_id = %item.item_id,
                        url = %media_url,
                        error = %e,
                        "Failed to download media, skipping"
                    );
                }
            }
        }

        Ok(())
    }
}

impl DouyinFetcher {
    /// Stream one media URL to a file on disk.
    async fn download_media(&self, url: &str, path: &Path) -> Result<()> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "media fetch returned {}",
                response.status()
            )));
        }

        let mut file = tokio::fs::File::create(path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(Error::Network)?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::debug!(path = %path.display(), "Media written");
        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher_for(server: &MockServer) -> DouyinFetcher {
        let douyin = DouyinConfig {
            api_base: server.uri(),
            ..DouyinConfig::default()
        };
        DouyinFetcher::new(&douyin, &DownloadConfig::default()).unwrap()
    }

    // -----------------------------------------------------------------------
    // fetch_profile
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn fetch_profile_maps_platform_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/aweme/v1/web/user/profile/other/"))
            .and(query_param("sec_user_id", "sec-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": {
                    "nickname": "creator",
                    "signature": "hello",
                    "avatar_larger": {"url_list": ["https://cdn.example.com/a.jpg"]},
                    "following_count": 10,
                    "follower_count": 2000,
                    "total_favorited": 99,
                    "aweme_count": 250,
                    "live_status": 1,
                    "room_id": 777
                }
            })))
            .mount(&server)
            .await;

        let profile = fetcher_for(&server).fetch_profile("sec-123").await.unwrap();

        assert_eq!(profile.nickname, "creator");
        assert_eq!(profile.post_count, 250);
        assert_eq!(profile.follower_count, 2000);
        assert!(profile.is_living);
        assert_eq!(profile.room_id, Some(777));
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://cdn.example.com/a.jpg")
        );
    }

    #[tokio::test]
    async fn fetch_profile_without_nickname_is_user_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/aweme/v1/web/user/profile/other/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": {"nickname": "", "aweme_count": 0}
            })))
            .mount(&server)
            .await;

        let err = fetcher_for(&server)
            .fetch_profile("ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UserNotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn fetch_profile_missing_user_is_user_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/aweme/v1/web/user/profile/other/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let err = fetcher_for(&server)
            .fetch_profile("ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UserNotFound(_)));
    }

    #[tokio::test]
    async fn fetch_profile_http_error_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/aweme/v1/web/user/profile/other/"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = fetcher_for(&server)
            .fetch_profile("sec-123")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(msg) if msg.contains("403")));
    }

    // -----------------------------------------------------------------------
    // fetch_page
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn fetch_page_maps_items_cursor_and_has_more() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/aweme/v1/web/aweme/post/"))
            .and(query_param("max_cursor", "0"))
            .and(query_param("count", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "aweme_list": [
                    {
                        "aweme_id": "v1",
                        "desc": "a video",
                        "create_time": 1700000000,
                        "video": {"play_addr": {"url_list": ["https://cdn.example.com/v1.mp4"]}}
                    },
                    {
                        "aweme_id": "p1",
                        "desc": "a photo set",
                        "create_time": 1700000100,
                        "images": [
                            {"url_list": ["https://cdn.example.com/p1a.webp"]},
                            {"url_list": ["https://cdn.example.com/p1b.webp"]}
                        ]
                    }
                ],
                "max_cursor": 1700000100,
                "has_more": 1
            })))
            .mount(&server)
            .await;

        let page = fetcher_for(&server)
            .fetch_page(PageRequest {
                user_id: "sec-123",
                cursor: 0,
                page_size: 100,
                max_items: None,
                include_likes: false,
            })
            .await
            .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.cursor, 1700000100);
        assert!(page.has_more);
        assert_eq!(
            page.items[0].media_urls,
            vec!["https://cdn.example.com/v1.mp4"]
        );
        assert_eq!(page.items[1].media_urls.len(), 2, "one URL per image");
    }

    #[tokio::test]
    async fn fetch_page_clamps_count_to_max_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/aweme/v1/web/aweme/post/"))
            .and(query_param("count", "30"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "aweme_list": [],
                "max_cursor": 0,
                "has_more": 0
            })))
            .mount(&server)
            .await;

        let page = fetcher_for(&server)
            .fetch_page(PageRequest {
                user_id: "sec-123",
                cursor: 0,
                page_size: 100,
                max_items: Some(30),
                include_likes: false,
            })
            .await
            .unwrap();

        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn fetch_page_uses_favorite_endpoint_for_likes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/aweme/v1/web/aweme/favorite/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "aweme_list": [],
                "max_cursor": 0,
                "has_more": 0
            })))
            .mount(&server)
            .await;

        let page = fetcher_for(&server)
            .fetch_page(PageRequest {
                user_id: "sec-123",
                cursor: 0,
                page_size: 100,
                max_items: None,
                include_likes: true,
            })
            .await
            .unwrap();
        assert!(page.items.is_empty());
    }

    // -----------------------------------------------------------------------
    // fetch_room_info
    // -----------------------------------------------------------------------

    fn fetcher_with_webcast(server: &MockServer) -> DouyinFetcher {
        let douyin = DouyinConfig {
            api_base: server.uri(),
            webcast_base: server.uri(),
            ..DouyinConfig::default()
        };
        DouyinFetcher::new(&douyin, &DownloadConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn fetch_room_info_maps_a_live_room() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/webcast/room/reflow/info/"))
            .and(query_param("room_id", "777"))
            .and(query_param("app_id", "1128"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "room": {
                        "id": 777,
                        "title": "evening stream",
                        "status": 2,
                        "user_count": 1500,
                        "stream_url": {
                            "hls_pull_url_map": {
                                "HD1": "https://pull.example.com/hd1.m3u8",
                                "FULL_HD1": "https://pull.example.com/full_hd1.m3u8"
                            }
                        }
                    }
                }
            })))
            .mount(&server)
            .await;

        let room = fetcher_with_webcast(&server)
            .fetch_room_info(777)
            .await
            .unwrap();

        assert_eq!(room.room_id, 777);
        assert_eq!(room.title, "evening stream");
        assert!(room.is_live);
        assert_eq!(room.viewer_count, 1500);
        assert_eq!(
            room.stream_url.as_deref(),
            Some("https://pull.example.com/full_hd1.m3u8"),
            "highest quality variant wins"
        );
    }

    #[tokio::test]
    async fn fetch_room_info_for_ended_stream_is_not_live() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/webcast/room/reflow/info/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"room": {"id": 777, "title": "done", "status": 4}}
            })))
            .mount(&server)
            .await;

        let room = fetcher_with_webcast(&server)
            .fetch_room_info(777)
            .await
            .unwrap();
        assert!(!room.is_live);
        assert!(room.stream_url.is_none());
    }

    #[tokio::test]
    async fn fetch_room_info_missing_room_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/webcast/room/reflow/info/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
            .mount(&server)
            .await;

        let err = fetcher_with_webcast(&server)
            .fetch_room_info(12)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(msg) if msg.contains("12")));
    }

    // -----------------------------------------------------------------------
    // download_items / naming
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn download_items_writes_named_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/v1.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"video-bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let item = ContentItem {
            item_id: "v1".into(),
            description: "cat video".into(),
            created_at: 1700000000,
            media_urls: vec![format!("{}/media/v1.mp4", server.uri())],
        };

        fetcher_for(&server)
            .download_items(&[item], dir.path())
            .await
            .unwrap();

        let expected = dir.path().join("1700000000_cat video.mp4");
        assert!(expected.exists(), "missing {}", expected.display());
        assert_eq!(std::fs::read(expected).unwrap(), b"video-bytes");
    }

    #[tokio::test]
    async fn download_items_skips_failed_media() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/broken.mp4"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let item = ContentItem {
            item_id: "b1".into(),
            description: "broken".into(),
            created_at: 1,
            media_urls: vec![format!("{}/media/broken.mp4", server.uri())],
        };

        // Per-file failure must not fail the batch
        fetcher_for(&server)
            .download_items(&[item], dir.path())
            .await
            .unwrap();
    }

    #[test]
    fn media_extension_recognizes_images_and_defaults_to_video() {
        assert_eq!(media_extension("https://x/a.jpg?sig=1"), "jpg");
        assert_eq!(media_extension("https://x/a.jpeg"), "jpeg");
        assert_eq!(media_extension("https://x/a.png"), "png");
        assert_eq!(media_extension("https://x/a.webp"), "webp");
        assert_eq!(media_extension("https://x/stream?id=5"), "mp4");
    }

    #[test]
    fn multi_image_items_get_indexed_filenames() {
        let douyin = DouyinConfig::default();
        let fetcher = DouyinFetcher::new(&douyin, &DownloadConfig::default()).unwrap();
        let item = ContentItem {
            item_id: "p1".into(),
            description: "set".into(),
            created_at: 5,
            media_urls: vec!["https://x/a.webp".into(), "https://x/b.webp".into()],
        };

        assert_eq!(fetcher.item_filename(&item, "https://x/a.webp", 0), "5_set_0.webp");
        assert_eq!(fetcher.item_filename(&item, "https://x/b.webp", 1), "5_set_1.webp");
    }
}
