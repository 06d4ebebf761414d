//! Object storage relay target
//!
//! Downloaded media never stays on the node that fetched it: every file is
//! relayed into a bucket through [`ObjectStore`] and then deleted locally.
//! [`HttpObjectStore`] is the production implementation, a plain
//! PUT-per-object HTTP gateway with optional bearer auth and metadata
//! headers.

use std::path::Path;

use crate::config::StorageConfig;
use crate::error::{Error, Result};

/// Content category an object belongs to, used in object paths and metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentCategory {
    /// The creator's own posts
    Posts,
    /// Content the creator liked
    Likes,
}

impl ContentCategory {
    /// Lowercase label used in metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Likes => "likes",
        }
    }
}

/// Descriptive metadata stored alongside each object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Creator the content belongs to
    pub author: String,
    /// Content category
    pub category: ContentCategory,
    /// MIME type of the object body
    pub content_type: String,
    /// Origin platform tag
    pub source: String,
}

/// Abstraction over the object storage backend, enabling testability.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file to `remote_path`, with metadata.
    async fn put(&self, local: &Path, remote_path: &str, metadata: &ObjectMetadata) -> Result<()>;
}

/// MIME type for a downloaded media file, from its extension.
///
/// Image extensions map verbatim into the `image/` namespace; everything
/// else is treated as video.
pub fn content_type_for_file(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some(ext @ ("jpg" | "jpeg" | "png" | "webp")) => format!("image/{ext}"),
        _ => "video/mp4".to_string(),
    }
}

/// Bucket-relative path for an object: images and videos live in separate
/// prefixes under the creator's directory.
pub fn object_path(user_id: &str, filename: &str, content_type: &str) -> String {
    let kind = if content_type.starts_with("image/") {
        "images"
    } else {
        "videos"
    };
    format!("users/{user_id}/{kind}/{filename}")
}

/// Production [`ObjectStore`] speaking plain HTTP PUT to a storage gateway.
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    api_token: Option<String>,
}

impl HttpObjectStore {
    /// Build a store from storage configuration.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            api_token: config.api_token.clone(),
        })
    }

    fn object_url(&self, remote_path: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, remote_path)
    }
}

#[async_trait::async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, local: &Path, remote_path: &str, metadata: &ObjectMetadata) -> Result<()> {
        let body = tokio::fs::read(local).await?;
        let size = body.len();

        let mut request = self
            .client
            .put(self.object_url(remote_path))
            .header(reqwest::header::CONTENT_TYPE, &metadata.content_type)
            .header("x-meta-author", encode_header(&metadata.author))
            .header("x-meta-category", metadata.category.as_str())
            .header("x-meta-source", &metadata.source)
            .body(body);

        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::Storage(format!(
                "upload of {} returned {}",
                remote_path,
                response.status()
            )));
        }

        tracing::debug!(path = %remote_path, size, "Object uploaded");
        Ok(())
    }
}

/// Header values must be ASCII; creator names usually are not. Non-ASCII
/// bytes are percent-encoded so the metadata survives the wire.
fn encode_header(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_graphic() || byte == b' ' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// Metadata headers for one relayed file, derived from the run context.
pub fn metadata_for(
    author: &str,
    category: ContentCategory,
    content_type: &str,
    source_tag: &str,
) -> ObjectMetadata {
    ObjectMetadata {
        author: author.to_string(),
        category,
        content_type: content_type.to_string(),
        source: source_tag.to_string(),
    }
}
