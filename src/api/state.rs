//! Application state for the API server

use crate::{Config, DouyinDownloader};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned per request (cheap Arc clones); hands handlers the downloader
/// engine and the configuration it was started with.
#[derive(Clone)]
pub struct AppState {
    /// The download orchestration engine
    pub downloader: Arc<DouyinDownloader>,

    /// Configuration (read access only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<DouyinDownloader>, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }
}
