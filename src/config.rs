//! Configuration types for douyin-dl

use serde::{Deserialize, Serialize};
use std::{net::IpAddr, net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Content platform client configuration
///
/// Groups settings for talking to the Douyin web API: base URL, identification
/// headers, and transport options. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DouyinConfig {
    /// Base URL of the platform web API (default: "https://www.douyin.com")
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Base URL of the webcast (live room) API
    /// (default: "https://webcast.amemv.com")
    #[serde(default = "default_webcast_base")]
    pub webcast_base: String,

    /// Cookie header value for authenticated requests (default: empty)
    #[serde(default)]
    pub cookie: String,

    /// User-Agent header (default: a desktop browser UA)
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Referer header (default: "https://www.douyin.com/")
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Optional HTTP(S) proxy URL
    #[serde(default)]
    pub proxy: Option<String>,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for DouyinConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            webcast_base: default_webcast_base(),
            cookie: String::new(),
            user_agent: default_user_agent(),
            referer: default_referer(),
            proxy: None,
            request_timeout: default_request_timeout(),
        }
    }
}

/// Download behavior configuration (workspace, pagination, naming)
///
/// Groups settings related to how content pages are walked and materialised
/// to disk. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Scratch workspace root; each task gets its own subdirectory
    /// (default: "./temp_downloads")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Items requested per content page (default: 100)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Delay between content pages to stay polite (default: 5 seconds)
    #[serde(default = "default_page_delay", with = "duration_serde")]
    pub page_delay: Duration,

    /// Filename template for materialised media (default: "{create}_{desc}")
    #[serde(default = "default_naming_template")]
    pub naming_template: String,

    /// Retry behavior for transient fetch/upload failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            page_size: default_page_size(),
            page_delay: default_page_delay(),
            naming_template: default_naming_template(),
            retry: RetryConfig::default(),
        }
    }
}

/// Task registry retention configuration
///
/// Terminal tasks stay pollable for `task_retention` after finishing, then a
/// periodic sweep evicts them. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RegistryConfig {
    /// How long a terminal task remains pollable (default: 1 hour)
    #[serde(default = "default_task_retention", with = "duration_serde")]
    pub task_retention: Duration,

    /// Interval between eviction sweeps (default: 60 seconds)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    pub sweep_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            task_retention: default_task_retention(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// Object storage configuration
///
/// Targets an S3-compatible HTTP gateway: objects are PUT to
/// `{endpoint}/{bucket}/{path}`. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// Gateway endpoint (default: "http://127.0.0.1:9000")
    #[serde(default = "default_storage_endpoint")]
    pub endpoint: String,

    /// Bucket name (default: "ugc")
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Optional bearer token for the gateway
    #[serde(default)]
    pub api_token: Option<String>,

    /// Source tag recorded in object metadata (default: "douyin")
    #[serde(default = "default_source_tag")]
    pub source_tag: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: default_storage_endpoint(),
            bucket: default_bucket(),
            api_token: None,
            source_tag: default_source_tag(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Main configuration for DouyinDownloader
///
/// Fields are organized into logical sub-configs:
/// - [`douyin`](DouyinConfig) — platform client (base URL, headers, proxy)
/// - [`download`](DownloadConfig) — workspace, pagination, naming, retry
/// - [`registry`](RegistryConfig) — terminal task retention and sweeping
/// - [`storage`](StorageConfig) — object storage gateway
/// - [`server`](ServerIntegrationConfig) — REST API integration
///
/// The download, registry, and server sub-configs are flattened for a stable
/// flat JSON/TOML representation.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Platform client settings
    #[serde(default)]
    pub douyin: DouyinConfig,

    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// Task registry retention settings
    #[serde(flatten)]
    pub registry: RegistryConfig,

    /// Object storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// API and external server integration
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

/// External server integration configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Per-IP rate limiting configuration for the REST API
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RateLimitConfig {
    /// Enable rate limiting (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Sustained requests per second per client IP (default: 10)
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Burst allowance above the sustained rate (default: 20)
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,

    /// Paths exempt from rate limiting, matched by prefix
    /// (default: health and event stream)
    #[serde(default = "default_exempt_paths")]
    pub exempt_paths: Vec<String>,

    /// Client IPs exempt from rate limiting (default: none)
    #[serde(default)]
    pub exempt_ips: Vec<IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: default_requests_per_second(),
            burst_size: default_burst_size(),
            exempt_paths: default_exempt_paths(),
            exempt_ips: Vec::new(),
        }
    }
}

// Default value functions for serde

fn default_api_base() -> String {
    "https://www.douyin.com".to_string()
}

fn default_webcast_base() -> String {
    "https://webcast.amemv.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}

fn default_referer() -> String {
    "https://www.douyin.com/".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./temp_downloads")
}

fn default_page_size() -> usize {
    100
}

fn default_page_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_naming_template() -> String {
    "{create}_{desc}".to_string()
}

fn default_task_retention() -> Duration {
    Duration::from_secs(3600)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_storage_endpoint() -> String {
    "http://127.0.0.1:9000".to_string()
}

fn default_bucket() -> String {
    "ugc".to_string()
}

fn default_source_tag() -> String {
    "douyin".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    "127.0.0.1:8000"
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8000)))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_burst_size() -> u32 {
    20
}

fn default_exempt_paths() -> Vec<String> {
    vec!["/api/v1/health".to_string(), "/api/v1/events".to_string()]
}

// Duration serialization helper (seconds as integer)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
