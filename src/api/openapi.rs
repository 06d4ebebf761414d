//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the douyin-dl REST API using utoipa
//! for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the douyin-dl REST API
///
/// The spec can be accessed via:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "douyin-dl REST API",
        version = "0.1.0",
        description = "REST API for bulk-downloading Douyin creator content and relaying it into object storage",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000/api/v1", description = "Local development server")
    ),
    paths(
        // Users
        crate::api::routes::get_user,
        crate::api::routes::get_user_livestream,
        crate::api::routes::start_content_download,
        crate::api::routes::get_operation_status,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
        crate::api::routes::shutdown,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::TaskId,
        crate::types::TaskStatus,
        crate::types::DownloadOptions,
        crate::types::DownloadReport,
        crate::types::UserProfile,
        crate::types::LiveRoomInfo,
        crate::types::LiveStatus,
        crate::types::Event,

        // Config types from config.rs
        crate::config::Config,
        crate::config::DouyinConfig,
        crate::config::DownloadConfig,
        crate::config::RegistryConfig,
        crate::config::StorageConfig,
        crate::config::RetryConfig,
        crate::config::ApiConfig,
        crate::config::RateLimitConfig,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "users", description = "Creator profiles and bulk content download operations"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events, shutdown"),
    )
)]
pub struct ApiDoc;
