//! Creator handlers: profile lookup and content download operations.

use crate::api::AppState;
use crate::error::{Error, Result};
use crate::types::{DownloadOptions, DownloadReport, LiveStatus, TaskId, UserProfile};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// GET /users/:user_id - Creator profile
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "Platform user id (sec_user_id)")
    ),
    responses(
        (status = 200, description = "Creator profile", body = crate::types::UserProfile),
        (status = 404, description = "User not found", body = crate::error::ApiError),
        (status = 502, description = "Upstream platform error", body = crate::error::ApiError)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfile>> {
    let profile = state.downloader.get_user_info(&user_id).await?;
    Ok(Json(profile))
}

/// GET /users/:user_id/livestream - Creator livestream status
#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/livestream",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "Platform user id (sec_user_id)")
    ),
    responses(
        (status = 200, description = "Livestream status", body = crate::types::LiveStatus),
        (status = 404, description = "User or live room not found", body = crate::error::ApiError),
        (status = 502, description = "Upstream platform error", body = crate::error::ApiError)
    )
)]
pub async fn get_user_livestream(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<LiveStatus>> {
    let status = state.downloader.get_live_status(&user_id).await?;
    Ok(Json(status))
}

/// POST /users/:user_id/content:download - Submit a bulk content download
///
/// Always accepted when the request is well formed; the run proceeds in the
/// background and its outcome is observed by polling the returned operation.
#[utoipa::path(
    post,
    path = "/api/v1/users/{user_id}/content:download",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "Platform user id (sec_user_id)")
    ),
    request_body(content = DownloadOptions, description = "Download options (all fields optional)"),
    responses(
        (status = 202, description = "Download accepted", body = crate::types::DownloadReport),
        (status = 400, description = "Invalid options", body = crate::error::ApiError)
    )
)]
pub async fn start_content_download(
    State(state): State<AppState>,
    // The router reads the `:download` verb suffix of the route as a second
    // capture; only the user id is meaningful.
    Path((user_id, _verb)): Path<(String, String)>,
    options: Option<Json<DownloadOptions>>,
) -> Result<impl IntoResponse> {
    let options = options.map(|Json(o)| o).unwrap_or_default();

    if options.max_items == Some(0) {
        return Err(Error::Config {
            message: "max_items must be at least 1".to_string(),
            key: Some("max_items".to_string()),
        });
    }
    if !options.include_posts && !options.include_likes {
        return Err(Error::Config {
            message: "at least one of include_posts and include_likes must be enabled".to_string(),
            key: Some("include_posts".to_string()),
        });
    }

    let task_id = state.downloader.start_download(user_id, options).await;
    let report = state.downloader.get_download_status(&task_id).await?;

    Ok((StatusCode::ACCEPTED, Json(report)))
}

/// GET /users/operations/:operation_id - Poll a download operation
#[utoipa::path(
    get,
    path = "/api/v1/users/operations/{operation_id}",
    tag = "users",
    params(
        ("operation_id" = String, Path, description = "Operation id returned at submission")
    ),
    responses(
        (status = 200, description = "Current operation report", body = crate::types::DownloadReport),
        (status = 404, description = "Unknown or evicted operation", body = crate::error::ApiError)
    )
)]
pub async fn get_operation_status(
    State(state): State<AppState>,
    Path(operation_id): Path<String>,
) -> Result<Json<DownloadReport>> {
    let report = state
        .downloader
        .get_download_status(&TaskId::from(operation_id))
        .await?;
    Ok(Json(report))
}
