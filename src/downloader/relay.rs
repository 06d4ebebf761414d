//! Workspace-to-bucket relay
//!
//! After each materialised batch the scratch workspace is scanned and every
//! file is pushed to object storage. A local file is deleted only once its
//! upload succeeded; a file whose upload keeps failing stays on disk, is
//! logged, and is swept away with the workspace at the end of the run.

use std::path::Path;

use crate::config::RetryConfig;
use crate::retry::with_retry;
use crate::storage::{content_type_for_file, metadata_for, object_path, ContentCategory, ObjectStore};
use crate::utils::collect_files;

/// Upload every file under `workspace` and delete the local copies that made
/// it. Returns the number of files relayed.
pub async fn relay_workspace(
    store: &dyn ObjectStore,
    workspace: &Path,
    user_id: &str,
    author: &str,
    category: ContentCategory,
    source_tag: &str,
    retry: &RetryConfig,
) -> u64 {
    let mut relayed = 0;

    for local in collect_files(workspace).await {
        let Some(filename) = local.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let content_type = content_type_for_file(&local);
        let remote_path = object_path(user_id, filename, &content_type);
        let metadata = metadata_for(author, category, &content_type, source_tag);

        let upload = with_retry(retry, || store.put(&local, &remote_path, &metadata)).await;
        match upload {
            Ok(()) => {
                if let Err(e) = tokio::fs::remove_file(&local).await {
                    tracing::warn!(path = %local.display(), error = %e, "Failed to delete relayed file");
                }
                relayed += 1;
            }
            Err(e) => {
                tracing::error!(
                    path = %local.display(),
                    remote = %remote_path,
                    error = %e,
                    "Upload failed, leaving file for workspace purge"
                );
            }
        }
    }

    if relayed > 0 {
        tracing::debug!(count = relayed, user_id, "Workspace batch relayed");
    }
    relayed
}
