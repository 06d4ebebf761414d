//! Utility functions for filenames and workspace cleanup

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static NON_ASCII: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"[^\x00-\x7F]+").expect("static regex")
});

static FORBIDDEN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r#"[<>:"/\\|?*]"#).expect("static regex")
});

static UNDERSCORE_RUNS: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"_+").expect("static regex")
});

/// Sanitize a string for use as a filename on any filesystem.
///
/// Strips non-ASCII characters, replaces filesystem-reserved characters with
/// underscores, collapses runs of underscores, and trims leading/trailing
/// underscores and spaces. An input that sanitizes to nothing becomes
/// "untitled".
pub fn sanitize_filename(name: &str) -> String {
    let ascii = NON_ASCII.replace_all(name, "");
    let replaced = FORBIDDEN.replace_all(&ascii, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches(|c| c == '_' || c == ' ');

    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Recursively collect all regular files under `dir`, depth-first.
///
/// Missing or unreadable directories yield an empty result rather than an
/// error; the relay loop treats an unreadable workspace as "nothing to do".
pub async fn collect_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        let Ok(mut entries) = tokio::fs::read_dir(&current).await else {
            continue;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            match entry.file_type().await {
                Ok(file_type) if file_type.is_dir() => stack.push(path),
                Ok(file_type) if file_type.is_file() => files.push(path),
                _ => {}
            }
        }
    }

    files
}

/// Best-effort recursive removal of a scratch workspace.
///
/// Failures are logged and swallowed: cleanup must never change the outcome
/// of a download run.
pub async fn purge_workspace(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            tracing::debug!(path = %dir.display(), "Workspace purged");
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "Failed to purge workspace");
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // sanitize_filename
    // -----------------------------------------------------------------------

    #[test]
    fn sanitize_strips_non_ascii() {
        assert_eq!(sanitize_filename("日常vlog daily"), "vlog daily");
    }

    #[test]
    fn sanitize_replaces_reserved_characters() {
        assert_eq!(sanitize_filename("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_filename("what?*"), "what");
    }

    #[test]
    fn sanitize_collapses_underscore_runs() {
        assert_eq!(sanitize_filename("a//b??c"), "a_b_c");
    }

    #[test]
    fn sanitize_trims_edges() {
        assert_eq!(sanitize_filename("  _name_  "), "name");
    }

    #[test]
    fn sanitize_empty_input_falls_back_to_untitled() {
        assert_eq!(sanitize_filename(""), "untitled");
        assert_eq!(sanitize_filename("你好世界"), "untitled");
        assert_eq!(sanitize_filename("///"), "untitled");
    }

    #[test]
    fn sanitize_keeps_plain_names_unchanged() {
        assert_eq!(
            sanitize_filename("1700000000_cat video"),
            "1700000000_cat video"
        );
    }

    // -----------------------------------------------------------------------
    // collect_files / purge_workspace
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn collect_files_walks_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("top.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("a/mid.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("a/b/deep.png"), b"x").unwrap();

        let mut names: Vec<String> = collect_files(dir.path())
            .await
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();

        assert_eq!(names, vec!["deep.png", "mid.jpg", "top.mp4"]);
    }

    #[tokio::test]
    async fn collect_files_on_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(collect_files(&missing).await.is_empty());
    }

    #[tokio::test]
    async fn purge_workspace_removes_tree() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().join("task-1");
        std::fs::create_dir_all(workspace.join("sub")).unwrap();
        std::fs::write(workspace.join("sub/file.mp4"), b"x").unwrap();

        purge_workspace(&workspace).await;

        assert!(!workspace.exists());
    }

    #[tokio::test]
    async fn purge_workspace_tolerates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        purge_workspace(&dir.path().join("never-created")).await;
    }
}
