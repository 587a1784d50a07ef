//! Destination directory handling

use crate::error::MagdlError;
use magdl_types::Settings;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Resolve the destination for a download.
///
/// Falls back to the configured default directory and makes the result
/// absolute against the current working directory. Nothing is created here.
pub fn resolve_destination(
    requested: Option<&Path>,
    settings: &Settings,
) -> Result<PathBuf, MagdlError> {
    let path = requested.unwrap_or(&settings.download_dir);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

/// Make sure `path` exists as a directory and return its absolute form.
///
/// Issues a single `create_dir_all`, which also succeeds when the
/// directory is already there.
pub async fn ensure_directory(path: &Path) -> Result<PathBuf, MagdlError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    debug!("Ensuring download directory {}", absolute.display());
    fs::create_dir_all(&absolute)
        .await
        .map_err(|source| MagdlError::CreateDirectory {
            path: absolute.clone(),
            source,
        })?;

    Ok(absolute)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_default_is_absolute() {
        let settings = Settings::default();
        let resolved = resolve_destination(None, &settings).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("download"));
    }

    #[test]
    fn test_resolve_keeps_absolute_request() {
        let settings = Settings::default();
        let tmp = tempfile::tempdir().unwrap();
        let resolved = resolve_destination(Some(tmp.path()), &settings).unwrap();
        assert_eq!(resolved, tmp.path());
    }

    #[tokio::test]
    async fn test_ensure_directory_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("a").join("b");
        assert!(!target.exists());

        let created = ensure_directory(&target).await.unwrap();
        assert_eq!(created, target);
        assert!(created.is_dir());

        // Existing directory is fine
        ensure_directory(&target).await.unwrap();
    }

    #[tokio::test]
    async fn test_ensure_directory_reports_path_on_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();

        let err = ensure_directory(&file.join("sub")).await.unwrap_err();
        match err {
            MagdlError::CreateDirectory { path, .. } => assert_eq!(path, file.join("sub")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
