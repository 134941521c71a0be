//! Project layout preparation used by `vinfer-selfcheck`.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::PipelineResult;

pub const PROJECT_DIRS: &[&str] = &["config", "videos", "results", "logs"];

/// Directories that get a `.gitkeep` so they survive an empty checkout.
const GITKEEP_DIRS: &[&str] = &["videos", "results"];

/// Create the standard project directories under `root`.
///
/// Returns the directories that did not exist before.
pub async fn ensure_layout(root: impl AsRef<Path>) -> PipelineResult<Vec<PathBuf>> {
    let root = root.as_ref();
    let mut created = Vec::new();

    for name in PROJECT_DIRS {
        let dir = root.join(name);
        if !fs::try_exists(&dir).await? {
            fs::create_dir_all(&dir).await?;
            created.push(dir);
        }
    }

    for name in GITKEEP_DIRS {
        let keep = root.join(name).join(".gitkeep");
        if !fs::try_exists(&keep).await? {
            fs::write(&keep, b"").await?;
        }
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_layout_is_idempotent() {
        let dir = TempDir::new().unwrap();

        let created = ensure_layout(dir.path()).await.unwrap();
        assert_eq!(created.len(), PROJECT_DIRS.len());
        assert!(dir.path().join("videos/.gitkeep").exists());
        assert!(dir.path().join("results/.gitkeep").exists());
        assert!(!dir.path().join("logs/.gitkeep").exists());

        let again = ensure_layout(dir.path()).await.unwrap();
        assert!(again.is_empty());
    }
}
