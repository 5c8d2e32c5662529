// crates/core/src/publish/files.rs
//! Materialize a generated project on disk.

use std::path::{Component, Path, PathBuf};

use super::PublishError;
use crate::llm::FileInfo;

/// Write every file under `base_dir`, creating parent directories.
///
/// Paths must be relative and stay inside `base_dir`.
pub async fn write_project_files(base_dir: &Path, files: &[FileInfo]) -> Result<(), PublishError> {
    for file in files {
        let full_path = resolve(base_dir, &file.path)?;
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PublishError::Io {
                    path: parent.display().to_string(),
                    source,
                })?;
        }
        tokio::fs::write(&full_path, &file.content)
            .await
            .map_err(|source| PublishError::Io {
                path: full_path.display().to_string(),
                source,
            })?;
    }
    tracing::debug!(dir = %base_dir.display(), files = files.len(), "Project files written");
    Ok(())
}

fn resolve(base_dir: &Path, relative: &str) -> Result<PathBuf, PublishError> {
    let path = Path::new(relative);
    let safe = !relative.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe {
        return Err(PublishError::InvalidPath(relative.to_string()));
    }
    Ok(base_dir.join(path))
}
