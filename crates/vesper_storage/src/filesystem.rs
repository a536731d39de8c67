//! Local directory backend.

use crate::MediaStore;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use vesper_error::{StorageError, StorageErrorKind};

/// Stores objects below a root directory served at `public_base_url`.
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    root: PathBuf,
    public_base_url: String,
}

impl FileSystemStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if path.is_empty() || escapes {
            return Err(StorageError::new(StorageErrorKind::InvalidConfig(format!(
                "refusing path outside store root: {}",
                path
            ))));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStore for FileSystemStore {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::new(StorageErrorKind::Io(e.to_string())))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
            .map_err(|e| {
                StorageError::new(StorageErrorKind::Io(format!(
                    "{}: {}",
                    target.display(),
                    e
                )))
            })?;
        file.write_all(&bytes)
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::Io(e.to_string())))?;
        file.flush()
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::Io(e.to_string())))?;

        Ok(format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            path
        ))
    }

    fn backend_name(&self) -> &str {
        "filesystem"
    }
}
