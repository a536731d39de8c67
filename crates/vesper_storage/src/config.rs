//! Storage backend selection.

use crate::{FileSystemStore, MediaStore, ObjectStore};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use vesper_error::{StorageError, StorageErrorKind};

/// `[storage]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// HTTP bucket
    Object {
        /// Storage API root
        base_url: String,
        /// Bucket name
        bucket: String,
        /// Environment variable holding the service key
        api_key_env: String,
    },
    /// Local directory
    Filesystem {
        /// Directory objects are written to
        root: PathBuf,
        /// URL the directory is served at
        public_base_url: String,
    },
}

/// Builds the configured backend.
///
/// # Errors
///
/// Returns [`StorageErrorKind::InvalidConfig`] when the object store key is
/// not set.
pub fn build_store(config: &StorageConfig) -> Result<Arc<dyn MediaStore>, StorageError> {
    match config {
        StorageConfig::Object {
            base_url,
            bucket,
            api_key_env,
        } => {
            let api_key = std::env::var(api_key_env)
                .ok()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                    StorageError::new(StorageErrorKind::InvalidConfig(format!(
                        "{} is not set",
                        api_key_env
                    )))
                })?;
            Ok(Arc::new(ObjectStore::new(base_url.clone(), bucket.clone(), api_key)))
        }
        StorageConfig::Filesystem {
            root,
            public_base_url,
        } => Ok(Arc::new(FileSystemStore::new(
            root.clone(),
            public_base_url.clone(),
        ))),
    }
}
