//! Storage trait.

use crate::object_path;
use async_trait::async_trait;
use tracing::debug;
use vesper_error::StorageError;

/// Durable, publicly readable object storage.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Writes `bytes` at `path` and returns the public URL.
    ///
    /// Implementations must refuse to overwrite an existing object.
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Backend label for logs.
    fn backend_name(&self) -> &str;

    /// Writes `bytes` under a fresh path in `owner`'s namespace.
    async fn put_unique(
        &self,
        owner: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let path = object_path(owner, content_type);
        debug!(backend = self.backend_name(), path = %path, size = bytes.len(), "Storing object");
        self.put(&path, bytes, content_type).await
    }
}
