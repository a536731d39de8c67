//! HTTP bucket backend.
//!
//! Speaks the object API used by hosted storage buckets:
//! `POST {base}/object/{bucket}/{path}` to upload and
//! `{base}/object/public/{bucket}/{path}` to read.

use crate::MediaStore;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, instrument};
use vesper_error::{StorageError, StorageErrorKind};

/// Public bucket reachable over HTTP.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    client: Client,
    base_url: String,
    bucket: String,
    api_key: String,
}

impl ObjectStore {
    /// Creates a bucket client.
    pub fn new(base_url: impl Into<String>, bucket: impl Into<String>, api_key: String) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            api_key,
        }
    }

    /// Public URL of an object.
    pub fn public_url(&self, path: &str) -> String {
        format!("{}/object/public/{}/{}", self.base_url, self.bucket, path)
    }
}

#[async_trait]
impl MediaStore for ObjectStore {
    #[instrument(skip(self, bytes), fields(bucket = %self.bucket, size = bytes.len()))]
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let url = format!("{}/object/{}/{}", self.base_url, self.bucket, path);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Upload request failed");
                StorageError::new(StorageErrorKind::Upload {
                    status: 0,
                    message: e.to_string(),
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(status = %status, error = %message, "Upload rejected");
            return Err(StorageError::new(StorageErrorKind::Upload {
                status: status.as_u16(),
                message,
            }));
        }

        Ok(self.public_url(path))
    }

    fn backend_name(&self) -> &str {
        "object"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url_layout() {
        let store = ObjectStore::new("https://x.example/storage/v1/", "media", "k".to_string());
        assert_eq!(
            store.public_url("owner/abc.png"),
            "https://x.example/storage/v1/object/public/media/owner/abc.png"
        );
    }
}
