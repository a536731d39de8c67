//! Downloading transient assets.

use reqwest::Client;
use tracing::{error, instrument};
use vesper_error::{StorageError, StorageErrorKind};

/// Bytes fetched from a transient URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedAsset {
    /// Body bytes
    pub bytes: Vec<u8>,
    /// Reported MIME type, `image/png` when absent
    pub content_type: String,
}

/// Downloads `url` into memory.
///
/// # Errors
///
/// Any transport failure, non-success status or empty body is a
/// [`StorageErrorKind::Download`] error.
#[instrument(skip(client))]
pub async fn download(client: &Client, url: &str) -> Result<DownloadedAsset, StorageError> {
    let response = client.get(url).send().await.map_err(|e| {
        error!(error = ?e, "Download request failed");
        StorageError::new(StorageErrorKind::Download(e.to_string()))
    })?;

    let status = response.status();
    if !status.is_success() {
        error!(status = %status, "Download rejected");
        return Err(StorageError::new(StorageErrorKind::Download(format!(
            "status {} from {}",
            status, url
        ))));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "image/png".to_string());

    let bytes = response
        .bytes()
        .await
        .map_err(|e| StorageError::new(StorageErrorKind::Download(e.to_string())))?;

    if bytes.is_empty() {
        return Err(StorageError::new(StorageErrorKind::Download(format!(
            "empty body from {}",
            url
        ))));
    }

    Ok(DownloadedAsset {
        bytes: bytes.to_vec(),
        content_type,
    })
}
