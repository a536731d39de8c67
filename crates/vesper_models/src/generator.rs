//! Provider-agnostic generation traits.

use async_trait::async_trait;
use vesper_core::{GenerateRequest, GenerateResponse};
use vesper_error::ModelError;

/// A service that turns a conversation into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Sends one request and returns the generated text.
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, ModelError>;

    /// Provider label used in logs and run log details.
    fn provider_name(&self) -> &str;

    /// Model identifier sent to the provider.
    fn model_name(&self) -> &str;
}

/// Image returned by a generation service.
///
/// Services either answer with a short-lived URL or inline the bytes.
/// Both are transient and must be copied into durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedImage {
    /// Expiring download link
    Url(String),
    /// Decoded image bytes
    Inline {
        /// Raw image data
        bytes: Vec<u8>,
        /// MIME type of `bytes`
        content_type: String,
    },
}

/// A service that turns a prompt into an image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generates exactly one image for `prompt`.
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ModelError>;

    /// Model identifier sent to the provider.
    fn model_name(&self) -> &str;
}
