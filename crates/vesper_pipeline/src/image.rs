//! Image generation and transfer to durable storage.

use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use vesper_error::{PipelineError, PipelineErrorKind};
use vesper_models::{GeneratedImage, ImageGenerator};
use vesper_storage::{MediaStore, download};

/// Generates one image and stores it under a fresh owner-scoped path.
#[derive(Clone)]
pub struct ImageStage {
    generator: Arc<dyn ImageGenerator>,
    store: Arc<dyn MediaStore>,
    client: reqwest::Client,
    style_prefix: String,
}

impl ImageStage {
    /// Stage writing images from `generator` into `store`.
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        store: Arc<dyn MediaStore>,
        style_prefix: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            store,
            client: reqwest::Client::new(),
            style_prefix: style_prefix.into(),
        }
    }

    /// Full prompt sent to the image service.
    pub fn styled_prompt(&self, prompt: &str) -> String {
        format!("{}{}", self.style_prefix, prompt)
    }

    /// Generates an image for `prompt` and returns its durable public URL.
    ///
    /// The service's URL expires, so the bytes are downloaded and re-uploaded
    /// every time. Every call writes a new object.
    #[instrument(skip(self, prompt), fields(model = self.generator.model_name(), backend = self.store.backend_name()))]
    pub async fn generate(&self, prompt: &str, owner: Uuid) -> Result<String, PipelineError> {
        let generated = self
            .generator
            .generate_image(&self.styled_prompt(prompt))
            .await
            .map_err(|e| image_error(e.to_string()))?;

        let (bytes, content_type) = match generated {
            GeneratedImage::Url(url) => {
                debug!("Downloading transient image");
                let asset = download(&self.client, &url)
                    .await
                    .map_err(|e| image_error(e.to_string()))?;
                (asset.bytes, asset.content_type)
            }
            GeneratedImage::Inline {
                bytes,
                content_type,
            } => (bytes, content_type),
        };

        let size = bytes.len();
        let url = self
            .store
            .put_unique(&owner.to_string(), bytes, &content_type)
            .await
            .map_err(|e| image_error(e.to_string()))?;

        info!(size, url = %url, "Image stored");
        Ok(url)
    }
}

impl std::fmt::Debug for ImageStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageStage")
            .field("model", &self.generator.model_name())
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

#[track_caller]
fn image_error(message: String) -> PipelineError {
    PipelineError::new(PipelineErrorKind::Image(message))
}
