//! OpenAI-compatible image generation client.

use crate::config::{ImageConfig, resolve_api_key};
use crate::{GeneratedImage, ImageGenerator};
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use vesper_error::{ModelError, ModelErrorKind};

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

/// Client for `/images/generations` endpoints.
#[derive(Debug, Clone)]
pub struct OpenAIImageClient {
    client: Client,
    api_key: String,
    model: String,
    size: String,
    endpoint: String,
}

impl OpenAIImageClient {
    /// Creates a new image client.
    pub fn new(api_key: String, model: String, size: String, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            size,
            endpoint: format!("{}/images/generations", base_url.trim_end_matches('/')),
        }
    }

    /// Builds a client from configuration, reading the key from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ModelErrorKind::MissingCredential`] when the key variable is
    /// unset or blank.
    pub fn from_config(config: &ImageConfig) -> Result<Self, ModelError> {
        let api_key = resolve_api_key(config.api_key_env())?;
        Ok(Self::new(
            api_key,
            config.model().clone(),
            config.size().clone(),
            config.base_url(),
        ))
    }
}

fn decode_image(data: ImageData) -> Result<GeneratedImage, ModelError> {
    if let Some(url) = data.url.filter(|u| !u.is_empty()) {
        return Ok(GeneratedImage::Url(url));
    }
    let Some(encoded) = data.b64_json else {
        return Err(ModelError::new(ModelErrorKind::EmptyResponse));
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| {
            ModelError::new(ModelErrorKind::ResponseParsing(format!(
                "Invalid base64 image: {}",
                e
            )))
        })?;
    Ok(GeneratedImage::Inline {
        bytes,
        content_type: "image/png".to_string(),
    })
}

#[async_trait]
impl ImageGenerator for OpenAIImageClient {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ModelError> {
        let request = ImageRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: &self.size,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Image request failed");
                ModelError::new(ModelErrorKind::Request(e.to_string()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_text, "Image API error");
            return Err(ModelError::new(ModelErrorKind::Api {
                status: status.as_u16(),
                message: error_text,
            }));
        }

        let body: ImageResponse = response.json().await.map_err(|e| {
            ModelError::new(ModelErrorKind::ResponseParsing(format!(
                "Failed to parse JSON: {}",
                e
            )))
        })?;

        let data = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::new(ModelErrorKind::EmptyResponse))?;

        let image = decode_image(data)?;
        debug!(
            inline = matches!(image, GeneratedImage::Inline { .. }),
            "Received image"
        );
        Ok(image)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_preferred_over_inline() {
        let image = decode_image(ImageData {
            url: Some("https://cdn.example/tmp/1.png".to_string()),
            b64_json: Some("aGVsbG8=".to_string()),
        })
        .unwrap();
        assert_eq!(
            image,
            GeneratedImage::Url("https://cdn.example/tmp/1.png".to_string())
        );
    }

    #[test]
    fn test_inline_bytes_decoded() {
        let image = decode_image(ImageData {
            url: None,
            b64_json: Some("aGVsbG8=".to_string()),
        })
        .unwrap();
        match image {
            GeneratedImage::Inline { bytes, .. } => assert_eq!(bytes, b"hello"),
            other => panic!("Expected inline image, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_payload_is_empty() {
        let err = decode_image(ImageData {
            url: None,
            b64_json: None,
        })
        .unwrap_err();
        assert_eq!(err.kind, ModelErrorKind::EmptyResponse);
    }
}
