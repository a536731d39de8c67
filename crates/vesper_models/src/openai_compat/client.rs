//! Generic client for OpenAI-compatible chat APIs.

use crate::config::{ProviderConfig, resolve_api_key};
use crate::openai_compat::{ChatResponse, conversions};
use crate::TextGenerator;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, instrument};
use vesper_core::{GenerateRequest, GenerateResponse};
use vesper_error::{ModelError, ModelErrorKind};

/// Client for any API that follows the OpenAI chat completions format.
#[derive(Debug, Clone)]
pub struct OpenAICompatibleClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    provider_name: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl OpenAICompatibleClient {
    /// Creates a new OpenAI-compatible client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - API key for authentication
    /// * `model` - Model identifier
    /// * `base_url` - API root; `/chat/completions` is appended
    /// * `provider_name` - Label for logs and run log details
    #[instrument(skip(api_key, base_url), fields(provider = %provider_name, model = %model))]
    pub fn new(api_key: String, model: String, base_url: &str, provider_name: String) -> Self {
        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));

        debug!(url = %endpoint, "Created OpenAI-compatible client");

        Self {
            client: Client::new(),
            api_key,
            model,
            endpoint,
            provider_name,
            max_tokens: None,
            temperature: None,
        }
    }

    /// Builds a client from configuration, reading the key from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ModelErrorKind::MissingCredential`] when the key variable is
    /// unset or blank.
    pub fn from_config(
        config: &ProviderConfig,
        provider_name: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let api_key = resolve_api_key(config.api_key_env())?;
        let mut client = Self::new(
            api_key,
            config.model().clone(),
            config.base_url(),
            provider_name.into(),
        );
        client.max_tokens = *config.max_tokens();
        client.temperature = *config.temperature();
        Ok(client)
    }
}

#[async_trait]
impl TextGenerator for OpenAICompatibleClient {
    #[instrument(skip(self, req), fields(provider = %self.provider_name, model = %self.model))]
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, ModelError> {
        let req = req.clone().with_limits(self.max_tokens, self.temperature);
        let chat_request = conversions::to_chat_request(&req, &self.model)?;

        debug!(
            message_count = chat_request.messages().len(),
            json_mode = chat_request.response_format().is_some(),
            "Sending request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| {
                error!(provider = %self.provider_name, error = ?e, "HTTP request failed");
                ModelError::new(ModelErrorKind::Request(e.to_string()))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                provider = %self.provider_name,
                status = %status,
                error = %error_text,
                "API error"
            );

            return Err(ModelError::new(ModelErrorKind::Api {
                status: status.as_u16(),
                message: error_text,
            }));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = %self.provider_name, error = ?e, "Failed to parse response");
            ModelError::new(ModelErrorKind::ResponseParsing(format!(
                "Failed to parse JSON: {}",
                e
            )))
        })?;

        debug!(choices = chat_response.choices.len(), "Received response");

        conversions::from_chat_response(&chat_response)
    }

    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
