//! Provider configuration.
//!
//! Credentials never live in configuration files. Each section names the
//! environment variable that holds its key and the key is read when the
//! client is built.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use vesper_error::{ModelError, ModelErrorKind};

/// Settings for one OpenAI-compatible chat endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct ProviderConfig {
    /// API root, e.g. `https://api.openai.com/v1`
    base_url: String,
    /// Model identifier
    model: String,
    /// Environment variable holding the API key
    api_key_env: String,
    /// Completion token limit
    #[serde(default)]
    max_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(default)]
    temperature: Option<f32>,
}

impl ProviderConfig {
    /// Creates a provider configuration without limits.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key_env: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key_env: api_key_env.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    /// Same configuration with token and temperature limits.
    pub fn with_limits(self, max_tokens: Option<u32>, temperature: Option<f32>) -> Self {
        Self {
            max_tokens,
            temperature,
            ..self
        }
    }
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

/// Settings for an OpenAI-compatible image endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct ImageConfig {
    /// API root, e.g. `https://api.openai.com/v1`
    base_url: String,
    /// Model identifier
    model: String,
    /// Requested size, e.g. `1024x1024`
    #[serde(default = "default_image_size")]
    size: String,
    /// Environment variable holding the API key
    api_key_env: String,
}

impl ImageConfig {
    /// Creates an image configuration with the default size.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key_env: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            size: default_image_size(),
            api_key_env: api_key_env.into(),
        }
    }
}

/// Reads the key named by `api_key_env`.
///
/// Unset and blank variables are both reported as a missing credential.
///
/// # Errors
///
/// Returns [`ModelErrorKind::MissingCredential`] naming the variable.
#[track_caller]
pub fn resolve_api_key(api_key_env: &str) -> Result<String, ModelError> {
    match std::env::var(api_key_env) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ModelError::new(ModelErrorKind::MissingCredential(
            api_key_env.to_string(),
        ))),
    }
}
