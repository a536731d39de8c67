//! Server configuration loaded from TOML.
//!
//! Credentials never appear in the file. Each provider section names the
//! environment variable that holds its key.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use vesper_error::ConfigError;
use vesper_models::{ImageConfig, ProviderConfig};
use vesper_pipeline::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_SOURCE_CHARS, PipelineSettings,
    prompts,
};
use vesper_storage::StorageConfig;

/// Environment variable holding the shared trigger secret.
pub const INTERNAL_SECRET_ENV: &str = "VESPER_INTERNAL_SECRET";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listener, loops and outbox settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Language model providers
    pub models: ModelsConfig,
    /// Image service
    pub image: ImageConfig,
    /// Durable media storage
    pub storage: StorageConfig,
    /// Pipeline tunables
    #[serde(default)]
    pub pipeline: PipelineSection,
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or is not valid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::new(format!("Failed to read {}: {}", path.display(), e))
        })?;
        contents.parse()
    }
}

impl FromStr for ServerConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s).map_err(|e| ConfigError::new(format!("Invalid configuration: {}", e)))
    }
}

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Seconds between cron checks; `0` disables the trigger loop
    #[serde(default = "default_trigger_interval")]
    pub trigger_interval_seconds: u64,
    /// Seconds between outbox sweeps
    #[serde(default = "default_outbox_interval")]
    pub outbox_interval_seconds: u64,
    /// Tasks claimed per sweep
    #[serde(default = "default_outbox_batch_size")]
    pub outbox_batch_size: usize,
    /// Attempts before a translation task is marked failed
    #[serde(default = "default_outbox_max_attempts")]
    pub outbox_max_attempts: i32,
    /// Metric export period
    #[serde(default = "default_metrics_interval")]
    pub metrics_export_interval_seconds: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            trigger_interval_seconds: default_trigger_interval(),
            outbox_interval_seconds: default_outbox_interval(),
            outbox_batch_size: default_outbox_batch_size(),
            outbox_max_attempts: default_outbox_max_attempts(),
            metrics_export_interval_seconds: default_metrics_interval(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_trigger_interval() -> u64 {
    60
}

fn default_outbox_interval() -> u64 {
    30
}

fn default_outbox_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_outbox_max_attempts() -> i32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_metrics_interval() -> u64 {
    60
}

/// `[models]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// First-pass writer; its credential is required
    pub draft: ProviderConfig,
    /// First refinement provider
    pub refine_primary: ProviderConfig,
    /// Second refinement provider
    #[serde(default)]
    pub refine_fallback: Option<ProviderConfig>,
    /// Translation provider; defaults to the draft provider
    #[serde(default)]
    pub translate: Option<ProviderConfig>,
}

impl ModelsConfig {
    /// Provider used for translations.
    pub fn translator(&self) -> &ProviderConfig {
        self.translate.as_ref().unwrap_or(&self.draft)
    }
}

/// `[pipeline]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Source text cap for the draft prompt
    #[serde(default = "default_max_source_chars")]
    pub max_source_chars: usize,
    /// Replaces the built-in image style prefix
    #[serde(default)]
    pub image_style_prefix: Option<String>,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_source_chars: default_max_source_chars(),
            image_style_prefix: None,
        }
    }
}

fn default_max_source_chars() -> usize {
    DEFAULT_MAX_SOURCE_CHARS
}

impl PipelineSection {
    /// Pipeline settings for this section.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the settings cannot be assembled.
    pub fn settings(&self) -> Result<PipelineSettings, ConfigError> {
        PipelineSettings::builder()
            .max_source_chars(self.max_source_chars)
            .image_style_prefix(
                self.image_style_prefix
                    .clone()
                    .unwrap_or_else(|| prompts::DEFAULT_IMAGE_STYLE.to_string()),
            )
            .build()
            .map_err(|e| ConfigError::new(format!("Invalid pipeline settings: {}", e)))
    }
}

/// Reads the shared trigger secret.
///
/// # Errors
///
/// Returns a [`ConfigError`] when the variable is unset or blank.
pub fn internal_secret() -> Result<String, ConfigError> {
    match std::env::var(INTERNAL_SECRET_ENV) {
        Ok(secret) if !secret.trim().is_empty() => Ok(secret),
        _ => Err(ConfigError::new(format!("{} is not set", INTERNAL_SECRET_ENV))),
    }
}
