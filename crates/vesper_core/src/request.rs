//! Request and response types for text generation.

use crate::Message;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Provider-agnostic text generation request.
#[derive(
    Debug, Clone, PartialEq, Default, Serialize, Deserialize, Getters, derive_builder::Builder,
)]
#[builder(setter(into), default)]
pub struct GenerateRequest {
    /// Conversation messages, system instruction first
    messages: Vec<Message>,
    /// Maximum tokens to generate
    max_tokens: Option<u32>,
    /// Sampling temperature
    temperature: Option<f32>,
    /// Ask the provider for a JSON object response when it supports it
    json_mode: bool,
}

impl GenerateRequest {
    /// Creates a new builder for GenerateRequest.
    pub fn builder() -> GenerateRequestBuilder {
        GenerateRequestBuilder::default()
    }

    /// Request made of a system instruction followed by a single user message.
    pub fn instructed(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system), Message::user(user)],
            ..Default::default()
        }
    }

    /// Same request with JSON mode switched on.
    pub fn with_json_mode(self) -> Self {
        Self {
            json_mode: true,
            ..self
        }
    }

    /// Same request with the given token and temperature limits.
    pub fn with_limits(self, max_tokens: Option<u32>, temperature: Option<f32>) -> Self {
        Self {
            max_tokens: max_tokens.or(self.max_tokens),
            temperature: temperature.or(self.temperature),
            ..self
        }
    }
}

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub input_tokens: u64,
    /// Tokens in the completion
    pub output_tokens: u64,
}

/// Text produced by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct GenerateResponse {
    /// Generated text
    text: String,
    /// Token usage when reported
    usage: Option<TokenUsage>,
}

impl GenerateResponse {
    /// Creates a response from generated text.
    pub fn new(text: impl Into<String>, usage: Option<TokenUsage>) -> Self {
        Self {
            text: text.into(),
            usage,
        }
    }

    /// Consumes the response, returning the text.
    pub fn into_text(self) -> String {
        self.text
    }
}
