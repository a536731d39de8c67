//! Generation service clients for Vesper.
//!
//! The pipeline talks to language and image models only through the
//! [`TextGenerator`] and [`ImageGenerator`] traits. This crate provides
//! implementations for services that speak the OpenAI wire format, which
//! covers OpenAI itself and most hosted gateways.

mod config;
mod generator;
mod image;
mod openai_compat;

pub use config::{ImageConfig, ProviderConfig, resolve_api_key};
pub use generator::{GeneratedImage, ImageGenerator, TextGenerator};
pub use image::OpenAIImageClient;
pub use openai_compat::{
    ChatMessage, ChatRequest, ChatRequestBuilder, ChatResponse, OpenAICompatibleClient,
    ResponseFormat,
};
