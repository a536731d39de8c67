//! OpenAI-compatible chat completions client.

mod client;
mod conversions;
mod dto;

pub use client::OpenAICompatibleClient;
pub use dto::{ChatMessage, ChatRequest, ChatRequestBuilder, ChatResponse, ResponseFormat};
