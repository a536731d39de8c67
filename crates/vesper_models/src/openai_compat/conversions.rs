//! Type conversions between Vesper and OpenAI formats.

use crate::openai_compat::{ChatMessage, ChatRequest, ChatResponse, ResponseFormat};
use vesper_core::{GenerateRequest, GenerateResponse, TokenUsage};
use vesper_error::{ModelError, ModelErrorKind};

/// Converts a GenerateRequest to OpenAI chat format.
pub fn to_chat_request(req: &GenerateRequest, model: &str) -> Result<ChatRequest, ModelError> {
    let messages: Vec<ChatMessage> = req
        .messages()
        .iter()
        .map(|msg| ChatMessage {
            role: msg.role().as_ref().to_string(),
            content: Some(msg.content().clone()),
        })
        .collect();

    let mut builder = ChatRequest::builder();
    builder
        .model(model.to_string())
        .messages(messages)
        .max_tokens(*req.max_tokens())
        .temperature(*req.temperature());

    if *req.json_mode() {
        builder.response_format(Some(ResponseFormat::json_object()));
    }

    builder.build().map_err(|e| {
        ModelError::new(ModelErrorKind::Request(format!(
            "Failed to build request: {}",
            e
        )))
    })
}

/// Converts an OpenAI chat response to a GenerateResponse.
///
/// A response without choices, or whose first choice has no text, is empty.
pub fn from_chat_response(response: &ChatResponse) -> Result<GenerateResponse, ModelError> {
    let text = response
        .choices
        .first()
        .and_then(|choice| choice.message.content.clone())
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ModelError::new(ModelErrorKind::EmptyResponse))?;

    let usage = response
        .usage
        .as_ref()
        .and_then(|u| match (u.prompt_tokens, u.completion_tokens) {
            (Some(input), Some(output)) => Some(TokenUsage {
                input_tokens: input,
                output_tokens: output,
            }),
            _ => None,
        });

    Ok(GenerateResponse::new(text, usage))
}
