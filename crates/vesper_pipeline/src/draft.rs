//! First-pass draft generation.

use crate::prompts;
use std::sync::Arc;
use tracing::{debug, instrument};
use vesper_core::{ContentKind, GenerateRequest, Source};
use vesper_error::{PipelineError, PipelineErrorKind};
use vesper_models::TextGenerator;

/// Single-call draft writer. There is no fallback at this stage.
#[derive(Clone)]
pub struct DraftGenerator {
    generator: Arc<dyn TextGenerator>,
}

impl DraftGenerator {
    /// Drafts with `generator`.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Provider label.
    pub fn provider_name(&self) -> &str {
        self.generator.provider_name()
    }

    /// Writes a draft of `kind` from `source`, truncated to `max_chars` of context.
    #[instrument(
        skip(self, source),
        fields(provider = self.generator.provider_name(), source = %source.label())
    )]
    pub async fn draft(
        &self,
        kind: ContentKind,
        source: &Source,
        language: &str,
        max_chars: usize,
    ) -> Result<String, PipelineError> {
        let context = source.context(max_chars);
        let request = GenerateRequest::instructed(
            prompts::draft_instruction(kind),
            prompts::draft_prompt(source, &context, language),
        );

        let response = self
            .generator
            .generate(&request)
            .await
            .map_err(|e| PipelineError::new(PipelineErrorKind::Draft(e.kind.to_string())))?;

        let text = response.into_text();
        if text.trim().is_empty() {
            return Err(PipelineError::new(PipelineErrorKind::Draft(
                "empty draft".to_string(),
            )));
        }
        debug!(chars = text.len(), "Draft generated");
        Ok(text)
    }
}

impl std::fmt::Debug for DraftGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftGenerator")
            .field("provider", &self.generator.provider_name())
            .field("model", &self.generator.model_name())
            .finish()
    }
}
