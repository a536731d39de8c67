//! Per-language translation fan-out.

use crate::{extract_json_object, prompts};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use vesper_core::{GenerateRequest, Translation, TranslationPayload, TranslationReport};
use vesper_database::ContentRepository;
use vesper_models::TextGenerator;

/// Translates finalized fields with one generation service.
#[derive(Clone)]
pub struct Translator {
    generator: Arc<dyn TextGenerator>,
}

impl Translator {
    /// Translator backed by `generator`.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Translates `payload` into `language`.
    ///
    /// The error is a human-readable reason.
    #[instrument(skip(self, payload), fields(provider = self.generator.provider_name()))]
    pub async fn translate(
        &self,
        payload: &TranslationPayload,
        language: &str,
    ) -> Result<TranslationPayload, String> {
        let input = serde_json::to_string(payload).map_err(|e| e.to_string())?;
        let request =
            GenerateRequest::instructed(prompts::translate_instruction(language), input)
                .with_json_mode();

        let response = self
            .generator
            .generate(&request)
            .await
            .map_err(|e| e.kind.to_string())?;

        let json = extract_json_object(response.text())
            .ok_or_else(|| "no JSON object in output".to_string())?;
        let translated: TranslationPayload =
            serde_json::from_str(json).map_err(|e| format!("invalid JSON: {}", e))?;

        if translated.title.trim().is_empty() || translated.content.trim().is_empty() {
            return Err("translation is missing title or content".to_string());
        }
        Ok(translated)
    }

    /// Translates into every language concurrently and writes one row per success.
    ///
    /// Each language settles on its own: a failure is recorded in the report
    /// and never cancels the others.
    #[instrument(skip(self, store, payload), fields(content_id = %content_id, languages = languages.len()))]
    pub async fn translate_all<R>(
        &self,
        store: &R,
        content_id: Uuid,
        payload: &TranslationPayload,
        languages: &[String],
    ) -> TranslationReport
    where
        R: ContentRepository + ?Sized,
    {
        let tasks = languages.iter().map(|language| async move {
            let outcome = match self.translate(payload, language).await {
                Ok(translated) => store
                    .upsert_translation(Translation {
                        content_id,
                        language: language.clone(),
                        title: translated.title,
                        summary: translated.summary,
                        body: translated.content,
                    })
                    .await
                    .map_err(|e| e.to_string()),
                Err(reason) => Err(reason),
            };
            (language.clone(), outcome)
        });

        let mut report = TranslationReport::default();
        for (language, outcome) in join_all(tasks).await {
            match outcome {
                Ok(()) => {
                    debug!(language = %language, "Translation stored");
                    report.succeeded.push(language);
                }
                Err(reason) => {
                    warn!(language = %language, reason = %reason, "Translation failed");
                    report.errors.insert(language.clone(), reason);
                    report.failed.push(language);
                }
            }
        }

        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Translation fan-out settled"
        );
        report
    }
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("provider", &self.generator.provider_name())
            .finish()
    }
}
