//! Provider-level fallback chain.
//!
//! The chain holds an ordered list of providers. Each provider is tried once
//! per call; the first output that passes the schema wins. Transport errors
//! and malformed output are handled the same way: note the reason, move on.

use crate::{ParseOutcome, RefinementSchema};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use vesper_core::GenerateRequest;
use vesper_error::{PipelineError, PipelineErrorKind};
use vesper_models::TextGenerator;

/// One entry in a refinement chain.
#[derive(Clone)]
pub enum RefinementProvider {
    /// Provider with a configured credential
    Available(Arc<dyn TextGenerator>),
    /// Provider whose credential is absent; always skipped
    Missing {
        /// Provider label for logs
        label: String,
        /// Environment variable that should hold the credential
        env: String,
    },
}

impl RefinementProvider {
    /// Label used in logs and failure reasons.
    pub fn label(&self) -> &str {
        match self {
            RefinementProvider::Available(generator) => generator.provider_name(),
            RefinementProvider::Missing { label, .. } => label,
        }
    }
}

impl std::fmt::Debug for RefinementProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefinementProvider::Available(generator) => f
                .debug_tuple("Available")
                .field(&generator.provider_name())
                .finish(),
            RefinementProvider::Missing { label, env } => f
                .debug_struct("Missing")
                .field("label", label)
                .field("env", env)
                .finish(),
        }
    }
}

/// Successful chain result.
#[derive(Debug, Clone, PartialEq)]
pub struct Refined<T> {
    /// Validated output
    pub value: T,
    /// Provider that produced it
    pub provider: String,
    /// Reasons earlier providers were passed over, in order
    pub failures: Vec<String>,
}

impl<T> Refined<T> {
    /// Whether a provider other than the first produced the value.
    pub fn used_fallback(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Ordered, fallback-capable list of refinement providers.
#[derive(Debug, Clone, Default)]
pub struct RefinementChain {
    providers: Vec<RefinementProvider>,
}

impl RefinementChain {
    /// Chain over `providers`, tried in order.
    pub fn new(providers: Vec<RefinementProvider>) -> Self {
        Self { providers }
    }

    /// Providers in attempt order.
    pub fn providers(&self) -> &[RefinementProvider] {
        &self.providers
    }

    /// Runs `prompt` through the chain and validates with `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineErrorKind::RefinementExhausted`] with one reason per
    /// provider when none produced valid output.
    #[instrument(skip(self, schema, prompt), fields(providers = self.providers.len()))]
    pub async fn refine<S: RefinementSchema>(
        &self,
        schema: &S,
        prompt: &str,
    ) -> Result<Refined<S::Output>, PipelineError> {
        let mut failures = Vec::new();

        for provider in &self.providers {
            let label = provider.label().to_string();
            match self.attempt(provider, schema, prompt).await {
                Ok(value) => {
                    if failures.is_empty() {
                        debug!(provider = %label, "Refinement succeeded on first provider");
                    } else {
                        info!(
                            provider = %label,
                            skipped = failures.len(),
                            "Refinement succeeded on fallback provider"
                        );
                    }
                    return Ok(Refined {
                        value,
                        provider: label,
                        failures,
                    });
                }
                Err(reason) => {
                    warn!(provider = %label, reason = %reason, "Refinement provider failed");
                    failures.push(format!("{}: {}", label, reason));
                }
            }
        }

        Err(PipelineError::new(PipelineErrorKind::RefinementExhausted(
            failures,
        )))
    }

    /// Tries one provider. The error is a human-readable reason.
    ///
    /// Token and temperature limits come from each provider's own client.
    pub async fn attempt<S: RefinementSchema>(
        &self,
        provider: &RefinementProvider,
        schema: &S,
        prompt: &str,
    ) -> Result<S::Output, String> {
        let generator = match provider {
            RefinementProvider::Available(generator) => generator,
            RefinementProvider::Missing { env, .. } => {
                return Err(format!("credential not configured ({})", env));
            }
        };

        let request =
            GenerateRequest::instructed(schema.instruction(), prompt).with_json_mode();

        let response = generator
            .generate(&request)
            .await
            .map_err(|e| e.kind.to_string())?;

        match schema.parse(response.text()) {
            ParseOutcome::Parsed(value) => Ok(value),
            ParseOutcome::Malformed { reason, raw } => {
                debug!(
                    provider = generator.provider_name(),
                    raw_len = raw.len(),
                    "Discarding malformed refinement output"
                );
                Err(format!("malformed output: {}", reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArticleSchema;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use vesper_core::GenerateResponse;
    use vesper_error::ModelError;

    struct Recording {
        reply: String,
        seen: Mutex<Vec<GenerateRequest>>,
    }

    #[async_trait]
    impl TextGenerator for Recording {
        async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, ModelError> {
            self.seen.lock().unwrap().push(req.clone());
            Ok(GenerateResponse::new(self.reply.clone(), None))
        }

        fn provider_name(&self) -> &str {
            "recording"
        }

        fn model_name(&self) -> &str {
            "recording-model"
        }
    }

    fn recording(reply: &str) -> Arc<Recording> {
        Arc::new(Recording {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_request_leaves_limits_to_the_provider() {
        let provider = recording(r#"{"title":"Born Again","body":"Text."}"#);
        let chain = RefinementChain::new(vec![RefinementProvider::Available(provider.clone())]);

        let refined = chain.refine(&ArticleSchema::new(), "draft").await.unwrap();
        assert_eq!(refined.provider, "recording");
        assert!(!refined.used_fallback());

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(*seen[0].json_mode());
        assert_eq!(*seen[0].max_tokens(), None);
        assert_eq!(*seen[0].temperature(), None);
    }

    #[tokio::test]
    async fn test_missing_provider_reason_names_the_variable() {
        let fallback = recording("not json at all");
        let chain = RefinementChain::new(vec![
            RefinementProvider::Missing {
                label: "primary".to_string(),
                env: "GEMINI_API_KEY".to_string(),
            },
            RefinementProvider::Available(fallback),
        ]);

        let err = chain.refine(&ArticleSchema::new(), "draft").await.unwrap_err();
        let PipelineErrorKind::RefinementExhausted(reasons) = err.kind else {
            panic!("expected exhaustion");
        };
        assert_eq!(reasons.len(), 2);
        assert_eq!(reasons[0], "primary: credential not configured (GEMINI_API_KEY)");
        assert!(reasons[1].starts_with("recording: malformed output"));
    }
}
