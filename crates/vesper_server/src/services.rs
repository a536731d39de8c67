//! Service construction from configuration.

use crate::ServerConfig;
use crate::config::ModelsConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};
use vesper_database::Store;
use vesper_error::{ConfigError, ModelError, ModelErrorKind, VesperResult};
use vesper_models::{OpenAICompatibleClient, OpenAIImageClient, ProviderConfig};
use vesper_pipeline::{
    ContentPipeline, DraftGenerator, OutboxSignal, OutboxWorker, PipelineDependencies,
    PipelineMetrics, RefinementChain, RefinementProvider, Translator,
};
use vesper_storage::build_store;

const PRIMARY_LABEL: &str = "primary";
const FALLBACK_LABEL: &str = "fallback";

/// The pipeline and its translation worker, sharing one outbox signal.
#[derive(Debug, Clone)]
pub struct Services {
    /// Content pipeline
    pub pipeline: Arc<ContentPipeline>,
    /// Translation outbox worker
    pub outbox: Arc<OutboxWorker>,
}

impl Services {
    /// Connects a pipeline to a worker so runs wake it.
    pub fn new(pipeline: ContentPipeline, outbox: OutboxWorker) -> Self {
        let pipeline = pipeline.with_outbox(outbox.signal());
        Self {
            pipeline: Arc::new(pipeline),
            outbox: Arc::new(outbox),
        }
    }

    /// Builds every client named in `config` against `store`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the draft, translation or image
    /// credential is missing, and a storage error when the media backend
    /// cannot be built. A missing refinement credential is not an error.
    #[instrument(skip_all)]
    pub fn from_config(config: &ServerConfig, store: Arc<dyn Store>) -> VesperResult<Self> {
        let drafter = OpenAICompatibleClient::from_config(&config.models.draft, "draft")
            .map_err(|e| required("draft", e))?;
        let translator =
            OpenAICompatibleClient::from_config(config.models.translator(), "translate")
                .map_err(|e| required("translate", e))?;
        let image = OpenAIImageClient::from_config(&config.image)
            .map_err(|e| required("image", e))?;
        let media = build_store(&config.storage)?;
        let refinement = refinement_chain(&config.models)?;
        let metrics = PipelineMetrics::new();

        info!(
            draft_model = %config.models.draft.model(),
            refinement_providers = refinement.providers().len(),
            storage = media.backend_name(),
            "Services configured"
        );

        let pipeline = ContentPipeline::new(
            PipelineDependencies {
                store: Arc::clone(&store),
                drafter: DraftGenerator::new(Arc::new(drafter)),
                refinement,
                image_generator: Arc::new(image),
                media_store: media,
            },
            config.pipeline.settings()?,
        )
        .with_metrics(metrics.clone());

        let outbox = OutboxWorker::new(
            store,
            Translator::new(Arc::new(translator)),
            OutboxSignal::new(),
        )
        .with_batch_size(config.server.outbox_batch_size)
        .with_max_attempts(config.server.outbox_max_attempts)
        .with_metrics(metrics);

        Ok(Self::new(pipeline, outbox))
    }

    /// Signal that wakes the outbox worker.
    pub fn signal(&self) -> OutboxSignal {
        self.outbox.signal()
    }

    /// Starts the outbox worker on the current runtime.
    pub fn spawn_outbox(&self, every: Duration) -> JoinHandle<()> {
        Arc::clone(&self.outbox).spawn(every)
    }
}

fn required(role: &str, error: ModelError) -> ConfigError {
    ConfigError::new(format!("{} provider unavailable: {}", role, error.kind))
}

/// Ordered refinement providers from configuration.
///
/// A primary whose credential is absent stays in the chain as a provider
/// that is always skipped, so its absence shows up in every failure report.
/// A fallback whose credential is absent is left out.
///
/// # Errors
///
/// Returns any client construction error other than a missing credential.
pub fn refinement_chain(models: &ModelsConfig) -> VesperResult<RefinementChain> {
    let mut providers = Vec::with_capacity(2);

    match client(&models.refine_primary, PRIMARY_LABEL)? {
        Some(primary) => providers.push(RefinementProvider::Available(primary)),
        None => {
            warn!(
                env = %models.refine_primary.api_key_env(),
                "Primary refinement credential not set"
            );
            providers.push(RefinementProvider::Missing {
                label: PRIMARY_LABEL.to_string(),
                env: models.refine_primary.api_key_env().clone(),
            });
        }
    }

    if let Some(fallback) = &models.refine_fallback {
        match client(fallback, FALLBACK_LABEL)? {
            Some(fallback) => providers.push(RefinementProvider::Available(fallback)),
            None => warn!(
                env = %fallback.api_key_env(),
                "Fallback refinement credential not set, chain has no fallback"
            ),
        }
    }

    Ok(RefinementChain::new(providers))
}

fn client(
    config: &ProviderConfig,
    label: &str,
) -> Result<Option<Arc<dyn vesper_models::TextGenerator>>, ModelError> {
    match OpenAICompatibleClient::from_config(config, label) {
        Ok(client) => Ok(Some(Arc::new(client))),
        Err(e) if matches!(e.kind, ModelErrorKind::MissingCredential(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
