//! The article pipeline: one run per schedule invocation.
//!
//! Stages run strictly in order: source selection, drafting, refinement,
//! image generation, persistence. The first fatal failure ends the run with
//! one `error` run log entry. Translation is handed to the outbox and never
//! awaited here.

use crate::prompts;
use crate::selector::{persistence, select_source};
use crate::{
    ArticleSchema, DraftGenerator, ImageStage, OutboxSignal, PersistenceWriter, PipelineMetrics,
    RefinementChain, RunLogger,
};
use derive_getters::Getters;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use vesper_core::{FinalizedContent, Schedule, ScheduleOutput, Source};
use vesper_database::Store;
use vesper_error::{PipelineError, PipelineErrorKind};
use vesper_models::ImageGenerator;
use vesper_storage::MediaStore;

/// Default cap on source text handed to the draft generator.
pub const DEFAULT_MAX_SOURCE_CHARS: usize = 12_000;

/// Stage of a run, recorded with every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum RunStage {
    /// Loading and checking the schedule
    ScheduleLookup,
    /// Picking the source
    SourceSelection,
    /// First-pass draft
    Drafting,
    /// Provider fallback chain
    Refining,
    /// Image generation and upload
    ImageGeneration,
    /// Primary record write
    Persisting,
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// An article was written
    Created {
        /// New content id
        content_id: Uuid,
        /// Final slug
        slug: String,
        /// Article title
        title: String,
        /// Source the article was written from
        source: String,
        /// Provider that refined the draft
        provider: String,
        /// Reasons earlier providers were passed over
        fallback_failures: Vec<String>,
        /// Outbox task queued for translations
        translation_task: Option<Uuid>,
        /// Post-commit tasks that failed
        failed_tasks: Vec<String>,
    },
    /// A web story was written
    StoryCreated {
        /// New story id
        story_id: Uuid,
        /// Final slug
        slug: String,
        /// Story title
        title: String,
        /// Number of pages
        pages: usize,
        /// Post-commit tasks that failed
        failed_tasks: Vec<String>,
    },
    /// Every source for the schedule is used up
    NoEligibleSource,
}

impl RunOutcome {
    /// Id of the record written, if any.
    pub fn content_id(&self) -> Option<Uuid> {
        match self {
            RunOutcome::Created { content_id, .. } => Some(*content_id),
            RunOutcome::StoryCreated { story_id, .. } => Some(*story_id),
            RunOutcome::NoEligibleSource => None,
        }
    }

    /// Operator-facing summary.
    pub fn message(&self) -> String {
        match self {
            RunOutcome::Created { title, .. } => format!("Created article \"{}\"", title),
            RunOutcome::StoryCreated { title, .. } => format!("Created web story \"{}\"", title),
            RunOutcome::NoEligibleSource => "No eligible source remains; nothing to do".to_string(),
        }
    }

    fn details(&self) -> Value {
        match self {
            RunOutcome::Created {
                slug,
                source,
                provider,
                fallback_failures,
                translation_task,
                failed_tasks,
                ..
            } => json!({
                "slug": slug,
                "source": source,
                "provider": provider,
                "fallback_failures": fallback_failures,
                "translation_task": translation_task,
                "failed_post_commit": failed_tasks,
            }),
            RunOutcome::StoryCreated {
                slug,
                pages,
                failed_tasks,
                ..
            } => json!({
                "slug": slug,
                "pages": pages,
                "failed_post_commit": failed_tasks,
            }),
            RunOutcome::NoEligibleSource => json!({ "noop": true }),
        }
    }
}

/// Finalized content produced without writing anything.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    /// Source the draft was written from
    pub source: String,
    /// Provider that refined the draft
    pub provider: String,
    /// Refined content
    pub content: FinalizedContent,
}

/// Tunables that do not come from the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Getters, derive_builder::Builder)]
#[builder(setter(into))]
pub struct PipelineSettings {
    /// Source text cap for the draft prompt, in characters
    #[builder(default = "DEFAULT_MAX_SOURCE_CHARS")]
    max_source_chars: usize,
    /// Prefix prepended to every image prompt
    #[builder(default = "prompts::DEFAULT_IMAGE_STYLE.to_string()")]
    image_style_prefix: String,
}

impl PipelineSettings {
    /// Returns a builder for constructing PipelineSettings.
    pub fn builder() -> PipelineSettingsBuilder {
        PipelineSettingsBuilder::default()
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_source_chars: DEFAULT_MAX_SOURCE_CHARS,
            image_style_prefix: prompts::DEFAULT_IMAGE_STYLE.to_string(),
        }
    }
}

/// Services a pipeline runs against.
pub struct PipelineDependencies {
    /// Schedules, sources, content and logs
    pub store: Arc<dyn Store>,
    /// First-pass writer
    pub drafter: DraftGenerator,
    /// Ordered refinement providers
    pub refinement: RefinementChain,
    /// Image service
    pub image_generator: Arc<dyn ImageGenerator>,
    /// Durable media storage
    pub media_store: Arc<dyn MediaStore>,
}

pub(crate) struct StageFailure {
    pub(crate) stage: RunStage,
    pub(crate) error: PipelineError,
}

pub(crate) fn at(stage: RunStage) -> impl Fn(PipelineError) -> StageFailure {
    move |error| StageFailure { stage, error }
}

/// Content generation pipeline.
pub struct ContentPipeline {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) drafter: DraftGenerator,
    pub(crate) refinement: RefinementChain,
    pub(crate) images: ImageStage,
    pub(crate) writer: PersistenceWriter,
    pub(crate) logger: RunLogger,
    pub(crate) settings: PipelineSettings,
    outbox: Option<OutboxSignal>,
    pub(crate) metrics: Option<PipelineMetrics>,
}

impl ContentPipeline {
    /// Pipeline over `deps`.
    pub fn new(deps: PipelineDependencies, settings: PipelineSettings) -> Self {
        let logger = RunLogger::new(Arc::clone(&deps.store));
        let images = ImageStage::new(
            deps.image_generator,
            deps.media_store,
            settings.image_style_prefix().clone(),
        );
        Self {
            writer: PersistenceWriter::new(Arc::clone(&deps.store), logger.clone()),
            store: deps.store,
            drafter: deps.drafter,
            refinement: deps.refinement,
            images,
            logger,
            settings,
            outbox: None,
            metrics: None,
        }
    }

    /// Wakes `signal` after queueing translations.
    pub fn with_outbox(mut self, signal: OutboxSignal) -> Self {
        self.outbox = Some(signal);
        self
    }

    /// Records run metrics.
    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The store runs read from and write to.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Runs the schedule once.
    ///
    /// Every run ends with exactly one terminal run log entry: `success`
    /// (including the nothing-to-do case) or `error`.
    ///
    /// # Errors
    ///
    /// Returns the first fatal stage failure. Secondary write failures and
    /// per-language translation failures are never errors.
    #[instrument(skip(self), fields(schedule_id = %schedule_id))]
    pub async fn run(&self, schedule_id: Uuid) -> Result<RunOutcome, PipelineError> {
        let started = Instant::now();

        let schedule = match self.load_schedule(schedule_id).await {
            Ok(schedule) => schedule,
            Err(e) => {
                error!(error = %e, "Schedule cannot run");
                self.logger
                    .failure(schedule_id, None, RunStage::ScheduleLookup.as_ref(), &e)
                    .await;
                if let Some(metrics) = &self.metrics {
                    metrics.record_failure(
                        "unknown",
                        RunStage::ScheduleLookup.as_ref(),
                        started.elapsed().as_secs_f64(),
                    );
                }
                return Err(e);
            }
        };
        let kind = schedule.kind().to_string();

        let result = match schedule.output() {
            ScheduleOutput::Article => self.run_article(&schedule).await,
            ScheduleOutput::WebStory => self.run_story(&schedule).await,
        };
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(outcome) => {
                if let Some(metrics) = &self.metrics {
                    match &outcome {
                        RunOutcome::NoEligibleSource => metrics.record_noop(&kind),
                        _ => metrics.record_success(&kind, elapsed),
                    }
                }
                info!(
                    content_id = ?outcome.content_id(),
                    duration_ms = (elapsed * 1000.0) as u64,
                    "{}",
                    outcome.message()
                );
                self.logger
                    .success(
                        schedule_id,
                        outcome.content_id(),
                        outcome.message(),
                        outcome.details(),
                    )
                    .await;
                Ok(outcome)
            }
            Err(StageFailure { stage, error: e }) => {
                error!(stage = %stage, error = %e, "Pipeline run failed");
                self.logger
                    .failure(schedule_id, None, stage.as_ref(), &e)
                    .await;
                if let Some(metrics) = &self.metrics {
                    metrics.record_failure(&kind, stage.as_ref(), elapsed);
                }
                Err(e)
            }
        }
    }

    /// Selects, drafts and refines without writing anything.
    ///
    /// Returns `None` when no source remains. Nothing is logged to the run log
    /// and the ledger is not touched.
    #[instrument(skip(self), fields(schedule_id = %schedule_id))]
    pub async fn preview(&self, schedule_id: Uuid) -> Result<Option<Preview>, PipelineError> {
        let schedule = self.load_schedule(schedule_id).await?;
        let Some(source) = select_source(&*self.store, &schedule).await? else {
            return Ok(None);
        };
        let draft = self
            .drafter
            .draft(
                *schedule.kind(),
                &source,
                schedule.source_language(),
                *self.settings.max_source_chars(),
            )
            .await?;
        let refined = self
            .refinement
            .refine(
                &ArticleSchema::new(),
                &prompts::refine_prompt(&draft, schedule.source_language()),
            )
            .await?;
        Ok(Some(Preview {
            source: source.label(),
            provider: refined.provider,
            content: refined.value,
        }))
    }

    async fn load_schedule(&self, schedule_id: Uuid) -> Result<Schedule, PipelineError> {
        let schedule = self
            .store
            .get_schedule(schedule_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| {
                PipelineError::new(PipelineErrorKind::ScheduleNotFound(schedule_id.to_string()))
            })?;
        if !*schedule.active() {
            return Err(PipelineError::new(PipelineErrorKind::ScheduleInactive(
                schedule_id.to_string(),
            )));
        }
        Ok(schedule)
    }

    pub(crate) async fn enter(&self, schedule: &Schedule, stage: RunStage, details: Value) {
        let mut details = details;
        if let Value::Object(map) = &mut details {
            map.insert("stage".to_string(), json!(stage.as_ref()));
        }
        self.logger
            .processing(*schedule.id(), None, format!("Entering {}", stage), details)
            .await;
    }

    pub(crate) async fn select(&self, schedule: &Schedule) -> Result<Option<Source>, StageFailure> {
        self.enter(schedule, RunStage::SourceSelection, json!({})).await;
        select_source(&*self.store, schedule)
            .await
            .map_err(at(RunStage::SourceSelection))
    }

    pub(crate) async fn draft(
        &self,
        schedule: &Schedule,
        source: &Source,
    ) -> Result<String, StageFailure> {
        self.enter(
            schedule,
            RunStage::Drafting,
            json!({ "source": source.label(), "provider": self.drafter.provider_name() }),
        )
        .await;
        self.drafter
            .draft(
                *schedule.kind(),
                source,
                schedule.source_language(),
                *self.settings.max_source_chars(),
            )
            .await
            .map_err(at(RunStage::Drafting))
    }

    pub(crate) fn note_fallback(&self, provider: &str, failures: &[String]) {
        warn!(provider = %provider, failures = ?failures, "Refinement used a fallback provider");
        if let Some(metrics) = &self.metrics {
            metrics.record_fallback(provider);
        }
    }

    async fn run_article(&self, schedule: &Schedule) -> Result<RunOutcome, StageFailure> {
        let Some(source) = self.select(schedule).await? else {
            return Ok(RunOutcome::NoEligibleSource);
        };

        let draft = self.draft(schedule, &source).await?;

        let providers: Vec<&str> = self
            .refinement
            .providers()
            .iter()
            .map(|p| p.label())
            .collect();
        self.enter(schedule, RunStage::Refining, json!({ "providers": providers }))
            .await;
        let refined = self
            .refinement
            .refine(
                &ArticleSchema::new(),
                &prompts::refine_prompt(&draft, schedule.source_language()),
            )
            .await
            .map_err(at(RunStage::Refining))?;
        if refined.used_fallback() {
            self.note_fallback(&refined.provider, &refined.failures);
        }

        self.enter(schedule, RunStage::ImageGeneration, json!({})).await;
        let content = refined.value;
        let prompt = schedule.image_prompt(content.title(), content.summary().as_deref());
        let image_url = match self.images.generate(&prompt, *schedule.author_id()).await {
            Ok(url) => Some(url),
            Err(e) if !*schedule.require_image() => {
                warn!(error = %e, "Image failed; schedule does not require one");
                self.logger
                    .processing(
                        *schedule.id(),
                        None,
                        "Continuing without image",
                        json!({ "stage": RunStage::ImageGeneration.as_ref(), "error": e.to_string() }),
                    )
                    .await;
                None
            }
            Err(e) => return Err(at(RunStage::ImageGeneration)(e)),
        };

        self.enter(schedule, RunStage::Persisting, json!({ "slug": content.slug() }))
            .await;
        let stored = self
            .writer
            .persist(schedule, content, image_url)
            .await
            .map_err(at(RunStage::Persisting))?;

        let report = self.writer.post_commit(schedule, &source, &stored).await;
        if report.translation_task.is_some() {
            if let Some(signal) = &self.outbox {
                signal.notify();
            }
        }

        Ok(RunOutcome::Created {
            content_id: stored.id,
            slug: stored.slug,
            title: stored.title,
            source: source.label(),
            provider: refined.provider,
            fallback_failures: refined.failures,
            translation_task: report.translation_task,
            failed_tasks: report.failed_tasks(),
        })
    }
}

impl std::fmt::Debug for ContentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentPipeline")
            .field("drafter", &self.drafter)
            .field("refinement", &self.refinement)
            .field("images", &self.images)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
