//! Content generation pipeline for Vesper.
//!
//! A run takes one schedule from source to stored content:
//!
//! 1. [`select_source`] picks an unused verse, the schedule's theme, or the
//!    newest unused article.
//! 2. [`DraftGenerator`] writes a first draft with a single provider.
//! 3. [`RefinementChain`] turns the draft into schema-validated
//!    [`FinalizedContent`](vesper_core::FinalizedContent), falling back
//!    provider by provider.
//! 4. [`ImageStage`] generates an image and copies it to durable storage.
//! 5. [`PersistenceWriter`] inserts the record and runs the post-commit
//!    tasks: categories, ledger mark, translation outbox.
//!
//! [`ContentPipeline`] drives the stages and writes the run log.
//! [`OutboxWorker`] drains queued translations independently of any run.

mod draft;
mod extract;
mod image;
mod metrics;
mod outbox;
mod persist;
mod pipeline;
mod refine;
mod run_log;
mod schema;
mod selector;
mod story;
mod translate;

pub mod prompts;

pub use draft::DraftGenerator;
pub use extract::{ParseOutcome, extract_json_object};
pub use image::ImageStage;
pub use metrics::PipelineMetrics;
pub use outbox::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_ATTEMPTS, DrainReport, OutboxSignal, OutboxWorker,
};
pub use persist::{
    PersistenceWriter, PostCommitOutcome, PostCommitReport, PostCommitTask, SLUG_SUFFIX_ATTEMPTS,
    translation_targets, unique_slug,
};
pub use pipeline::{
    ContentPipeline, DEFAULT_MAX_SOURCE_CHARS, PipelineDependencies, PipelineSettings,
    PipelineSettingsBuilder, Preview, RunOutcome, RunStage,
};
pub use refine::{Refined, RefinementChain, RefinementProvider};
pub use run_log::RunLogger;
pub use schema::{ArticleSchema, MAX_STORY_PAGES, MIN_STORY_PAGES, RefinementSchema, StorySchema};
pub use selector::select_source;
pub use translate::Translator;
