//! Core data types for the Vesper content pipeline.
//!
//! This crate holds the domain model shared by the storage, model and pipeline
//! crates: schedules and the sources they consume, the finalized content a run
//! produces, translations, run log entries and the outbox tasks that drive
//! translation. It also carries the request/response types exchanged with
//! language models, slug normalization and cron trigger evaluation.

mod content;
mod message;
mod request;
mod role;
mod run_log;
mod schedule;
mod slug;
mod source;
mod story;
mod translation;
mod trigger;

pub use content::{
    ContentStatus, FinalizedContent, FinalizedContentBuilder, GeneratedContent, NewContent,
    NewContentBuilder,
};
pub use message::{Message, MessageBuilder};
pub use request::{GenerateRequest, GenerateRequestBuilder, GenerateResponse, TokenUsage};
pub use role::Role;
pub use run_log::{RunLogEntry, RunStatus};
pub use schedule::{ContentKind, Schedule, ScheduleBuilder, ScheduleOutput, SourceStrategy};
pub use slug::{MAX_SLUG_LEN, is_url_safe, slugify};
pub use source::{ArticleSource, Source, VerseSource};
pub use story::{NewWebStory, StoryPage, StoryPageDraft, StoryScript, WebStory};
pub use translation::{
    TaskStatus, Translation, TranslationPayload, TranslationReport, TranslationTask,
};
pub use trigger::{CronTrigger, Trigger, TriggerCheck};
