//! Repository traits: the query capability the pipeline runs against.

use crate::DatabaseResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use vesper_core::{
    ArticleSource, GeneratedContent, NewContent, NewWebStory, RunLogEntry, Schedule, TaskStatus,
    Translation, TranslationPayload, TranslationTask, VerseSource, WebStory,
};

/// Read access to operator-owned schedules.
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    /// Schedule by id.
    async fn get_schedule(&self, id: Uuid) -> DatabaseResult<Option<Schedule>>;

    /// Every schedule with `active = true`.
    async fn list_active_schedules(&self) -> DatabaseResult<Vec<Schedule>>;
}

/// Source pools and the per-schedule ledger of consumed sources.
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// A random verse the schedule has not consumed yet.
    async fn random_unused_verse(&self, schedule_id: Uuid) -> DatabaseResult<Option<VerseSource>>;

    /// The most recently published article the schedule has not consumed yet,
    /// restricted to `category_id` when given.
    async fn newest_unused_article(
        &self,
        schedule_id: Uuid,
        category_id: Option<Uuid>,
    ) -> DatabaseResult<Option<ArticleSource>>;

    /// Records that `schedule_id` consumed `source_id`.
    ///
    /// Recording the same pair twice is a no-op.
    async fn mark_source_used(
        &self,
        schedule_id: Uuid,
        source_id: Uuid,
        source_kind: &str,
        content_id: Option<Uuid>,
    ) -> DatabaseResult<()>;

    /// Sources consumed by a schedule.
    async fn used_sources(&self, schedule_id: Uuid) -> DatabaseResult<Vec<Uuid>>;
}

/// Generated content, its categories, translations and web stories.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Whether an article already uses `slug`.
    async fn content_slug_exists(&self, slug: &str) -> DatabaseResult<bool>;

    /// Inserts a content record.
    async fn insert_content(&self, content: NewContent) -> DatabaseResult<GeneratedContent>;

    /// Content by id.
    async fn get_content(&self, id: Uuid) -> DatabaseResult<Option<GeneratedContent>>;

    /// Associates categories with a record. Existing pairs are kept.
    async fn attach_categories(&self, content_id: Uuid, category_ids: &[Uuid])
    -> DatabaseResult<()>;

    /// Categories associated with a record.
    async fn categories_for(&self, content_id: Uuid) -> DatabaseResult<Vec<Uuid>>;

    /// Writes the translation for `(content_id, language)`, replacing any previous one.
    async fn upsert_translation(&self, translation: Translation) -> DatabaseResult<()>;

    /// Translations of a record, ordered by language.
    async fn translations_for(&self, content_id: Uuid) -> DatabaseResult<Vec<Translation>>;

    /// Whether a web story already uses `slug`.
    async fn story_slug_exists(&self, slug: &str) -> DatabaseResult<bool>;

    /// Inserts a web story.
    async fn insert_web_story(&self, story: NewWebStory) -> DatabaseResult<WebStory>;
}

/// Append-only operator log.
#[async_trait]
pub trait RunLogRepository: Send + Sync {
    /// Appends one entry.
    async fn append_run_log(&self, entry: RunLogEntry) -> DatabaseResult<()>;

    /// Entries for a schedule, oldest first.
    async fn run_logs_for(&self, schedule_id: Uuid) -> DatabaseResult<Vec<RunLogEntry>>;

    /// Timestamp of the schedule's latest `success` or `error` entry.
    async fn last_terminal_run(&self, schedule_id: Uuid) -> DatabaseResult<Option<DateTime<Utc>>>;
}

/// Outbox of translation work.
#[async_trait]
pub trait TranslationOutbox: Send + Sync {
    /// Adds a pending task.
    async fn enqueue_translation(
        &self,
        content_id: Uuid,
        languages: Vec<String>,
        payload: Option<TranslationPayload>,
    ) -> DatabaseResult<TranslationTask>;

    /// Up to `limit` pending tasks, oldest first.
    async fn pending_tasks(&self, limit: usize) -> DatabaseResult<Vec<TranslationTask>>;

    /// Marks a task done.
    async fn complete_task(&self, task_id: Uuid) -> DatabaseResult<()>;

    /// Records a partially failed attempt.
    ///
    /// Keeps only `remaining` languages, increments `attempts` and stores
    /// `error`. The task becomes failed once `attempts >= max_attempts`.
    /// Returns the new status.
    async fn reschedule_task(
        &self,
        task_id: Uuid,
        remaining: Vec<String>,
        error: String,
        max_attempts: i32,
    ) -> DatabaseResult<TaskStatus>;

    /// Task by id.
    async fn get_task(&self, task_id: Uuid) -> DatabaseResult<Option<TranslationTask>>;
}

/// Everything the pipeline needs from storage.
pub trait Store:
    ScheduleRepository + SourceRepository + ContentRepository + RunLogRepository + TranslationOutbox
{
}

impl<T> Store for T where
    T: ScheduleRepository
        + SourceRepository
        + ContentRepository
        + RunLogRepository
        + TranslationOutbox
{
}

/// Status of a task after a partially failed attempt.
pub(crate) fn status_after_attempt(attempts: i32, max_attempts: i32) -> TaskStatus {
    if attempts >= max_attempts {
        TaskStatus::Failed
    } else {
        TaskStatus::Pending
    }
}
