//! Primary content write and the post-commit tasks that follow it.
//!
//! Only the content insert is fatal. Category association, ledger marking
//! and outbox enqueueing run afterwards as independent tasks, each with its
//! own run log entry.

use crate::RunLogger;
use crate::selector::persistence;
use chrono::Utc;
use rand::Rng;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;
use vesper_core::{
    ContentStatus, FinalizedContent, GeneratedContent, MAX_SLUG_LEN, NewContent, NewWebStory,
    Schedule, Source, StoryPage, StoryScript, TranslationPayload, WebStory,
};
use vesper_database::{DatabaseResult, Store};
use vesper_error::{PipelineError, PipelineErrorKind};

/// Random suffixes tried before falling back to a UUID.
pub const SLUG_SUFFIX_ATTEMPTS: usize = 5;

/// Secondary write performed after the content insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum PostCommitTask {
    /// Associate the schedule's categories
    AttachCategories,
    /// Record the source in the schedule's ledger
    MarkSourceUsed,
    /// Queue translation into the schedule's target languages
    EnqueueTranslation,
}

/// Outcome of one post-commit task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCommitOutcome {
    /// Task that ran
    pub task: PostCommitTask,
    /// Failure reason, `None` on success
    pub error: Option<String>,
}

/// Outcomes of every post-commit task that ran, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostCommitReport {
    /// Per-task outcomes
    pub outcomes: Vec<PostCommitOutcome>,
    /// Outbox task created for translations
    pub translation_task: Option<Uuid>,
}

impl PostCommitReport {
    /// Names of the tasks that failed.
    pub fn failed_tasks(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.error.is_some())
            .map(|o| o.task.to_string())
            .collect()
    }
}

/// Writes generated content and its secondary records.
#[derive(Clone)]
pub struct PersistenceWriter {
    store: Arc<dyn Store>,
    logger: RunLogger,
}

impl PersistenceWriter {
    /// Writer over `store`, logging post-commit outcomes through `logger`.
    pub fn new(store: Arc<dyn Store>, logger: RunLogger) -> Self {
        Self { store, logger }
    }

    /// Inserts the content record with a unique slug.
    ///
    /// Status follows the schedule's `publish_automatically` flag; published
    /// records are stamped with the current time.
    #[instrument(skip(self, schedule, content, image_url), fields(schedule_id = %schedule.id(), slug = %content.slug()))]
    pub async fn persist(
        &self,
        schedule: &Schedule,
        content: FinalizedContent,
        image_url: Option<String>,
    ) -> Result<GeneratedContent, PipelineError> {
        let store = Arc::clone(&self.store);
        let slug = unique_slug(content.slug(), |candidate| {
            let store = Arc::clone(&store);
            async move { store.content_slug_exists(&candidate).await }
        })
        .await
        .map_err(persistence)?;
        if &slug != content.slug() {
            debug!(slug = %slug, "Slug taken, using suffixed slug");
        }

        let status = ContentStatus::for_auto_publish(*schedule.publish_automatically());
        let published_at = (status == ContentStatus::Published).then(Utc::now);

        let record = NewContent::builder()
            .schedule_id(*schedule.id())
            .author_id(*schedule.author_id())
            .content(content.with_slug(slug))
            .status(status)
            .published_at(published_at)
            .image_url(image_url)
            .source_language(schedule.source_language().clone())
            .build()
            .map_err(|e| PipelineError::new(PipelineErrorKind::Persistence(e.to_string())))?;

        self.store.insert_content(record).await.map_err(persistence)
    }

    /// Runs the post-commit tasks that apply to `schedule` and `source`.
    ///
    /// Never fails: each outcome is logged and returned.
    #[instrument(skip_all, fields(schedule_id = %schedule.id(), content_id = %content.id))]
    pub async fn post_commit(
        &self,
        schedule: &Schedule,
        source: &Source,
        content: &GeneratedContent,
    ) -> PostCommitReport {
        let mut report = PostCommitReport::default();

        if !schedule.category_ids().is_empty() {
            let result = self
                .store
                .attach_categories(content.id, schedule.category_ids())
                .await
                .map_err(|e| e.to_string());
            self.record(schedule, content.id, PostCommitTask::AttachCategories, result, &mut report)
                .await;
        }

        if let Some(source_id) = source.ledger_id() {
            let result = self
                .store
                .mark_source_used(*schedule.id(), source_id, source.kind_label(), Some(content.id))
                .await
                .map_err(|e| e.to_string());
            self.record(schedule, content.id, PostCommitTask::MarkSourceUsed, result, &mut report)
                .await;
        }

        let languages = translation_targets(schedule);
        if !languages.is_empty() {
            let payload = TranslationPayload {
                title: content.title.clone(),
                summary: content.summary.clone(),
                content: content.body.clone(),
            };
            let result = self
                .store
                .enqueue_translation(content.id, languages, Some(payload))
                .await
                .map(|task| report.translation_task = Some(task.id))
                .map_err(|e| e.to_string());
            self.record(
                schedule,
                content.id,
                PostCommitTask::EnqueueTranslation,
                result,
                &mut report,
            )
            .await;
        }

        report
    }

    /// Inserts a web story with a unique slug.
    #[instrument(skip_all, fields(schedule_id = %schedule.id(), slug = %script.slug, pages = pages.len()))]
    pub async fn persist_story(
        &self,
        schedule: &Schedule,
        script: StoryScript,
        pages: Vec<StoryPage>,
    ) -> Result<WebStory, PipelineError> {
        let store = Arc::clone(&self.store);
        let slug = unique_slug(&script.slug, |candidate| {
            let store = Arc::clone(&store);
            async move { store.story_slug_exists(&candidate).await }
        })
        .await
        .map_err(persistence)?;

        let status = ContentStatus::for_auto_publish(*schedule.publish_automatically());
        let story = NewWebStory {
            schedule_id: *schedule.id(),
            author_id: *schedule.author_id(),
            title: script.title,
            slug,
            summary: script.summary,
            pages,
            status,
            published_at: (status == ContentStatus::Published).then(Utc::now),
            source_language: schedule.source_language().clone(),
        };
        self.store.insert_web_story(story).await.map_err(persistence)
    }

    /// Ledger mark for a web story. Stories are not translated or categorized.
    #[instrument(skip_all, fields(schedule_id = %schedule.id(), story_id = %story.id))]
    pub async fn post_commit_story(
        &self,
        schedule: &Schedule,
        source: &Source,
        story: &WebStory,
    ) -> PostCommitReport {
        let mut report = PostCommitReport::default();
        if let Some(source_id) = source.ledger_id() {
            let result = self
                .store
                .mark_source_used(*schedule.id(), source_id, source.kind_label(), Some(story.id))
                .await
                .map_err(|e| e.to_string());
            self.record(schedule, story.id, PostCommitTask::MarkSourceUsed, result, &mut report)
                .await;
        }
        report
    }

    async fn record(
        &self,
        schedule: &Schedule,
        content_id: Uuid,
        task: PostCommitTask,
        result: Result<(), String>,
        report: &mut PostCommitReport,
    ) {
        let error = result.err();
        let details = match &error {
            Some(e) => {
                warn!(task = %task, error = %e, "Post-commit task failed");
                json!({ "post_commit": { "task": task.as_ref(), "ok": false, "error": e } })
            }
            None => json!({ "post_commit": { "task": task.as_ref(), "ok": true } }),
        };
        let message = match &error {
            Some(_) => format!("Post-commit task {} failed", task),
            None => format!("Post-commit task {} done", task),
        };
        self.logger
            .processing(*schedule.id(), Some(content_id), message, details)
            .await;
        report.outcomes.push(PostCommitOutcome { task, error });
    }
}

impl std::fmt::Debug for PersistenceWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceWriter").finish_non_exhaustive()
    }
}

/// Target languages other than the schedule's own, without duplicates.
pub fn translation_targets(schedule: &Schedule) -> Vec<String> {
    let mut languages: Vec<String> = Vec::new();
    for language in schedule.target_languages() {
        let language = language.trim();
        if language.is_empty()
            || language == schedule.source_language()
            || languages.iter().any(|l| l == language)
        {
            continue;
        }
        languages.push(language.to_string());
    }
    languages
}

/// First slug derived from `base` for which `exists` answers `false`.
///
/// Tries `base`, then up to [`SLUG_SUFFIX_ATTEMPTS`] random four-character
/// suffixes, then a UUID suffix which is returned without checking. The
/// result never exceeds [`MAX_SLUG_LEN`].
pub async fn unique_slug<F, Fut>(base: &str, mut exists: F) -> DatabaseResult<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = DatabaseResult<bool>>,
{
    if !exists(base.to_string()).await? {
        return Ok(base.to_string());
    }

    for _ in 0..SLUG_SUFFIX_ATTEMPTS {
        let suffix = format!("{:04x}", rand::thread_rng().r#gen::<u16>());
        let candidate = with_suffix(base, &suffix);
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
    }

    Ok(with_suffix(base, &Uuid::new_v4().simple().to_string()))
}

fn with_suffix(base: &str, suffix: &str) -> String {
    let room = MAX_SLUG_LEN.saturating_sub(suffix.len() + 1);
    let head = base
        .get(..room.min(base.len()))
        .unwrap_or(base)
        .trim_end_matches('-');
    if head.is_empty() {
        suffix.to_string()
    } else {
        format!("{}-{}", head, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use vesper_core::{ContentKind, is_url_safe};

    #[tokio::test]
    async fn test_unique_slug_free_base() {
        let slug = unique_slug("born-again", |_| async { Ok(false) }).await.unwrap();
        assert_eq!(slug, "born-again");
    }

    #[tokio::test]
    async fn test_unique_slug_suffixes_taken_base() {
        let taken: HashSet<String> = ["born-again".to_string()].into();
        let slug = unique_slug("born-again", |c| {
            let hit = taken.contains(&c);
            async move { Ok(hit) }
        })
        .await
        .unwrap();
        assert!(slug.starts_with("born-again-"));
        assert_eq!(slug.len(), "born-again-".len() + 4);
        assert!(is_url_safe(&slug));
    }

    #[tokio::test]
    async fn test_unique_slug_falls_back_to_uuid() {
        let calls = Mutex::new(0);
        let base = "a".repeat(MAX_SLUG_LEN);
        let slug = unique_slug(&base, |_| {
            *calls.lock().unwrap() += 1;
            async { Ok(true) }
        })
        .await
        .unwrap();
        assert_eq!(*calls.lock().unwrap(), 1 + SLUG_SUFFIX_ATTEMPTS);
        assert_eq!(slug.len(), MAX_SLUG_LEN);
        assert!(is_url_safe(&slug));
    }

    #[test]
    fn test_translation_targets_skip_source_language() {
        let schedule = Schedule::builder()
            .id(Uuid::new_v4())
            .name("daily")
            .kind(ContentKind::Devotional)
            .author_id(Uuid::new_v4())
            .source_language("pt")
            .target_languages(vec![
                "en".to_string(),
                "pt".to_string(),
                "es".to_string(),
                "en".to_string(),
            ])
            .build()
            .unwrap();
        assert_eq!(translation_targets(&schedule), vec!["en", "es"]);
    }
}
