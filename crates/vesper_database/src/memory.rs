//! In-memory implementation of the repository traits.
//!
//! Used by tests and by `vesper check-config`. Uniqueness rules match the
//! Postgres schema: one ledger row per `(schedule, source)`, unique slugs,
//! one translation per `(content, language)`.

use crate::repository::{
    ContentRepository, RunLogRepository, ScheduleRepository, SourceRepository, TranslationOutbox,
    status_after_attempt,
};
use crate::DatabaseResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;
use vesper_core::{
    ArticleSource, GeneratedContent, NewContent, NewWebStory, RunLogEntry, Schedule, TaskStatus,
    Translation, TranslationPayload, TranslationTask, VerseSource, WebStory,
};
use vesper_error::{DatabaseError, DatabaseErrorKind};

#[derive(Debug, Clone)]
struct LedgerRecord {
    schedule_id: Uuid,
    source_id: Uuid,
}

#[derive(Debug, Default)]
struct Tables {
    schedules: HashMap<Uuid, Schedule>,
    verses: Vec<VerseSource>,
    articles: Vec<ArticleSource>,
    ledger: Vec<LedgerRecord>,
    contents: Vec<GeneratedContent>,
    categories: BTreeSet<(Uuid, Uuid)>,
    translations: BTreeMap<(Uuid, String), Translation>,
    run_logs: Vec<RunLogEntry>,
    tasks: Vec<TranslationTask>,
    stories: Vec<WebStory>,
}

impl Tables {
    fn is_used(&self, schedule_id: Uuid, source_id: Uuid) -> bool {
        self.ledger
            .iter()
            .any(|r| r.schedule_id == schedule_id && r.source_id == source_id)
    }

    fn task_mut(&mut self, task_id: Uuid) -> DatabaseResult<&mut TranslationTask> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| DatabaseError::new(DatabaseErrorKind::NotFound))
    }
}

/// Thread-safe in-memory store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a schedule.
    pub async fn upsert_schedule(&self, schedule: Schedule) {
        let mut tables = self.tables.write().await;
        tables.schedules.insert(*schedule.id(), schedule);
    }

    /// Adds a verse to the pool.
    pub async fn add_verse(&self, verse: VerseSource) {
        self.tables.write().await.verses.push(verse);
    }

    /// Adds an article to the pool.
    pub async fn add_article(&self, article: ArticleSource) {
        self.tables.write().await.articles.push(article);
    }

    /// Every stored content record, oldest first.
    pub async fn all_contents(&self) -> Vec<GeneratedContent> {
        self.tables.read().await.contents.clone()
    }

    /// Every stored web story, oldest first.
    pub async fn all_stories(&self) -> Vec<WebStory> {
        self.tables.read().await.stories.clone()
    }

    /// Every outbox task, oldest first.
    pub async fn all_tasks(&self) -> Vec<TranslationTask> {
        self.tables.read().await.tasks.clone()
    }
}

#[async_trait]
impl ScheduleRepository for InMemoryStore {
    async fn get_schedule(&self, id: Uuid) -> DatabaseResult<Option<Schedule>> {
        Ok(self.tables.read().await.schedules.get(&id).cloned())
    }

    async fn list_active_schedules(&self) -> DatabaseResult<Vec<Schedule>> {
        let tables = self.tables.read().await;
        let mut active: Vec<Schedule> = tables
            .schedules
            .values()
            .filter(|s| *s.active())
            .cloned()
            .collect();
        active.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(active)
    }
}

#[async_trait]
impl SourceRepository for InMemoryStore {
    async fn random_unused_verse(&self, schedule_id: Uuid) -> DatabaseResult<Option<VerseSource>> {
        let tables = self.tables.read().await;
        let eligible: Vec<&VerseSource> = tables
            .verses
            .iter()
            .filter(|v| !tables.is_used(schedule_id, v.id))
            .collect();
        Ok(eligible
            .choose(&mut rand::thread_rng())
            .map(|v| (*v).clone()))
    }

    async fn newest_unused_article(
        &self,
        schedule_id: Uuid,
        category_id: Option<Uuid>,
    ) -> DatabaseResult<Option<ArticleSource>> {
        let tables = self.tables.read().await;
        Ok(tables
            .articles
            .iter()
            .filter(|a| !tables.is_used(schedule_id, a.id))
            .filter(|a| category_id.is_none() || a.category_id == category_id)
            .max_by_key(|a| a.published_at)
            .cloned())
    }

    async fn mark_source_used(
        &self,
        schedule_id: Uuid,
        source_id: Uuid,
        _source_kind: &str,
        _content_id: Option<Uuid>,
    ) -> DatabaseResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.is_used(schedule_id, source_id) {
            tables.ledger.push(LedgerRecord {
                schedule_id,
                source_id,
            });
        }
        Ok(())
    }

    async fn used_sources(&self, schedule_id: Uuid) -> DatabaseResult<Vec<Uuid>> {
        Ok(self
            .tables
            .read()
            .await
            .ledger
            .iter()
            .filter(|r| r.schedule_id == schedule_id)
            .map(|r| r.source_id)
            .collect())
    }
}

#[async_trait]
impl ContentRepository for InMemoryStore {
    async fn content_slug_exists(&self, slug: &str) -> DatabaseResult<bool> {
        Ok(self
            .tables
            .read()
            .await
            .contents
            .iter()
            .any(|c| c.slug == slug))
    }

    async fn insert_content(&self, content: NewContent) -> DatabaseResult<GeneratedContent> {
        let mut tables = self.tables.write().await;
        let finalized = content.content();
        if tables.contents.iter().any(|c| &c.slug == finalized.slug()) {
            return Err(DatabaseError::new(DatabaseErrorKind::Query(format!(
                "duplicate key value violates unique constraint \"contents_slug_key\": {}",
                finalized.slug()
            ))));
        }

        let stored = GeneratedContent {
            id: Uuid::new_v4(),
            schedule_id: Some(*content.schedule_id()),
            author_id: *content.author_id(),
            title: finalized.title().clone(),
            slug: finalized.slug().clone(),
            body: finalized.body().clone(),
            summary: finalized.summary().clone(),
            seo_title: finalized.seo_title().clone(),
            seo_description: finalized.seo_description().clone(),
            status: *content.status(),
            published_at: *content.published_at(),
            image_url: content.image_url().clone(),
            source_language: content.source_language().clone(),
            created_at: Utc::now(),
        };
        tables.contents.push(stored.clone());
        Ok(stored)
    }

    async fn get_content(&self, id: Uuid) -> DatabaseResult<Option<GeneratedContent>> {
        Ok(self
            .tables
            .read()
            .await
            .contents
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn attach_categories(
        &self,
        content_id: Uuid,
        category_ids: &[Uuid],
    ) -> DatabaseResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.contents.iter().any(|c| c.id == content_id) {
            return Err(DatabaseError::new(DatabaseErrorKind::NotFound));
        }
        for category_id in category_ids {
            tables.categories.insert((content_id, *category_id));
        }
        Ok(())
    }

    async fn categories_for(&self, content_id: Uuid) -> DatabaseResult<Vec<Uuid>> {
        Ok(self
            .tables
            .read()
            .await
            .categories
            .iter()
            .filter(|(c, _)| *c == content_id)
            .map(|(_, category)| *category)
            .collect())
    }

    async fn upsert_translation(&self, translation: Translation) -> DatabaseResult<()> {
        let mut tables = self.tables.write().await;
        let key = (translation.content_id, translation.language.clone());
        tables.translations.insert(key, translation);
        Ok(())
    }

    async fn translations_for(&self, content_id: Uuid) -> DatabaseResult<Vec<Translation>> {
        Ok(self
            .tables
            .read()
            .await
            .translations
            .values()
            .filter(|t| t.content_id == content_id)
            .cloned()
            .collect())
    }

    async fn story_slug_exists(&self, slug: &str) -> DatabaseResult<bool> {
        Ok(self
            .tables
            .read()
            .await
            .stories
            .iter()
            .any(|s| s.story.slug == slug))
    }

    async fn insert_web_story(&self, story: NewWebStory) -> DatabaseResult<WebStory> {
        let mut tables = self.tables.write().await;
        if tables.stories.iter().any(|s| s.story.slug == story.slug) {
            return Err(DatabaseError::new(DatabaseErrorKind::Query(format!(
                "duplicate key value violates unique constraint \"web_stories_slug_key\": {}",
                story.slug
            ))));
        }
        let stored = WebStory {
            id: Uuid::new_v4(),
            story,
            created_at: Utc::now(),
        };
        tables.stories.push(stored.clone());
        Ok(stored)
    }
}

#[async_trait]
impl RunLogRepository for InMemoryStore {
    async fn append_run_log(&self, entry: RunLogEntry) -> DatabaseResult<()> {
        self.tables.write().await.run_logs.push(entry);
        Ok(())
    }

    async fn run_logs_for(&self, schedule_id: Uuid) -> DatabaseResult<Vec<RunLogEntry>> {
        Ok(self
            .tables
            .read()
            .await
            .run_logs
            .iter()
            .filter(|e| e.schedule_id == schedule_id)
            .cloned()
            .collect())
    }

    async fn last_terminal_run(&self, schedule_id: Uuid) -> DatabaseResult<Option<DateTime<Utc>>> {
        Ok(self
            .tables
            .read()
            .await
            .run_logs
            .iter()
            .filter(|e| e.schedule_id == schedule_id && e.status.is_terminal())
            .map(|e| e.created_at)
            .max())
    }
}

#[async_trait]
impl TranslationOutbox for InMemoryStore {
    async fn enqueue_translation(
        &self,
        content_id: Uuid,
        languages: Vec<String>,
        payload: Option<TranslationPayload>,
    ) -> DatabaseResult<TranslationTask> {
        let mut tables = self.tables.write().await;
        if !tables.contents.iter().any(|c| c.id == content_id) {
            return Err(DatabaseError::new(DatabaseErrorKind::NotFound));
        }
        let now = Utc::now();
        let task = TranslationTask {
            id: Uuid::new_v4(),
            content_id,
            languages,
            payload,
            status: TaskStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.push(task.clone());
        Ok(task)
    }

    async fn pending_tasks(&self, limit: usize) -> DatabaseResult<Vec<TranslationTask>> {
        Ok(self
            .tables
            .read()
            .await
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn complete_task(&self, task_id: Uuid) -> DatabaseResult<()> {
        let mut tables = self.tables.write().await;
        let task = tables.task_mut(task_id)?;
        task.status = TaskStatus::Done;
        task.last_error = None;
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn reschedule_task(
        &self,
        task_id: Uuid,
        remaining: Vec<String>,
        error: String,
        max_attempts: i32,
    ) -> DatabaseResult<TaskStatus> {
        let mut tables = self.tables.write().await;
        let task = tables.task_mut(task_id)?;
        task.attempts += 1;
        task.languages = remaining;
        task.last_error = Some(error);
        task.status = status_after_attempt(task.attempts, max_attempts);
        task.updated_at = Utc::now();
        Ok(task.status)
    }

    async fn get_task(&self, task_id: Uuid) -> DatabaseResult<Option<TranslationTask>> {
        Ok(self
            .tables
            .read()
            .await
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .cloned())
    }
}
