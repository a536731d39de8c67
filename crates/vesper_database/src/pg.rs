//! PostgreSQL implementation of the repository traits.

use crate::models::{
    ArticleRow, ContentCategoryRow, ContentRow, NewTranslationRow, NewUsedSourceRow, RunLogRow,
    ScheduleRow, TranslationRow, TranslationTaskRow, VerseRow, WebStoryRow,
};
use crate::repository::{
    ContentRepository, RunLogRepository, ScheduleRepository, SourceRepository, TranslationOutbox,
    status_after_attempt,
};
use crate::schema::{
    bible_verses, content_categories, content_translations, contents, run_logs, schedules,
    source_articles, translation_tasks, used_sources, web_stories,
};
use crate::{DatabaseResult, DbPool};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::{exists, not, sql};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;
use tracing::{debug, instrument};
use uuid::Uuid;
use vesper_core::{
    ArticleSource, GeneratedContent, NewContent, NewWebStory, RunLogEntry, RunStatus, Schedule,
    TaskStatus, Translation, TranslationPayload, TranslationTask, VerseSource, WebStory,
};
use vesper_error::{DatabaseError, DatabaseErrorKind};

/// Repository backed by a Postgres connection pool.
///
/// Diesel is synchronous, so every call runs on the blocking thread pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl std::fmt::Debug for PgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStore")
            .field("max_size", &self.pool.max_size())
            .finish()
    }
}

impl PgStore {
    /// Wraps an existing pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn run<T, F>(&self, f: F) -> DatabaseResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> DatabaseResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|e| DatabaseError::new(DatabaseErrorKind::Connection(e.to_string())))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| {
            DatabaseError::new(DatabaseErrorKind::Query(format!("Task join error: {}", e)))
        })?
    }

    /// Inserts or replaces a schedule.
    #[instrument(skip(self, schedule), fields(schedule_id = %schedule.id()))]
    pub async fn upsert_schedule(&self, schedule: &Schedule) -> DatabaseResult<()> {
        let row = ScheduleRow::from_schedule(schedule);
        self.run(move |conn| {
            diesel::insert_into(schedules::table)
                .values(&row)
                .on_conflict(schedules::id)
                .do_update()
                .set((
                    schedules::name.eq(excluded(schedules::name)),
                    schedules::kind.eq(excluded(schedules::kind)),
                    schedules::output.eq(excluded(schedules::output)),
                    schedules::theme.eq(excluded(schedules::theme)),
                    schedules::author_id.eq(excluded(schedules::author_id)),
                    schedules::category_ids.eq(excluded(schedules::category_ids)),
                    schedules::source_category_id.eq(excluded(schedules::source_category_id)),
                    schedules::image_prompt_template
                        .eq(excluded(schedules::image_prompt_template)),
                    schedules::require_image.eq(excluded(schedules::require_image)),
                    schedules::publish_automatically
                        .eq(excluded(schedules::publish_automatically)),
                    schedules::source_language.eq(excluded(schedules::source_language)),
                    schedules::target_languages.eq(excluded(schedules::target_languages)),
                    schedules::active.eq(excluded(schedules::active)),
                    schedules::cron_expression.eq(excluded(schedules::cron_expression)),
                ))
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    /// Adds verses to the verse pool, skipping existing references.
    pub async fn insert_verses(&self, verses: &[VerseSource]) -> DatabaseResult<usize> {
        let rows: Vec<VerseRow> = verses.iter().map(VerseRow::from).collect();
        self.run(move |conn| {
            Ok(diesel::insert_into(bible_verses::table)
                .values(&rows)
                .on_conflict_do_nothing()
                .execute(conn)?)
        })
        .await
    }

    /// Adds articles to the article pool.
    pub async fn insert_articles(&self, articles: &[ArticleSource]) -> DatabaseResult<usize> {
        let rows: Vec<ArticleRow> = articles.iter().map(ArticleRow::from).collect();
        self.run(move |conn| {
            Ok(diesel::insert_into(source_articles::table)
                .values(&rows)
                .on_conflict_do_nothing()
                .execute(conn)?)
        })
        .await
    }
}

#[async_trait]
impl ScheduleRepository for PgStore {
    #[instrument(skip(self))]
    async fn get_schedule(&self, id: Uuid) -> DatabaseResult<Option<Schedule>> {
        self.run(move |conn| {
            schedules::table
                .find(id)
                .select(ScheduleRow::as_select())
                .first(conn)
                .optional()?
                .map(ScheduleRow::into_schedule)
                .transpose()
        })
        .await
    }

    #[instrument(skip(self))]
    async fn list_active_schedules(&self) -> DatabaseResult<Vec<Schedule>> {
        self.run(|conn| {
            schedules::table
                .filter(schedules::active.eq(true))
                .order(schedules::created_at.asc())
                .select(ScheduleRow::as_select())
                .load(conn)?
                .into_iter()
                .map(ScheduleRow::into_schedule)
                .collect()
        })
        .await
    }
}

#[async_trait]
impl SourceRepository for PgStore {
    #[instrument(skip(self))]
    async fn random_unused_verse(&self, schedule_id: Uuid) -> DatabaseResult<Option<VerseSource>> {
        self.run(move |conn| {
            let used = used_sources::table
                .filter(used_sources::schedule_id.eq(schedule_id))
                .select(used_sources::source_id);

            let verse = bible_verses::table
                .filter(not(bible_verses::id.eq_any(used)))
                .order(sql::<diesel::sql_types::Double>("RANDOM()"))
                .select(VerseRow::as_select())
                .first(conn)
                .optional()?;
            Ok(verse.map(VerseSource::from))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn newest_unused_article(
        &self,
        schedule_id: Uuid,
        category_id: Option<Uuid>,
    ) -> DatabaseResult<Option<ArticleSource>> {
        self.run(move |conn| {
            let used = used_sources::table
                .filter(used_sources::schedule_id.eq(schedule_id))
                .select(used_sources::source_id);

            let mut query = source_articles::table
                .filter(not(source_articles::id.eq_any(used)))
                .into_boxed();
            if let Some(category_id) = category_id {
                query = query.filter(source_articles::category_id.eq(category_id));
            }

            let article = query
                .order(source_articles::published_at.desc())
                .select(ArticleRow::as_select())
                .first(conn)
                .optional()?;
            Ok(article.map(ArticleSource::from))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn mark_source_used(
        &self,
        schedule_id: Uuid,
        source_id: Uuid,
        source_kind: &str,
        content_id: Option<Uuid>,
    ) -> DatabaseResult<()> {
        let row = NewUsedSourceRow {
            id: Uuid::new_v4(),
            schedule_id,
            source_id,
            source_kind: source_kind.to_string(),
            content_id,
        };
        self.run(move |conn| {
            let inserted = diesel::insert_into(used_sources::table)
                .values(&row)
                .on_conflict((used_sources::schedule_id, used_sources::source_id))
                .do_nothing()
                .execute(conn)?;
            debug!(inserted, "Ledger write");
            Ok(())
        })
        .await
    }

    async fn used_sources(&self, schedule_id: Uuid) -> DatabaseResult<Vec<Uuid>> {
        self.run(move |conn| {
            Ok(used_sources::table
                .filter(used_sources::schedule_id.eq(schedule_id))
                .order(used_sources::used_at.asc())
                .select(used_sources::source_id)
                .load(conn)?)
        })
        .await
    }
}

#[async_trait]
impl ContentRepository for PgStore {
    async fn content_slug_exists(&self, slug: &str) -> DatabaseResult<bool> {
        let slug = slug.to_string();
        self.run(move |conn| {
            Ok(diesel::select(exists(
                contents::table.filter(contents::slug.eq(slug)),
            ))
            .get_result(conn)?)
        })
        .await
    }

    #[instrument(skip(self, content), fields(slug = %content.content().slug()))]
    async fn insert_content(&self, content: NewContent) -> DatabaseResult<GeneratedContent> {
        let row = ContentRow::from_new(&content);
        self.run(move |conn| {
            diesel::insert_into(contents::table)
                .values(&row)
                .returning(ContentRow::as_returning())
                .get_result(conn)?
                .into_content()
        })
        .await
    }

    async fn get_content(&self, id: Uuid) -> DatabaseResult<Option<GeneratedContent>> {
        self.run(move |conn| {
            contents::table
                .find(id)
                .select(ContentRow::as_select())
                .first(conn)
                .optional()?
                .map(ContentRow::into_content)
                .transpose()
        })
        .await
    }

    #[instrument(skip(self, category_ids), fields(count = category_ids.len()))]
    async fn attach_categories(
        &self,
        content_id: Uuid,
        category_ids: &[Uuid],
    ) -> DatabaseResult<()> {
        let rows: Vec<ContentCategoryRow> = category_ids
            .iter()
            .map(|category_id| ContentCategoryRow {
                content_id,
                category_id: *category_id,
            })
            .collect();
        if rows.is_empty() {
            return Ok(());
        }
        self.run(move |conn| {
            diesel::insert_into(content_categories::table)
                .values(&rows)
                .on_conflict_do_nothing()
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn categories_for(&self, content_id: Uuid) -> DatabaseResult<Vec<Uuid>> {
        self.run(move |conn| {
            Ok(content_categories::table
                .filter(content_categories::content_id.eq(content_id))
                .select(content_categories::category_id)
                .load(conn)?)
        })
        .await
    }

    #[instrument(skip(self, translation), fields(content_id = %translation.content_id, language = %translation.language))]
    async fn upsert_translation(&self, translation: Translation) -> DatabaseResult<()> {
        let row = NewTranslationRow::from(&translation);
        self.run(move |conn| {
            diesel::insert_into(content_translations::table)
                .values(&row)
                .on_conflict((
                    content_translations::content_id,
                    content_translations::language,
                ))
                .do_update()
                .set((
                    content_translations::title.eq(excluded(content_translations::title)),
                    content_translations::summary.eq(excluded(content_translations::summary)),
                    content_translations::body.eq(excluded(content_translations::body)),
                    content_translations::updated_at.eq(diesel::dsl::now),
                ))
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn translations_for(&self, content_id: Uuid) -> DatabaseResult<Vec<Translation>> {
        self.run(move |conn| {
            Ok(content_translations::table
                .filter(content_translations::content_id.eq(content_id))
                .order(content_translations::language.asc())
                .select(TranslationRow::as_select())
                .load(conn)?
                .into_iter()
                .map(Translation::from)
                .collect())
        })
        .await
    }

    async fn story_slug_exists(&self, slug: &str) -> DatabaseResult<bool> {
        let slug = slug.to_string();
        self.run(move |conn| {
            Ok(diesel::select(exists(
                web_stories::table.filter(web_stories::slug.eq(slug)),
            ))
            .get_result(conn)?)
        })
        .await
    }

    #[instrument(skip(self, story), fields(slug = %story.slug, pages = story.pages.len()))]
    async fn insert_web_story(&self, story: NewWebStory) -> DatabaseResult<WebStory> {
        let row = WebStoryRow::from_new(&story)?;
        self.run(move |conn| {
            diesel::insert_into(web_stories::table)
                .values(&row)
                .returning(WebStoryRow::as_returning())
                .get_result(conn)?
                .into_story()
        })
        .await
    }
}

#[async_trait]
impl RunLogRepository for PgStore {
    async fn append_run_log(&self, entry: RunLogEntry) -> DatabaseResult<()> {
        let row = RunLogRow::from(&entry);
        self.run(move |conn| {
            diesel::insert_into(run_logs::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn run_logs_for(&self, schedule_id: Uuid) -> DatabaseResult<Vec<RunLogEntry>> {
        self.run(move |conn| {
            run_logs::table
                .filter(run_logs::schedule_id.eq(schedule_id))
                .order(run_logs::created_at.asc())
                .select(RunLogRow::as_select())
                .load(conn)?
                .into_iter()
                .map(RunLogRow::into_entry)
                .collect()
        })
        .await
    }

    async fn last_terminal_run(&self, schedule_id: Uuid) -> DatabaseResult<Option<DateTime<Utc>>> {
        self.run(move |conn| {
            Ok(run_logs::table
                .filter(run_logs::schedule_id.eq(schedule_id))
                .filter(run_logs::status.ne(RunStatus::Processing.to_string()))
                .order(run_logs::created_at.desc())
                .select(run_logs::created_at)
                .first::<DateTime<Utc>>(conn)
                .optional()?)
        })
        .await
    }
}

#[async_trait]
impl TranslationOutbox for PgStore {
    #[instrument(skip(self, payload), fields(languages = ?languages))]
    async fn enqueue_translation(
        &self,
        content_id: Uuid,
        languages: Vec<String>,
        payload: Option<TranslationPayload>,
    ) -> DatabaseResult<TranslationTask> {
        let row = TranslationTaskRow::pending(content_id, languages, payload.as_ref())?;
        self.run(move |conn| {
            diesel::insert_into(translation_tasks::table)
                .values(&row)
                .returning(TranslationTaskRow::as_returning())
                .get_result(conn)?
                .into_task()
        })
        .await
    }

    async fn pending_tasks(&self, limit: usize) -> DatabaseResult<Vec<TranslationTask>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.run(move |conn| {
            translation_tasks::table
                .filter(translation_tasks::status.eq(TaskStatus::Pending.to_string()))
                .order(translation_tasks::created_at.asc())
                .limit(limit)
                .select(TranslationTaskRow::as_select())
                .load(conn)?
                .into_iter()
                .map(TranslationTaskRow::into_task)
                .collect()
        })
        .await
    }

    async fn complete_task(&self, task_id: Uuid) -> DatabaseResult<()> {
        self.run(move |conn| {
            let updated = diesel::update(translation_tasks::table.find(task_id))
                .set((
                    translation_tasks::status.eq(TaskStatus::Done.to_string()),
                    translation_tasks::last_error.eq(None::<String>),
                    translation_tasks::updated_at.eq(diesel::dsl::now),
                ))
                .execute(conn)?;
            if updated == 0 {
                return Err(DatabaseError::new(DatabaseErrorKind::NotFound));
            }
            Ok(())
        })
        .await
    }

    async fn reschedule_task(
        &self,
        task_id: Uuid,
        remaining: Vec<String>,
        error: String,
        max_attempts: i32,
    ) -> DatabaseResult<TaskStatus> {
        self.run(move |conn| {
            conn.transaction(|conn| {
                let attempts: i32 = translation_tasks::table
                    .find(task_id)
                    .select(translation_tasks::attempts)
                    .for_update()
                    .first(conn)?;
                let attempts = attempts + 1;
                let status = status_after_attempt(attempts, max_attempts);

                diesel::update(translation_tasks::table.find(task_id))
                    .set((
                        translation_tasks::languages.eq(&remaining),
                        translation_tasks::attempts.eq(attempts),
                        translation_tasks::last_error.eq(Some(&error)),
                        translation_tasks::status.eq(status.to_string()),
                        translation_tasks::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)?;
                Ok(status)
            })
        })
        .await
    }

    async fn get_task(&self, task_id: Uuid) -> DatabaseResult<Option<TranslationTask>> {
        self.run(move |conn| {
            translation_tasks::table
                .find(task_id)
                .select(TranslationTaskRow::as_select())
                .first(conn)
                .optional()?
                .map(TranslationTaskRow::into_task)
                .transpose()
        })
        .await
    }
}
