//! Diesel row models and their conversions to domain types.

use crate::schema::{
    bible_verses, content_categories, content_translations, contents, run_logs, schedules,
    source_articles, translation_tasks, used_sources, web_stories,
};
use crate::DatabaseResult;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::str::FromStr;
use uuid::Uuid;
use vesper_core::{
    ArticleSource, ContentKind, ContentStatus, GeneratedContent, NewContent, NewWebStory,
    RunLogEntry, RunStatus, Schedule, ScheduleOutput, StoryPage, TaskStatus, Translation,
    TranslationPayload, TranslationTask, VerseSource, WebStory,
};
use vesper_error::{DatabaseError, DatabaseErrorKind};

#[track_caller]
fn parse_column<T: FromStr>(column: &str, value: &str) -> DatabaseResult<T> {
    T::from_str(value).map_err(|_| {
        DatabaseError::new(DatabaseErrorKind::Serialization(format!(
            "unexpected {} value '{}'",
            column, value
        )))
    })
}

/// Database row for the schedules table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = schedules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ScheduleRow {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub output: String,
    pub theme: Option<String>,
    pub author_id: Uuid,
    pub category_ids: Vec<Uuid>,
    pub source_category_id: Option<Uuid>,
    pub image_prompt_template: Option<String>,
    pub require_image: bool,
    pub publish_automatically: bool,
    pub source_language: String,
    pub target_languages: Vec<String>,
    pub active: bool,
    pub cron_expression: String,
    pub created_at: DateTime<Utc>,
}

impl ScheduleRow {
    /// Row for a domain schedule.
    pub fn from_schedule(schedule: &Schedule) -> Self {
        Self {
            id: *schedule.id(),
            name: schedule.name().clone(),
            kind: schedule.kind().to_string(),
            output: schedule.output().to_string(),
            theme: schedule.theme().clone(),
            author_id: *schedule.author_id(),
            category_ids: schedule.category_ids().clone(),
            source_category_id: *schedule.source_category_id(),
            image_prompt_template: schedule.image_prompt_template().clone(),
            require_image: *schedule.require_image(),
            publish_automatically: *schedule.publish_automatically(),
            source_language: schedule.source_language().clone(),
            target_languages: schedule.target_languages().clone(),
            active: *schedule.active(),
            cron_expression: schedule.cron_expression().clone(),
            created_at: Utc::now(),
        }
    }

    /// Converts the row into a domain schedule.
    pub fn into_schedule(self) -> DatabaseResult<Schedule> {
        let kind: ContentKind = parse_column("schedules.kind", &self.kind)?;
        let output: ScheduleOutput = parse_column("schedules.output", &self.output)?;
        Schedule::builder()
            .id(self.id)
            .name(self.name)
            .kind(kind)
            .output(output)
            .theme(self.theme)
            .author_id(self.author_id)
            .category_ids(self.category_ids)
            .source_category_id(self.source_category_id)
            .image_prompt_template(self.image_prompt_template)
            .require_image(self.require_image)
            .publish_automatically(self.publish_automatically)
            .source_language(self.source_language)
            .target_languages(self.target_languages)
            .active(self.active)
            .cron_expression(self.cron_expression)
            .build()
            .map_err(|e| DatabaseError::new(DatabaseErrorKind::Serialization(e.to_string())))
    }
}

/// Database row for the bible_verses table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = bible_verses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VerseRow {
    pub id: Uuid,
    pub book: String,
    pub chapter: i32,
    pub verse: i32,
    pub text: String,
}

impl From<VerseRow> for VerseSource {
    fn from(row: VerseRow) -> Self {
        VerseSource {
            id: row.id,
            book: row.book,
            chapter: row.chapter,
            verse: row.verse,
            text: row.text,
        }
    }
}

impl From<&VerseSource> for VerseRow {
    fn from(verse: &VerseSource) -> Self {
        VerseRow {
            id: verse.id,
            book: verse.book.clone(),
            chapter: verse.chapter,
            verse: verse.verse,
            text: verse.text.clone(),
        }
    }
}

/// Database row for the source_articles table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = source_articles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ArticleRow {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub category_id: Option<Uuid>,
    pub published_at: DateTime<Utc>,
}

impl From<ArticleRow> for ArticleSource {
    fn from(row: ArticleRow) -> Self {
        ArticleSource {
            id: row.id,
            title: row.title,
            body: row.body,
            category_id: row.category_id,
            published_at: row.published_at,
        }
    }
}

impl From<&ArticleSource> for ArticleRow {
    fn from(article: &ArticleSource) -> Self {
        ArticleRow {
            id: article.id,
            title: article.title.clone(),
            body: article.body.clone(),
            category_id: article.category_id,
            published_at: article.published_at,
        }
    }
}

/// Insertable ledger record.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = used_sources)]
pub struct NewUsedSourceRow {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub source_id: Uuid,
    pub source_kind: String,
    pub content_id: Option<Uuid>,
}

/// Database row for the contents table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = contents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ContentRow {
    pub id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub summary: Option<String>,
    pub seo_title: String,
    pub seo_description: String,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub source_language: String,
    pub created_at: DateTime<Utc>,
}

impl ContentRow {
    /// Insertable row for new content with a fresh id.
    pub fn from_new(new: &NewContent) -> Self {
        let content = new.content();
        Self {
            id: Uuid::new_v4(),
            schedule_id: Some(*new.schedule_id()),
            author_id: *new.author_id(),
            title: content.title().clone(),
            slug: content.slug().clone(),
            body: content.body().clone(),
            summary: content.summary().clone(),
            seo_title: content.seo_title().clone(),
            seo_description: content.seo_description().clone(),
            status: new.status().to_string(),
            published_at: *new.published_at(),
            image_url: new.image_url().clone(),
            source_language: new.source_language().clone(),
            created_at: Utc::now(),
        }
    }

    /// Converts the row into stored content.
    pub fn into_content(self) -> DatabaseResult<GeneratedContent> {
        let status: ContentStatus = parse_column("contents.status", &self.status)?;
        Ok(GeneratedContent {
            id: self.id,
            schedule_id: self.schedule_id,
            author_id: self.author_id,
            title: self.title,
            slug: self.slug,
            body: self.body,
            summary: self.summary,
            seo_title: self.seo_title,
            seo_description: self.seo_description,
            status,
            published_at: self.published_at,
            image_url: self.image_url,
            source_language: self.source_language,
            created_at: self.created_at,
        })
    }
}

/// Insertable content/category association.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = content_categories)]
pub struct ContentCategoryRow {
    pub content_id: Uuid,
    pub category_id: Uuid,
}

/// Database row for the content_translations table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = content_translations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TranslationRow {
    pub id: Uuid,
    pub content_id: Uuid,
    pub language: String,
    pub title: String,
    pub summary: Option<String>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TranslationRow> for Translation {
    fn from(row: TranslationRow) -> Self {
        Translation {
            content_id: row.content_id,
            language: row.language,
            title: row.title,
            summary: row.summary,
            body: row.body,
        }
    }
}

/// Insertable translation.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = content_translations)]
pub struct NewTranslationRow {
    pub id: Uuid,
    pub content_id: Uuid,
    pub language: String,
    pub title: String,
    pub summary: Option<String>,
    pub body: String,
}

impl From<&Translation> for NewTranslationRow {
    fn from(t: &Translation) -> Self {
        NewTranslationRow {
            id: Uuid::new_v4(),
            content_id: t.content_id,
            language: t.language.clone(),
            title: t.title.clone(),
            summary: t.summary.clone(),
            body: t.body.clone(),
        }
    }
}

/// Database row for the run_logs table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = run_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RunLogRow {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub content_id: Option<Uuid>,
    pub status: String,
    pub message: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<&RunLogEntry> for RunLogRow {
    fn from(entry: &RunLogEntry) -> Self {
        RunLogRow {
            id: Uuid::new_v4(),
            schedule_id: entry.schedule_id,
            content_id: entry.content_id,
            status: entry.status.to_string(),
            message: entry.message.clone(),
            details: entry.details.clone(),
            created_at: entry.created_at,
        }
    }
}

impl RunLogRow {
    /// Converts the row into a run log entry.
    pub fn into_entry(self) -> DatabaseResult<RunLogEntry> {
        let status: RunStatus = parse_column("run_logs.status", &self.status)?;
        Ok(RunLogEntry {
            schedule_id: self.schedule_id,
            content_id: self.content_id,
            status,
            message: self.message,
            details: self.details,
            created_at: self.created_at,
        })
    }
}

/// Database row for the translation_tasks table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = translation_tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TranslationTaskRow {
    pub id: Uuid,
    pub content_id: Uuid,
    pub languages: Vec<String>,
    pub payload: Option<serde_json::Value>,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TranslationTaskRow {
    /// Pending row for a new task.
    pub fn pending(
        content_id: Uuid,
        languages: Vec<String>,
        payload: Option<&TranslationPayload>,
    ) -> DatabaseResult<Self> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            content_id,
            languages,
            payload: payload.map(serde_json::to_value).transpose()?,
            status: TaskStatus::Pending.to_string(),
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Converts the row into an outbox task.
    pub fn into_task(self) -> DatabaseResult<TranslationTask> {
        let status: TaskStatus = parse_column("translation_tasks.status", &self.status)?;
        let payload = self.payload.map(serde_json::from_value).transpose()?;
        Ok(TranslationTask {
            id: self.id,
            content_id: self.content_id,
            languages: self.languages,
            payload,
            status,
            attempts: self.attempts,
            last_error: self.last_error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Database row for the web_stories table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = web_stories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WebStoryRow {
    pub id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub author_id: Uuid,
    pub title: String,
    pub slug: String,
    pub summary: Option<String>,
    pub pages: serde_json::Value,
    pub status: String,
    pub published_at: Option<DateTime<Utc>>,
    pub source_language: String,
    pub created_at: DateTime<Utc>,
}

impl WebStoryRow {
    /// Insertable row for a new story with a fresh id.
    pub fn from_new(story: &NewWebStory) -> DatabaseResult<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            schedule_id: Some(story.schedule_id),
            author_id: story.author_id,
            title: story.title.clone(),
            slug: story.slug.clone(),
            summary: story.summary.clone(),
            pages: serde_json::to_value(&story.pages)?,
            status: story.status.to_string(),
            published_at: story.published_at,
            source_language: story.source_language.clone(),
            created_at: Utc::now(),
        })
    }

    /// Converts the row into a stored story.
    pub fn into_story(self) -> DatabaseResult<WebStory> {
        let status: ContentStatus = parse_column("web_stories.status", &self.status)?;
        let pages: Vec<StoryPage> = serde_json::from_value(self.pages)?;
        Ok(WebStory {
            id: self.id,
            story: NewWebStory {
                // Orphaned stories keep a nil schedule id
                schedule_id: self.schedule_id.unwrap_or_default(),
                author_id: self.author_id,
                title: self.title,
                slug: self.slug,
                summary: self.summary,
                pages,
                status,
                published_at: self.published_at,
                source_language: self.source_language,
            },
            created_at: self.created_at,
        })
    }
}
