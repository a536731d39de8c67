//! Fakes and fixtures shared by the pipeline integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use vesper_core::{
    ArticleSource, ContentKind, GenerateRequest, GenerateResponse, GeneratedContent, NewContent,
    NewWebStory, Role, RunLogEntry, Schedule, TaskStatus, Translation, TranslationPayload,
    TranslationTask, VerseSource, WebStory,
};
use vesper_database::{
    ContentRepository, DatabaseResult, InMemoryStore, RunLogRepository, ScheduleRepository,
    SourceRepository, Store, TranslationOutbox,
};
use vesper_error::{
    DatabaseError, DatabaseErrorKind, ModelError, ModelErrorKind, StorageError, StorageErrorKind,
};
use vesper_models::{GeneratedImage, ImageGenerator, TextGenerator};
use vesper_pipeline::{
    ContentPipeline, DraftGenerator, PipelineDependencies, PipelineSettings, RefinementChain,
    RefinementProvider,
};
use vesper_storage::MediaStore;

type Responder = dyn Fn(&GenerateRequest) -> Result<String, ModelError> + Send + Sync;

/// Text generator answering through a closure and recording user prompts.
pub struct FakeText {
    name: String,
    responder: Box<Responder>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeText {
    pub fn new(
        name: &str,
        responder: impl Fn(&GenerateRequest) -> Result<String, ModelError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Always answers `text`.
    pub fn always(name: &str, text: &str) -> Arc<Self> {
        let text = text.to_string();
        Self::new(name, move |_| Ok(text.clone()))
    }

    /// Always fails with a 503.
    pub fn failing(name: &str) -> Arc<Self> {
        Self::new(name, |_| {
            Err(ModelError::new(ModelErrorKind::Api {
                status: 503,
                message: "overloaded".to_string(),
            }))
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for FakeText {
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(user) = req.messages().iter().find(|m| *m.role() == Role::User) {
            self.prompts.lock().unwrap().push(user.content().clone());
        }
        (self.responder)(req).map(|text| GenerateResponse::new(text, None))
    }

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}

/// System instruction of a request.
pub fn system_text(req: &GenerateRequest) -> String {
    req.messages()
        .iter()
        .find(|m| *m.role() == Role::System)
        .map(|m| m.content().clone())
        .unwrap_or_default()
}

/// Translator fake: echoes the payload tagged with the target language and
/// fails for every language name in `failing`.
pub fn translator_fake(failing: &'static [&'static str]) -> Arc<FakeText> {
    FakeText::new("translator", move |req| {
        let system = system_text(req);
        if let Some(name) = failing.iter().find(|name| system.contains(*name)) {
            return Err(ModelError::new(ModelErrorKind::Request(format!(
                "{} timed out",
                name
            ))));
        }
        let language = ["Spanish", "Portuguese", "French"]
            .into_iter()
            .find(|name| system.contains(name))
            .unwrap_or("Other");
        let user = req
            .messages()
            .iter()
            .find(|m| *m.role() == Role::User)
            .map(|m| m.content().clone())
            .unwrap_or_default();
        let payload: TranslationPayload = serde_json::from_str(&user).unwrap();
        Ok(serde_json::json!({
            "title": format!("[{}] {}", language, payload.title),
            "summary": payload.summary,
            "content": format!("[{}] {}", language, payload.content),
        })
        .to_string())
    })
}

/// A refinement response that passes the article schema.
pub fn article_json(title: &str) -> String {
    serde_json::json!({
        "title": title,
        "slug": title,
        "body": format!("# {}\n\nReflection text.", title),
        "summary": "A short summary.",
        "seo_title": title,
        "seo_description": "A short summary.",
    })
    .to_string()
}

/// A refinement response that passes the story schema.
pub fn story_json(title: &str, pages: usize) -> String {
    let pages: Vec<_> = (1..=pages)
        .map(|n| {
            serde_json::json!({
                "text": format!("Page {}", n),
                "image_prompt": format!("Scene {}", n),
            })
        })
        .collect();
    serde_json::json!({ "title": title, "summary": null, "pages": pages }).to_string()
}

/// Image generator returning inline bytes.
pub struct FakeImage {
    calls: AtomicUsize,
    fail: AtomicBool,
    prompts: Mutex<Vec<String>>,
}

impl FakeImage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        let fake = Self::new();
        fake.fail.store(true, Ordering::SeqCst);
        fake
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for FakeImage {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(ModelError::new(ModelErrorKind::Api {
                status: 400,
                message: "content policy".to_string(),
            }));
        }
        Ok(GeneratedImage::Inline {
            bytes: vec![0x89, b'P', b'N', b'G'],
            content_type: "image/png".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "fake-image"
    }
}

/// Image generator answering with a transient URL, like the hosted services do.
pub struct UrlImage {
    url: String,
}

impl UrlImage {
    pub fn new(url: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { url: url.into() })
    }
}

#[async_trait]
impl ImageGenerator for UrlImage {
    async fn generate_image(&self, _prompt: &str) -> Result<GeneratedImage, ModelError> {
        Ok(GeneratedImage::Url(self.url.clone()))
    }

    fn model_name(&self) -> &str {
        "url-image"
    }
}

/// Media store keeping objects in a map. Refuses to overwrite.
#[derive(Default)]
pub struct MemoryMedia {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryMedia {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(path).cloned()
    }
}

#[async_trait]
impl MediaStore for MemoryMedia {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(path) {
            return Err(StorageError::new(StorageErrorKind::Upload {
                status: 409,
                message: format!("{} exists", path),
            }));
        }
        objects.insert(path.to_string(), bytes);
        Ok(format!("memory://media/{}", path))
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

/// Which writes a [`FlakyStore`] rejects.
#[derive(Debug, Default)]
pub struct Faults {
    pub insert_content: AtomicBool,
    pub attach_categories: AtomicBool,
    pub mark_source_used: AtomicBool,
    pub enqueue_translation: AtomicBool,
    pub append_run_log: AtomicBool,
}

/// InMemoryStore with injectable write failures.
#[derive(Clone)]
pub struct FlakyStore {
    pub inner: InMemoryStore,
    pub faults: Arc<Faults>,
}

impl FlakyStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            faults: Arc::new(Faults::default()),
        }
    }

    fn check(flag: &AtomicBool, what: &str) -> DatabaseResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(DatabaseError::new(DatabaseErrorKind::Query(format!(
                "{} rejected",
                what
            ))))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ScheduleRepository for FlakyStore {
    async fn get_schedule(&self, id: Uuid) -> DatabaseResult<Option<Schedule>> {
        self.inner.get_schedule(id).await
    }

    async fn list_active_schedules(&self) -> DatabaseResult<Vec<Schedule>> {
        self.inner.list_active_schedules().await
    }
}

#[async_trait]
impl SourceRepository for FlakyStore {
    async fn random_unused_verse(&self, schedule_id: Uuid) -> DatabaseResult<Option<VerseSource>> {
        self.inner.random_unused_verse(schedule_id).await
    }

    async fn newest_unused_article(
        &self,
        schedule_id: Uuid,
        category_id: Option<Uuid>,
    ) -> DatabaseResult<Option<ArticleSource>> {
        self.inner
            .newest_unused_article(schedule_id, category_id)
            .await
    }

    async fn mark_source_used(
        &self,
        schedule_id: Uuid,
        source_id: Uuid,
        source_kind: &str,
        content_id: Option<Uuid>,
    ) -> DatabaseResult<()> {
        Self::check(&self.faults.mark_source_used, "ledger write")?;
        self.inner
            .mark_source_used(schedule_id, source_id, source_kind, content_id)
            .await
    }

    async fn used_sources(&self, schedule_id: Uuid) -> DatabaseResult<Vec<Uuid>> {
        self.inner.used_sources(schedule_id).await
    }
}

#[async_trait]
impl ContentRepository for FlakyStore {
    async fn content_slug_exists(&self, slug: &str) -> DatabaseResult<bool> {
        self.inner.content_slug_exists(slug).await
    }

    async fn insert_content(&self, content: NewContent) -> DatabaseResult<GeneratedContent> {
        Self::check(&self.faults.insert_content, "content insert")?;
        self.inner.insert_content(content).await
    }

    async fn get_content(&self, id: Uuid) -> DatabaseResult<Option<GeneratedContent>> {
        self.inner.get_content(id).await
    }

    async fn attach_categories(
        &self,
        content_id: Uuid,
        category_ids: &[Uuid],
    ) -> DatabaseResult<()> {
        Self::check(&self.faults.attach_categories, "category insert")?;
        self.inner.attach_categories(content_id, category_ids).await
    }

    async fn categories_for(&self, content_id: Uuid) -> DatabaseResult<Vec<Uuid>> {
        self.inner.categories_for(content_id).await
    }

    async fn upsert_translation(&self, translation: Translation) -> DatabaseResult<()> {
        self.inner.upsert_translation(translation).await
    }

    async fn translations_for(&self, content_id: Uuid) -> DatabaseResult<Vec<Translation>> {
        self.inner.translations_for(content_id).await
    }

    async fn story_slug_exists(&self, slug: &str) -> DatabaseResult<bool> {
        self.inner.story_slug_exists(slug).await
    }

    async fn insert_web_story(&self, story: NewWebStory) -> DatabaseResult<WebStory> {
        self.inner.insert_web_story(story).await
    }
}

#[async_trait]
impl RunLogRepository for FlakyStore {
    async fn append_run_log(&self, entry: RunLogEntry) -> DatabaseResult<()> {
        Self::check(&self.faults.append_run_log, "run log insert")?;
        self.inner.append_run_log(entry).await
    }

    async fn run_logs_for(&self, schedule_id: Uuid) -> DatabaseResult<Vec<RunLogEntry>> {
        self.inner.run_logs_for(schedule_id).await
    }

    async fn last_terminal_run(&self, schedule_id: Uuid) -> DatabaseResult<Option<DateTime<Utc>>> {
        self.inner.last_terminal_run(schedule_id).await
    }
}

#[async_trait]
impl TranslationOutbox for FlakyStore {
    async fn enqueue_translation(
        &self,
        content_id: Uuid,
        languages: Vec<String>,
        payload: Option<TranslationPayload>,
    ) -> DatabaseResult<TranslationTask> {
        Self::check(&self.faults.enqueue_translation, "outbox insert")?;
        self.inner
            .enqueue_translation(content_id, languages, payload)
            .await
    }

    async fn pending_tasks(&self, limit: usize) -> DatabaseResult<Vec<TranslationTask>> {
        self.inner.pending_tasks(limit).await
    }

    async fn complete_task(&self, task_id: Uuid) -> DatabaseResult<()> {
        self.inner.complete_task(task_id).await
    }

    async fn reschedule_task(
        &self,
        task_id: Uuid,
        remaining: Vec<String>,
        error: String,
        max_attempts: i32,
    ) -> DatabaseResult<TaskStatus> {
        self.inner
            .reschedule_task(task_id, remaining, error, max_attempts)
            .await
    }

    async fn get_task(&self, task_id: Uuid) -> DatabaseResult<Option<TranslationTask>> {
        self.inner.get_task(task_id).await
    }
}

pub fn verse(book: &str, chapter: i32, number: i32, text: &str) -> VerseSource {
    VerseSource {
        id: Uuid::new_v4(),
        book: book.to_string(),
        chapter,
        verse: number,
        text: text.to_string(),
    }
}

/// Devotional schedule translating into Spanish and Portuguese.
pub fn devotional_schedule() -> Schedule {
    Schedule::builder()
        .id(Uuid::new_v4())
        .name("devotional-daily")
        .kind(ContentKind::Devotional)
        .author_id(Uuid::new_v4())
        .category_ids(vec![Uuid::new_v4()])
        .image_prompt_template(Some("A sunrise evoking {title}".to_string()))
        .target_languages(vec!["es".to_string(), "pt".to_string()])
        .build()
        .expect("Valid schedule")
}

/// Collaborators of one test pipeline.
pub struct Harness {
    pub drafter: Arc<FakeText>,
    pub image: Arc<FakeImage>,
    pub media: Arc<MemoryMedia>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            drafter: FakeText::always("draft", "A first draft."),
            image: FakeImage::new(),
            media: MemoryMedia::new(),
        }
    }

    pub fn pipeline(&self, store: Arc<dyn Store>, providers: Vec<RefinementProvider>) -> ContentPipeline {
        let image: Arc<dyn ImageGenerator> = self.image.clone();
        let media: Arc<dyn MediaStore> = self.media.clone();
        ContentPipeline::new(
            PipelineDependencies {
                store,
                drafter: DraftGenerator::new(self.drafter.clone()),
                refinement: RefinementChain::new(providers),
                image_generator: image,
                media_store: media,
            },
            PipelineSettings::default(),
        )
    }
}

pub fn available(generator: &Arc<FakeText>) -> RefinementProvider {
    RefinementProvider::Available(generator.clone())
}
