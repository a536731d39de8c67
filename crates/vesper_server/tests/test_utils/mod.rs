//! Fakes and fixtures for the server tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use vesper_core::{
    ContentKind, GenerateRequest, GenerateResponse, Role, Schedule, TranslationPayload,
    VerseSource,
};
use vesper_database::{InMemoryStore, Store};
use vesper_error::{ModelError, ModelErrorKind, StorageError};
use vesper_models::{GeneratedImage, ImageGenerator, TextGenerator};
use vesper_pipeline::{
    ContentPipeline, DraftGenerator, OutboxSignal, OutboxWorker, PipelineDependencies,
    PipelineSettings, RefinementChain, RefinementProvider, Translator,
};
use vesper_server::{AppState, Services};
use vesper_storage::MediaStore;

pub const SECRET: &str = "s3cret";

/// Text generator that always answers the same way.
pub struct FakeText {
    name: String,
    answer: Result<String, ()>,
}

impl FakeText {
    pub fn always(name: &str, text: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            answer: Ok(text.to_string()),
        })
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            answer: Err(()),
        })
    }
}

#[async_trait]
impl TextGenerator for FakeText {
    async fn generate(&self, _req: &GenerateRequest) -> Result<GenerateResponse, ModelError> {
        match &self.answer {
            Ok(text) => Ok(GenerateResponse::new(text.clone(), None)),
            Err(()) => Err(ModelError::new(ModelErrorKind::Api {
                status: 503,
                message: "overloaded".to_string(),
            })),
        }
    }

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}

/// Translator echoing the payload prefixed with `[xx]`.
pub struct EchoTranslator;

#[async_trait]
impl TextGenerator for EchoTranslator {
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, ModelError> {
        let user = req
            .messages()
            .iter()
            .find(|m| *m.role() == Role::User)
            .map(|m| m.content().clone())
            .unwrap_or_default();
        let payload: TranslationPayload = serde_json::from_str(&user).unwrap();
        let text = serde_json::json!({
            "title": format!("[xx] {}", payload.title),
            "summary": payload.summary,
            "content": format!("[xx] {}", payload.content),
        })
        .to_string();
        Ok(GenerateResponse::new(text, None))
    }

    fn provider_name(&self) -> &str {
        "translator"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}

pub struct FakeImage;

#[async_trait]
impl ImageGenerator for FakeImage {
    async fn generate_image(&self, _prompt: &str) -> Result<GeneratedImage, ModelError> {
        Ok(GeneratedImage::Inline {
            bytes: vec![0x89, b'P', b'N', b'G'],
            content_type: "image/png".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "fake-image"
    }
}

#[derive(Default)]
pub struct MemoryMedia {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl MediaStore for MemoryMedia {
    async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        self.objects.lock().unwrap().insert(path.to_string(), bytes);
        Ok(format!("memory://media/{}", path))
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

pub fn article_json(title: &str) -> String {
    serde_json::json!({
        "title": title,
        "body": format!("# {}\n\nReflection text.", title),
        "summary": "A short summary.",
    })
    .to_string()
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

/// Devotional schedule translating into Spanish, due daily at 06:00.
pub fn devotional_schedule(targets: &[&str]) -> Schedule {
    Schedule::builder()
        .id(Uuid::new_v4())
        .name("devotional-daily")
        .kind(ContentKind::Devotional)
        .author_id(Uuid::new_v4())
        .target_languages(targets.iter().map(|t| t.to_string()).collect::<Vec<_>>())
        .build()
        .expect("Valid schedule")
}

/// Services over `store` whose refinement chain is `refiners`.
pub fn services(store: &InMemoryStore, refiners: Vec<Arc<FakeText>>) -> Services {
    let shared: Arc<dyn Store> = Arc::new(store.clone());
    let providers = refiners
        .into_iter()
        .map(|r| RefinementProvider::Available(r))
        .collect();
    let pipeline = ContentPipeline::new(
        PipelineDependencies {
            store: Arc::clone(&shared),
            drafter: DraftGenerator::new(FakeText::always("draft", "A first draft.")),
            refinement: RefinementChain::new(providers),
            image_generator: Arc::new(FakeImage),
            media_store: Arc::new(MemoryMedia::default()),
        },
        PipelineSettings::default(),
    );
    let outbox = OutboxWorker::new(
        shared,
        Translator::new(Arc::new(EchoTranslator)),
        OutboxSignal::new(),
    );
    Services::new(pipeline, outbox)
}

pub fn state(services: &Services) -> AppState {
    AppState::new(services, SECRET)
}
