//! Translation fan-out and the outbox worker.

mod test_utils;

use std::sync::Arc;
use std::time::Duration;
use test_utils::*;
use vesper_core::{
    ContentStatus, FinalizedContent, GeneratedContent, NewContent, TaskStatus, TranslationPayload,
};
use vesper_database::{ContentRepository, InMemoryStore, Store, TranslationOutbox};
use vesper_pipeline::{OutboxSignal, OutboxWorker, RunOutcome, Translator};

async fn stored_content(store: &InMemoryStore) -> GeneratedContent {
    let schedule = devotional_schedule();
    store
        .insert_content(
            NewContent::builder()
                .schedule_id(*schedule.id())
                .author_id(*schedule.author_id())
                .content(
                    FinalizedContent::builder()
                        .title("Faith")
                        .slug("faith")
                        .body("# Faith\n\n<p>Trust</p>")
                        .summary(Some("Trust".to_string()))
                        .seo_title("Faith")
                        .seo_description("Trust")
                        .build()
                        .unwrap(),
                )
                .status(ContentStatus::Draft)
                .source_language("en")
                .build()
                .unwrap(),
        )
        .await
        .unwrap()
}

fn languages(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| c.to_string()).collect()
}

fn payload_of(content: &GeneratedContent) -> TranslationPayload {
    TranslationPayload {
        title: content.title.clone(),
        summary: content.summary.clone(),
        content: content.body.clone(),
    }
}

#[tokio::test]
async fn test_one_failing_language_does_not_block_siblings() {
    let store = InMemoryStore::new();
    let content = stored_content(&store).await;
    let translator = Translator::new(translator_fake(&["Portuguese"]));

    let report = translator
        .translate_all(
            &store,
            content.id,
            &payload_of(&content),
            &languages(&["es", "pt", "fr"]),
        )
        .await;

    assert_eq!(report.succeeded, languages(&["es", "fr"]));
    assert_eq!(report.failed, languages(&["pt"]));
    assert!(report.errors["pt"].contains("Portuguese timed out"));
    assert!(!report.is_complete());

    let rows = store.translations_for(content.id).await.unwrap();
    let written: Vec<_> = rows.iter().map(|t| t.language.as_str()).collect();
    assert_eq!(written, vec!["es", "fr"]);
    assert_eq!(rows[0].summary.as_deref(), Some("Trust"));
}

#[tokio::test]
async fn test_partial_failure_keeps_only_failed_languages_pending() {
    let store = InMemoryStore::new();
    let content = stored_content(&store).await;
    let task = store
        .enqueue_translation(content.id, languages(&["es", "pt"]), None)
        .await
        .unwrap();

    let shared: Arc<dyn Store> = Arc::new(store.clone());
    let worker = OutboxWorker::new(
        shared,
        Translator::new(translator_fake(&["Portuguese"])),
        OutboxSignal::new(),
    )
    .with_max_attempts(2);

    let report = worker.drain_once().await.unwrap();
    assert_eq!(report.claimed, 1);
    assert_eq!(report.rescheduled, 1);

    let pending = store.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(pending.status, TaskStatus::Pending);
    assert_eq!(pending.languages, languages(&["pt"]));
    assert_eq!(pending.attempts, 1);
    assert!(pending.last_error.unwrap().starts_with("pt: "));

    // Spanish is not translated again
    let report = worker.drain_once().await.unwrap();
    assert_eq!(report.failed, 1);
    let failed = store.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.attempts, 2);

    assert_eq!(store.translations_for(content.id).await.unwrap().len(), 1);
    assert_eq!(worker.drain_once().await.unwrap().claimed, 0);
}

#[tokio::test]
async fn test_task_payload_overrides_stored_fields() {
    let store = InMemoryStore::new();
    let content = stored_content(&store).await;
    store
        .enqueue_translation(
            content.id,
            languages(&["es"]),
            Some(TranslationPayload {
                title: "Edited title".to_string(),
                summary: None,
                content: "Edited body".to_string(),
            }),
        )
        .await
        .unwrap();

    let shared: Arc<dyn Store> = Arc::new(store.clone());
    let worker = OutboxWorker::new(
        shared,
        Translator::new(translator_fake(&[])),
        OutboxSignal::new(),
    );
    assert_eq!(worker.drain_once().await.unwrap().completed, 1);

    let rows = store.translations_for(content.id).await.unwrap();
    assert_eq!(rows[0].title, "[Spanish] Edited title");
    assert_eq!(rows[0].body, "[Spanish] Edited body");
}

#[tokio::test]
async fn test_malformed_translation_counts_as_failure() {
    let store = InMemoryStore::new();
    let content = stored_content(&store).await;
    let translator = Translator::new(FakeText::always("translator", "Lo siento, no puedo."));

    let report = translator
        .translate_all(&store, content.id, &payload_of(&content), &languages(&["es"]))
        .await;
    assert_eq!(report.failed, languages(&["es"]));
    assert!(store.translations_for(content.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_signal_wakes_worker_after_run() {
    let schedule = devotional_schedule();
    let store = InMemoryStore::new();
    store.upsert_schedule(schedule.clone()).await;
    store
        .add_verse(verse("Romans", 8, 28, "All things work together for good"))
        .await;

    let shared: Arc<dyn Store> = Arc::new(store.clone());
    let signal = OutboxSignal::new();
    let worker = Arc::new(OutboxWorker::new(
        Arc::clone(&shared),
        Translator::new(translator_fake(&[])),
        signal.clone(),
    ));
    let handle = Arc::clone(&worker).spawn(Duration::from_secs(3600));

    let harness = Harness::new();
    let refiner = FakeText::always("primary", &article_json("All Things"));
    let pipeline = harness
        .pipeline(shared, vec![available(&refiner)])
        .with_outbox(signal);

    let RunOutcome::Created { content_id, .. } = pipeline.run(*schedule.id()).await.unwrap()
    else {
        panic!("expected content");
    };

    let mut translated = 0;
    for _ in 0..100 {
        translated = store.translations_for(content_id).await.unwrap().len();
        if translated == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    handle.abort();
    assert_eq!(translated, 2);
}
