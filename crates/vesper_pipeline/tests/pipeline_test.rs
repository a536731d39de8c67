//! End-to-end runs of the article pipeline against the in-memory store.

mod test_utils;

use std::collections::HashSet;
use std::sync::Arc;
use test_utils::*;
use uuid::Uuid;
use vesper_core::{ContentKind, RunStatus, Schedule, ScheduleOutput, TaskStatus};
use vesper_database::{
    ContentRepository, InMemoryStore, RunLogRepository, SourceRepository, Store,
    TranslationOutbox,
};
use vesper_error::PipelineErrorKind;
use vesper_pipeline::{OutboxSignal, OutboxWorker, RefinementProvider, RunOutcome, Translator};

async fn seeded(schedule: &Schedule, verses: usize) -> (InMemoryStore, Vec<Uuid>) {
    let store = InMemoryStore::new();
    store.upsert_schedule(schedule.clone()).await;
    let mut ids = Vec::new();
    for n in 0..verses {
        let v = verse("Psalms", 23, n as i32 + 1, "The Lord is my shepherd");
        ids.push(v.id);
        store.add_verse(v).await;
    }
    (store, ids)
}

#[tokio::test]
async fn test_john_3_16_scenario() {
    let schedule = devotional_schedule();
    let store = InMemoryStore::new();
    store.upsert_schedule(schedule.clone()).await;
    let john = verse("John", 3, 16, "For God so loved the world");
    store.add_verse(john.clone()).await;

    let harness = Harness::new();
    let refiner = FakeText::always("primary", &article_json("Born Again by Love"));
    let pipeline = harness.pipeline(Arc::new(store.clone()), vec![available(&refiner)]);

    let outcome = pipeline.run(*schedule.id()).await.unwrap();
    let RunOutcome::Created {
        content_id,
        slug,
        translation_task,
        failed_tasks,
        ..
    } = outcome
    else {
        panic!("expected content");
    };
    assert_eq!(slug, "born-again-by-love");
    assert!(failed_tasks.is_empty());

    let contents = store.all_contents().await;
    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0].id, content_id);
    assert!(!contents[0].slug.is_empty());
    assert!(contents[0].image_url.as_deref().unwrap().starts_with("memory://media/"));

    assert_eq!(store.used_sources(*schedule.id()).await.unwrap(), vec![john.id]);
    assert_eq!(
        store.categories_for(content_id).await.unwrap(),
        schedule.category_ids().clone()
    );
    assert!(harness.drafter.prompts()[0].contains("John 3:16"));
    assert_eq!(
        harness.image.prompts()[0],
        format!(
            "{}A sunrise evoking Born Again by Love",
            vesper_pipeline::prompts::DEFAULT_IMAGE_STYLE
        )
    );

    // Translation is queued, not done, when the run returns
    let task_id = translation_task.expect("translation queued");
    assert!(store.translations_for(content_id).await.unwrap().is_empty());

    let shared: Arc<dyn Store> = Arc::new(store.clone());
    let worker = OutboxWorker::new(
        shared,
        Translator::new(translator_fake(&[])),
        OutboxSignal::new(),
    );
    let report = worker.drain_once().await.unwrap();
    assert_eq!(report.completed, 1);

    let translations = store.translations_for(content_id).await.unwrap();
    let languages: Vec<_> = translations.iter().map(|t| t.language.as_str()).collect();
    assert_eq!(languages, vec!["es", "pt"]);
    assert!(translations[0].title.starts_with("[Spanish]"));
    assert_eq!(
        store.get_task(task_id).await.unwrap().unwrap().status,
        TaskStatus::Done
    );

    let logs = store.run_logs_for(*schedule.id()).await.unwrap();
    let last = logs.last().unwrap();
    assert_eq!(last.status, RunStatus::Success);
    assert_eq!(last.content_id, Some(content_id));
    assert!(logs.iter().all(|e| e.status != RunStatus::Error));
}

#[tokio::test]
async fn test_schedule_never_repeats_a_source() {
    let schedule = devotional_schedule();
    let (store, verse_ids) = seeded(&schedule, 3).await;
    let harness = Harness::new();
    let refiner = FakeText::always("primary", &article_json("The Shepherd"));
    let pipeline = harness.pipeline(Arc::new(store.clone()), vec![available(&refiner)]);

    for _ in 0..3 {
        assert!(matches!(
            pipeline.run(*schedule.id()).await.unwrap(),
            RunOutcome::Created { .. }
        ));
    }
    assert_eq!(
        pipeline.run(*schedule.id()).await.unwrap(),
        RunOutcome::NoEligibleSource
    );

    // Each draft saw a different verse
    let references: HashSet<String> = harness
        .drafter
        .prompts()
        .iter()
        .map(|p| p.lines().last().unwrap_or_default().to_string())
        .collect();
    assert_eq!(references.len(), 3);

    let used: HashSet<Uuid> = store
        .used_sources(*schedule.id())
        .await
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(used, verse_ids.into_iter().collect());

    // Same title three times still yields three distinct slugs
    let slugs: HashSet<String> = store.all_contents().await.into_iter().map(|c| c.slug).collect();
    assert_eq!(slugs.len(), 3);
    assert!(slugs.contains("the-shepherd"));
}

#[tokio::test]
async fn test_other_schedule_may_reuse_source() {
    let first = devotional_schedule();
    let second = devotional_schedule();
    let (store, _) = seeded(&first, 1).await;
    store.upsert_schedule(second.clone()).await;

    let harness = Harness::new();
    let refiner = FakeText::always("primary", &article_json("Shared Verse"));
    let pipeline = harness.pipeline(Arc::new(store.clone()), vec![available(&refiner)]);

    assert!(matches!(
        pipeline.run(*first.id()).await.unwrap(),
        RunOutcome::Created { .. }
    ));
    assert!(matches!(
        pipeline.run(*second.id()).await.unwrap(),
        RunOutcome::Created { .. }
    ));
}

#[tokio::test]
async fn test_exhausted_pool_is_a_successful_noop() {
    let schedule = devotional_schedule();
    let (store, _) = seeded(&schedule, 0).await;
    let harness = Harness::new();
    let refiner = FakeText::always("primary", &article_json("Unused"));
    let pipeline = harness.pipeline(Arc::new(store.clone()), vec![available(&refiner)]);

    let outcome = pipeline.run(*schedule.id()).await.unwrap();
    assert_eq!(outcome, RunOutcome::NoEligibleSource);
    assert_eq!(outcome.content_id(), None);

    assert!(store.all_contents().await.is_empty());
    assert_eq!(harness.drafter.calls(), 0);
    assert_eq!(refiner.calls(), 0);

    let logs = store.run_logs_for(*schedule.id()).await.unwrap();
    assert!(logs.iter().all(|e| e.status != RunStatus::Error));
    let terminal: Vec<_> = logs.iter().filter(|e| e.status.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    assert_eq!(terminal[0].status, RunStatus::Success);
    assert_eq!(terminal[0].details["noop"], true);
}

#[tokio::test]
async fn test_fallback_provider_produces_valid_content() {
    let schedule = devotional_schedule();
    let (store, _) = seeded(&schedule, 1).await;
    let harness = Harness::new();
    let primary = FakeText::failing("primary");
    let fallback = FakeText::always("fallback", &article_json("Grace Abounds"));
    let pipeline = harness.pipeline(
        Arc::new(store.clone()),
        vec![available(&primary), available(&fallback)],
    );

    let RunOutcome::Created {
        provider,
        fallback_failures,
        ..
    } = pipeline.run(*schedule.id()).await.unwrap()
    else {
        panic!("expected content");
    };
    assert_eq!(provider, "fallback");
    assert_eq!(fallback_failures.len(), 1);
    assert!(fallback_failures[0].starts_with("primary: API error (status 503)"));
    assert_eq!(primary.calls(), 1);
    assert_eq!(fallback.calls(), 1);

    let content = &store.all_contents().await[0];
    assert_eq!(content.title, "Grace Abounds");
    assert_eq!(content.slug, "grace-abounds");
    assert!(!content.seo_description.is_empty());
}

#[tokio::test]
async fn test_malformed_primary_output_falls_back() {
    let schedule = devotional_schedule();
    let (store, _) = seeded(&schedule, 1).await;
    let harness = Harness::new();
    let primary = FakeText::always("primary", "Here is your article about grace!");
    let fallback = FakeText::always("fallback", &article_json("Grace"));
    let pipeline = harness.pipeline(
        Arc::new(store.clone()),
        vec![available(&primary), available(&fallback)],
    );

    let RunOutcome::Created {
        provider,
        fallback_failures,
        ..
    } = pipeline.run(*schedule.id()).await.unwrap()
    else {
        panic!("expected content");
    };
    assert_eq!(provider, "fallback");
    assert!(fallback_failures[0].contains("malformed output"));
}

#[tokio::test]
async fn test_missing_primary_credential_skips_to_fallback() {
    let schedule = devotional_schedule();
    let (store, _) = seeded(&schedule, 1).await;
    let harness = Harness::new();
    let fallback = FakeText::always("fallback", &article_json("Peace"));
    let pipeline = harness.pipeline(
        Arc::new(store.clone()),
        vec![
            RefinementProvider::Missing {
                label: "primary".to_string(),
                env: "PRIMARY_API_KEY".to_string(),
            },
            available(&fallback),
        ],
    );

    let RunOutcome::Created {
        provider,
        fallback_failures,
        ..
    } = pipeline.run(*schedule.id()).await.unwrap()
    else {
        panic!("expected content");
    };
    assert_eq!(provider, "fallback");
    assert_eq!(
        fallback_failures,
        vec!["primary: credential not configured (PRIMARY_API_KEY)".to_string()]
    );
}

#[tokio::test]
async fn test_both_providers_failing_writes_nothing() {
    let schedule = devotional_schedule();
    let (store, _) = seeded(&schedule, 1).await;
    let harness = Harness::new();
    let primary = FakeText::failing("primary");
    let fallback = FakeText::always("fallback", "{\"title\": \"No body\"}");
    let pipeline = harness.pipeline(
        Arc::new(store.clone()),
        vec![available(&primary), available(&fallback)],
    );

    let err = pipeline.run(*schedule.id()).await.unwrap_err();
    let PipelineErrorKind::RefinementExhausted(reasons) = &err.kind else {
        panic!("expected exhausted chain, got {}", err);
    };
    assert_eq!(reasons.len(), 2);
    assert!(reasons[1].contains("missing body"));

    assert!(store.all_contents().await.is_empty());
    assert!(store.used_sources(*schedule.id()).await.unwrap().is_empty());
    assert_eq!(harness.image.calls(), 0);

    let logs = store.run_logs_for(*schedule.id()).await.unwrap();
    let errors: Vec<_> = logs.iter().filter(|e| e.status == RunStatus::Error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].details["stage"], "refining");
    assert!(logs.iter().all(|e| e.status != RunStatus::Success));
}

#[tokio::test]
async fn test_draft_failure_is_fatal() {
    let schedule = devotional_schedule();
    let (store, _) = seeded(&schedule, 1).await;
    let mut harness = Harness::new();
    harness.drafter = FakeText::failing("draft");
    let refiner = FakeText::always("primary", &article_json("Never"));
    let pipeline = harness.pipeline(Arc::new(store.clone()), vec![available(&refiner)]);

    let err = pipeline.run(*schedule.id()).await.unwrap_err();
    assert!(matches!(err.kind, PipelineErrorKind::Draft(_)));
    assert_eq!(refiner.calls(), 0);
    assert!(store.used_sources(*schedule.id()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_required_image_failure_is_fatal() {
    let schedule = devotional_schedule();
    let (store, _) = seeded(&schedule, 1).await;
    let mut harness = Harness::new();
    harness.image = FakeImage::failing();
    let refiner = FakeText::always("primary", &article_json("No Picture"));
    let pipeline = harness.pipeline(Arc::new(store.clone()), vec![available(&refiner)]);

    let err = pipeline.run(*schedule.id()).await.unwrap_err();
    assert!(matches!(err.kind, PipelineErrorKind::Image(_)));
    assert!(store.all_contents().await.is_empty());
    assert_eq!(harness.media.len(), 0);

    let logs = store.run_logs_for(*schedule.id()).await.unwrap();
    assert_eq!(logs.last().unwrap().details["stage"], "image_generation");
}

#[tokio::test]
async fn test_optional_image_failure_still_writes_content() {
    let schedule = Schedule::builder()
        .id(Uuid::new_v4())
        .name("themes")
        .kind(ContentKind::Thematic)
        .theme(Some("Hope in suffering".to_string()))
        .author_id(Uuid::new_v4())
        .require_image(false)
        .publish_automatically(true)
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.upsert_schedule(schedule.clone()).await;

    let mut harness = Harness::new();
    harness.image = FakeImage::failing();
    let refiner = FakeText::always("primary", &article_json("Hope"));
    let pipeline = harness.pipeline(Arc::new(store.clone()), vec![available(&refiner)]);

    pipeline.run(*schedule.id()).await.unwrap();
    pipeline.run(*schedule.id()).await.unwrap();

    // Themes never run out and are not tracked in the ledger
    let contents = store.all_contents().await;
    assert_eq!(contents.len(), 2);
    assert!(contents.iter().all(|c| c.image_url.is_none()));
    assert!(contents.iter().all(|c| c.published_at.is_some()));
    assert!(store.used_sources(*schedule.id()).await.unwrap().is_empty());
    assert!(harness.drafter.prompts()[0].contains("Theme:\nHope in suffering"));
}

#[tokio::test]
async fn test_secondary_write_failures_do_not_fail_the_run() {
    let schedule = devotional_schedule();
    let (inner, _) = seeded(&schedule, 1).await;
    let store = FlakyStore::new(inner.clone());
    store
        .faults
        .mark_source_used
        .store(true, std::sync::atomic::Ordering::SeqCst);
    store
        .faults
        .attach_categories
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let harness = Harness::new();
    let refiner = FakeText::always("primary", &article_json("Still Here"));
    let pipeline = harness.pipeline(Arc::new(store.clone()), vec![available(&refiner)]);

    let RunOutcome::Created {
        failed_tasks,
        translation_task,
        ..
    } = pipeline.run(*schedule.id()).await.unwrap()
    else {
        panic!("expected content");
    };
    assert_eq!(failed_tasks, vec!["attach_categories", "mark_source_used"]);
    assert!(translation_task.is_some());
    assert_eq!(inner.all_contents().await.len(), 1);

    // Every post-commit outcome is answerable from the run log
    let logs = inner.run_logs_for(*schedule.id()).await.unwrap();
    let post_commit: Vec<_> = logs
        .iter()
        .filter(|e| e.details.get("post_commit").is_some())
        .collect();
    assert_eq!(post_commit.len(), 3);
    assert_eq!(post_commit[1].details["post_commit"]["task"], "mark_source_used");
    assert_eq!(post_commit[1].details["post_commit"]["ok"], false);
    assert_eq!(post_commit[2].details["post_commit"]["ok"], true);

    let last = logs.last().unwrap();
    assert_eq!(last.status, RunStatus::Success);
    assert_eq!(last.details["failed_post_commit"][0], "attach_categories");
}

#[tokio::test]
async fn test_run_log_failures_never_abort_the_run() {
    let schedule = devotional_schedule();
    let (inner, verse_ids) = seeded(&schedule, 1).await;
    let store = FlakyStore::new(inner.clone());
    store
        .faults
        .append_run_log
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let harness = Harness::new();
    let refiner = FakeText::always("primary", &article_json("Unlogged"));
    let pipeline = harness.pipeline(Arc::new(store), vec![available(&refiner)]);

    let outcome = pipeline.run(*schedule.id()).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Created { .. }));
    assert_eq!(inner.all_contents().await.len(), 1);
    assert_eq!(
        inner.used_sources(*schedule.id()).await.unwrap(),
        verse_ids
    );
    assert!(inner.run_logs_for(*schedule.id()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_primary_write_failure_is_fatal() {
    let schedule = devotional_schedule();
    let (inner, _) = seeded(&schedule, 1).await;
    let store = FlakyStore::new(inner.clone());
    store
        .faults
        .insert_content
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let harness = Harness::new();
    let refiner = FakeText::always("primary", &article_json("Lost"));
    let pipeline = harness.pipeline(Arc::new(store), vec![available(&refiner)]);

    let err = pipeline.run(*schedule.id()).await.unwrap_err();
    assert!(matches!(err.kind, PipelineErrorKind::Persistence(_)));
    assert!(inner.used_sources(*schedule.id()).await.unwrap().is_empty());
    assert!(inner.all_tasks().await.is_empty());
}

#[tokio::test]
async fn test_unknown_and_inactive_schedules() {
    let store = InMemoryStore::new();
    let paused = Schedule::builder()
        .id(Uuid::new_v4())
        .name("paused")
        .kind(ContentKind::Devotional)
        .author_id(Uuid::new_v4())
        .active(false)
        .build()
        .unwrap();
    store.upsert_schedule(paused.clone()).await;

    let harness = Harness::new();
    let refiner = FakeText::always("primary", &article_json("Unused"));
    let pipeline = harness.pipeline(Arc::new(store.clone()), vec![available(&refiner)]);

    let err = pipeline.run(*paused.id()).await.unwrap_err();
    assert!(matches!(err.kind, PipelineErrorKind::ScheduleInactive(_)));

    let missing = Uuid::new_v4();
    let err = pipeline.run(missing).await.unwrap_err();
    assert!(matches!(err.kind, PipelineErrorKind::ScheduleNotFound(_)));

    let logs = store.run_logs_for(missing).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, RunStatus::Error);
    assert_eq!(logs[0].details["stage"], "schedule_lookup");
}

#[tokio::test]
async fn test_theme_schedule_without_theme_is_unsupported() {
    let schedule = Schedule::builder()
        .id(Uuid::new_v4())
        .name("broken")
        .kind(ContentKind::Thematic)
        .author_id(Uuid::new_v4())
        .build()
        .unwrap();
    let store = InMemoryStore::new();
    store.upsert_schedule(schedule.clone()).await;

    let harness = Harness::new();
    let refiner = FakeText::always("primary", &article_json("Unused"));
    let pipeline = harness.pipeline(Arc::new(store), vec![available(&refiner)]);

    let err = pipeline.run(*schedule.id()).await.unwrap_err();
    assert!(matches!(err.kind, PipelineErrorKind::UnsupportedSchedule(_)));
}

#[tokio::test]
async fn test_preview_writes_nothing() {
    let schedule = devotional_schedule();
    let (store, _) = seeded(&schedule, 1).await;
    let harness = Harness::new();
    let refiner = FakeText::always("primary", &article_json("Preview Only"));
    let pipeline = harness.pipeline(Arc::new(store.clone()), vec![available(&refiner)]);

    let preview = pipeline.preview(*schedule.id()).await.unwrap().unwrap();
    assert_eq!(preview.content.title(), "Preview Only");
    assert_eq!(preview.provider, "primary");

    assert!(store.all_contents().await.is_empty());
    assert!(store.used_sources(*schedule.id()).await.unwrap().is_empty());
    assert!(store.run_logs_for(*schedule.id()).await.unwrap().is_empty());
    assert_eq!(harness.image.calls(), 0);
}

#[tokio::test]
async fn test_web_story_run() {
    let schedule = Schedule::builder()
        .id(Uuid::new_v4())
        .name("stories")
        .kind(ContentKind::Devotional)
        .output(ScheduleOutput::WebStory)
        .author_id(Uuid::new_v4())
        .target_languages(vec!["es".to_string()])
        .build()
        .unwrap();
    let (store, verse_ids) = seeded(&schedule, 1).await;

    let harness = Harness::new();
    let primary = FakeText::always("primary", &story_json("Psalm 23", 2));
    let fallback = FakeText::always("fallback", &story_json("Psalm 23", 4));
    let pipeline = harness.pipeline(
        Arc::new(store.clone()),
        vec![available(&primary), available(&fallback)],
    );

    let outcome = pipeline.run(*schedule.id()).await.unwrap();
    let RunOutcome::StoryCreated {
        story_id, pages, ..
    } = outcome
    else {
        panic!("expected story");
    };
    assert_eq!(pages, 4);
    assert_eq!(harness.image.calls(), 4);

    let stories = store.all_stories().await;
    assert_eq!(stories.len(), 1);
    assert_eq!(stories[0].id, story_id);
    assert_eq!(stories[0].story.slug, "psalm-23");
    let urls: HashSet<_> = stories[0].story.pages.iter().map(|p| &p.image_url).collect();
    assert_eq!(urls.len(), 4);

    assert_eq!(store.used_sources(*schedule.id()).await.unwrap(), verse_ids);
    // Stories are not translated
    assert!(store.all_tasks().await.is_empty());
    assert!(store.all_contents().await.is_empty());
}
