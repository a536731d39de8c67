//! Filesystem backend behavior.

use vesper_storage::{FileSystemStore, MediaStore, StorageConfig, build_store};

#[tokio::test]
async fn test_same_owner_twice_gets_distinct_urls() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = FileSystemStore::new(dir.path(), "https://media.example/");

    let first = store
        .put_unique("author-1", b"one".to_vec(), "image/png")
        .await
        .expect("First upload");
    let second = store
        .put_unique("author-1", b"two".to_vec(), "image/png")
        .await
        .expect("Second upload");

    assert_ne!(first, second);
    assert!(first.starts_with("https://media.example/author-1/"));
    assert!(first.ends_with(".png"));

    let relative = first.trim_start_matches("https://media.example/");
    let written = std::fs::read(dir.path().join(relative)).expect("File exists");
    assert_eq!(written, b"one");
}

#[tokio::test]
async fn test_existing_object_is_not_overwritten() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = FileSystemStore::new(dir.path(), "http://localhost/media");

    store
        .put("owner/fixed.png", b"original".to_vec(), "image/png")
        .await
        .expect("First write");
    let result = store
        .put("owner/fixed.png", b"replacement".to_vec(), "image/png")
        .await;

    assert!(result.is_err());
    let kept = std::fs::read(dir.path().join("owner/fixed.png")).expect("File exists");
    assert_eq!(kept, b"original");
}

#[tokio::test]
async fn test_path_traversal_rejected() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = FileSystemStore::new(dir.path(), "http://localhost/media");

    let result = store.put("../escape.png", b"x".to_vec(), "image/png").await;
    assert!(result.is_err());
}

#[test]
fn test_object_backend_requires_key() {
    let config: StorageConfig = serde_json::from_value(serde_json::json!({
        "backend": "object",
        "base_url": "https://x.example/storage/v1",
        "bucket": "media",
        "api_key_env": "VESPER_TEST_STORAGE_KEY_NEVER_SET"
    }))
    .expect("Valid config");

    assert!(build_store(&config).is_err());
}
