use super::*;
use prompto_protocols::{TransformKind, UserProfile};
use tempfile::TempDir;

fn credential() -> Credential {
    Credential::new(
        "tok-123",
        UserProfile {
            id: Some("u1".to_string()),
            username: "ada".to_string(),
            email: Some("ada@example.com".to_string()),
            plan: None,
        },
    )
}

#[tokio::test]
async fn test_missing_file_is_empty_state() {
    let temp = TempDir::new().unwrap();
    let store = FileStateStore::new(temp.path().join("state.json"));
    assert!(store.credential().await.unwrap().is_none());
    assert_eq!(store.usage().await.unwrap(), UsageCounters::default());
}

#[tokio::test]
async fn test_credential_roundtrip_persists() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("state.json");
    {
        let store = FileStateStore::new(&path);
        store.set_credential(credential()).await.unwrap();
    }

    let reopened = FileStateStore::new(&path);
    let loaded = reopened.credential().await.unwrap().unwrap();
    assert_eq!(loaded.token, "tok-123");
    assert_eq!(loaded.user.username, "ada");

    reopened.clear_credential().await.unwrap();
    assert!(reopened.credential().await.unwrap().is_none());
}

#[tokio::test]
async fn test_usage_and_credential_share_document() {
    let temp = TempDir::new().unwrap();
    let store = FileStateStore::new(temp.path().join("state.json"));
    store.set_credential(credential()).await.unwrap();

    let mut usage = UsageCounters::default();
    usage.record_transform(TransformKind::Optimize, 100, 60);
    store.save_usage(&usage).await.unwrap();

    let state = store.load().await.unwrap();
    assert!(state.credential.is_some());
    assert_eq!(state.usage.optimizations, 1);
    assert_eq!(state.usage.chars_saved, 40);
}

#[tokio::test]
async fn test_no_temp_file_left_behind() {
    let temp = TempDir::new().unwrap();
    let store = FileStateStore::new(temp.path().join("state.json"));
    store.save_usage(&UsageCounters::default()).await.unwrap();

    let names: Vec<String> = std::fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["state.json"]);
}

#[tokio::test]
async fn test_corrupt_file_is_reported() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state.json");
    tokio::fs::write(&path, "{not json").await.unwrap();

    let store = FileStateStore::new(&path);
    match store.credential().await {
        Err(StoreError::Corrupt { path: p, .. }) => assert_eq!(p, path),
        other => panic!("Expected Corrupt, got {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrent_updates_keep_both_fields() {
    let temp = TempDir::new().unwrap();
    let store = std::sync::Arc::new(FileStateStore::new(temp.path().join("state.json")));

    let mut usage = UsageCounters::default();
    usage.record_acceptance();
    let (a, b) = tokio::join!(store.set_credential(credential()), store.save_usage(&usage));
    a.unwrap();
    b.unwrap();

    let state = store.load().await.unwrap();
    assert!(state.credential.is_some());
    assert_eq!(state.usage.accepted, 1);
}

#[tokio::test]
async fn test_memory_store() {
    let store = MemoryStateStore::with_credential(credential());
    assert!(store.credential().await.unwrap().is_some());
    store.clear_credential().await.unwrap();
    assert!(store.snapshot().credential.is_none());
}
