use chronolog_store::{MetadataStore, RecordOutcome};

async fn open_store() -> (tempfile::TempDir, MetadataStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = MetadataStore::open(dir.path().join("history.db"))
        .await
        .unwrap();
    (dir, store)
}

#[tokio::test]
async fn main_branch_exists_after_open() {
    let (_dir, store) = open_store().await;
    let main = store.get_branch("main").await.unwrap();
    assert!(main.is_some());
    assert_eq!(main.unwrap().head_digest, "");
}

#[tokio::test]
async fn record_revision_dedups_identical_pair() {
    let (_dir, store) = open_store().await;
    let digest = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";

    let first = store
        .record_revision("note.txt", digest, 6, None, None, Some("hello\n".into()), "main")
        .await
        .unwrap();
    assert!(matches!(first, RecordOutcome::Recorded(_)));

    let second = store
        .record_revision("note.txt", digest, 6, None, None, Some("hello\n".into()), "main")
        .await
        .unwrap();
    assert!(matches!(second, RecordOutcome::Deduped(_)));

    let history = store.file_history("note.txt").await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn record_revision_updates_branch_head() {
    let (_dir, store) = open_store().await;
    let digest = "abc123abc123abc123abc123abc123abc123abc123abc123abc123abc123ab";
    store
        .record_revision("a.txt", digest, 3, None, None, None, "main")
        .await
        .unwrap();
    let main = store.get_branch("main").await.unwrap().unwrap();
    assert_eq!(main.head_digest, digest);
}

#[tokio::test]
async fn resolve_digest_prefix() {
    let (_dir, store) = open_store().await;
    let digest = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";
    store
        .record_revision("note.txt", digest, 6, None, None, None, "main")
        .await
        .unwrap();

    let resolved = store.resolve_digest("5891b5b5").await.unwrap();
    assert_eq!(resolved, digest);
}

#[tokio::test]
async fn resolve_digest_ambiguous_prefix_fails() {
    let (_dir, store) = open_store().await;
    store
        .record_revision("a.txt", "aa11111111111111111111111111111111111111111111111111111111111", 1, None, None, None, "main")
        .await
        .unwrap();
    store
        .record_revision("b.txt", "aa22222222222222222222222222222222222222222222222222222222222", 1, None, None, None, "main")
        .await
        .unwrap();

    let err = store.resolve_digest("aa").await.unwrap_err();
    assert!(matches!(err, chronolog_store::StoreError::AmbiguousDigest(_)));
}

#[tokio::test]
async fn branch_lifecycle() {
    let (_dir, store) = open_store().await;
    let created = store.create_branch("feature", "main").await.unwrap();
    assert_eq!(created.parent_branch.as_deref(), Some("main"));

    let err = store.create_branch("feature", "main").await.unwrap_err();
    assert!(matches!(err, chronolog_store::StoreError::BranchExists(_)));

    let err = store.delete_branch("main", "feature").await.unwrap_err();
    assert!(matches!(err, chronolog_store::StoreError::CannotDeleteBranch(_)));

    let err = store.delete_branch("feature", "feature").await.unwrap_err();
    assert!(matches!(err, chronolog_store::StoreError::CannotDeleteBranch(_)));

    store.delete_branch("feature", "main").await.unwrap();
    assert!(store.get_branch("feature").await.unwrap().is_none());
}

#[tokio::test]
async fn tag_lifecycle() {
    let (_dir, store) = open_store().await;
    let digest = "cafe000000000000000000000000000000000000000000000000000000000";
    store.create_tag("v1", digest, Some("first".into())).await.unwrap();

    let err = store.create_tag("v1", digest, None).await.unwrap_err();
    assert!(matches!(err, chronolog_store::StoreError::TagExists(_)));

    let tags = store.list_tags().await.unwrap();
    assert_eq!(tags.len(), 1);

    store.delete_tag("v1").await.unwrap();
    assert!(store.get_tag("v1").await.unwrap().is_none());
}

#[tokio::test]
async fn search_finds_indexed_text() {
    let (_dir, store) = open_store().await;
    store
        .record_revision(
            "note.txt",
            "d00d000000000000000000000000000000000000000000000000000000000",
            11,
            None,
            None,
            Some("hello world".into()),
            "main",
        )
        .await
        .unwrap();

    let hits = store.search("world", None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(hits[0].snippet.contains("<mark>"));
}

#[tokio::test]
async fn search_changes_detects_added_text() {
    let (_dir, store) = open_store().await;
    store
        .record_revision(
            "a.txt",
            "1111111111111111111111111111111111111111111111111111111111111",
            5,
            None,
            None,
            Some("alpha".into()),
            "main",
        )
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    store
        .record_revision(
            "a.txt",
            "2222222222222222222222222222222222222222222222222222222222222",
            11,
            None,
            None,
            Some("alpha beta".into()),
            "main",
        )
        .await
        .unwrap();

    let hits = store.search_changes(Some("beta"), None).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].file_path, "a.txt");
}
