use std::path::Path;

use chrono::{TimeZone, Utc};
use repo_sync::{BaseFileListItem, ContentCache, ContentSnapshot, EntryFile, FileMeta, HandleStore};
use repo_sync_store::SqliteStore;

fn entry(path: &str, sha: &str, text: &str) -> EntryFile {
    let item = BaseFileListItem::new(path, sha, text.len() as u64);
    EntryFile {
        path: item.path,
        name: item.name,
        sha: item.sha,
        size: item.size,
        text: text.to_owned(),
        meta: FileMeta::default(),
    }
}

fn sample_snapshot() -> ContentSnapshot {
    let mut dated = entry("content/b.md", "b1", "bravo");
    dated.meta.last_modified = Some(Utc.with_ymd_and_hms(2024, 3, 4, 5, 6, 7).unwrap());

    ContentSnapshot {
        last_commit_hash: Some("c1".into()),
        entries: vec![entry("content/z.md", "z1", "zulu"), dated],
        assets: vec![BaseFileListItem::new("static/logo.png", "l1", 900)],
    }
}

fn create_store() -> SqliteStore {
    SqliteStore::open_in_memory().unwrap()
}

#[tokio::test]
async fn load_returns_none_when_never_saved() {
    let store = create_store();
    assert!(store.load("site").await.unwrap().is_none());
    assert!(store.synced_at("site").unwrap().is_none());
}

#[tokio::test]
async fn saved_snapshot_is_loaded_back_in_order() {
    let store = create_store();
    let snapshot = sample_snapshot();

    store.save("site", &snapshot).await.unwrap();
    let loaded = store.load("site").await.unwrap().unwrap();

    assert_eq!(loaded, snapshot);
    assert!(store.synced_at("site").unwrap().is_some());
}

#[tokio::test]
async fn save_replaces_previous_snapshot() {
    let store = create_store();
    store.save("site", &sample_snapshot()).await.unwrap();

    let smaller = ContentSnapshot {
        last_commit_hash: Some("c2".into()),
        entries: vec![entry("content/a.md", "a2", "alpha")],
        assets: Vec::new(),
    };
    store.save("site", &smaller).await.unwrap();

    assert_eq!(store.load("site").await.unwrap().unwrap(), smaller);
}

#[tokio::test]
async fn snapshots_are_scoped_by_database_name() {
    let store = create_store();
    store.save("one", &sample_snapshot()).await.unwrap();

    let local = ContentSnapshot {
        last_commit_hash: None,
        entries: vec![entry("notes.md", "n1", "local")],
        assets: Vec::new(),
    };
    store.save("two", &local).await.unwrap();

    assert_eq!(store.load("one").await.unwrap().unwrap(), sample_snapshot());
    let loaded = store.load("two").await.unwrap().unwrap();
    assert_eq!(loaded.last_commit_hash, None);
    assert_eq!(loaded.entries[0].text, "local");
}

#[tokio::test]
async fn clear_removes_snapshot() {
    let store = create_store();
    store.save("site", &sample_snapshot()).await.unwrap();

    store.clear("site").unwrap();

    assert!(store.load("site").await.unwrap().is_none());
}

#[tokio::test]
async fn empty_snapshot_is_distinct_from_missing() {
    let store = create_store();
    store
        .save("site", &ContentSnapshot::default())
        .await
        .unwrap();

    assert_eq!(
        store.load("site").await.unwrap(),
        Some(ContentSnapshot::default())
    );
}

#[tokio::test]
async fn directory_handles_round_trip() {
    let store = create_store();

    assert!(store.load_handle("site").await.unwrap().is_none());

    store
        .save_handle("site", Path::new("/home/jane/site"))
        .await
        .unwrap();
    assert_eq!(
        store.load_handle("site").await.unwrap().as_deref(),
        Some(Path::new("/home/jane/site"))
    );

    store
        .save_handle("site", Path::new("/home/jane/other"))
        .await
        .unwrap();
    assert_eq!(
        store.load_handle("site").await.unwrap().as_deref(),
        Some(Path::new("/home/jane/other"))
    );

    store.forget_handle("site").await.unwrap();
    assert!(store.load_handle("site").await.unwrap().is_none());
}

#[tokio::test]
async fn file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        store.save("site", &sample_snapshot()).await.unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    assert_eq!(store.load("site").await.unwrap().unwrap(), sample_snapshot());
}
