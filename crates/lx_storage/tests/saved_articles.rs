use async_trait::async_trait;
use chrono::Utc;
use lx_core::{Article, Category, Error, Filter, Record, RecordStore, Result};
use lx_storage::saved::SAVED_ARTICLES_TABLE;
use lx_storage::{LocalSavedStore, MemoryRecordStore, SaveOutcome, SavedArticles};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Every call fails and is counted.
#[derive(Default)]
struct FailingRecordStore {
    calls: AtomicUsize,
}

impl FailingRecordStore {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::Storage("backend unreachable".to_string()))
    }
}

#[async_trait]
impl RecordStore for FailingRecordStore {
    async fn select(&self, _table: &str, _filters: &[Filter]) -> Result<Vec<Record>> {
        self.fail()
    }

    async fn insert(&self, _table: &str, _record: Record) -> Result<()> {
        self.fail()
    }

    async fn update(&self, _table: &str, _filters: &[Filter], _patch: Record) -> Result<u64> {
        self.fail()
    }

    async fn delete(&self, _table: &str, _filters: &[Filter]) -> Result<u64> {
        self.fail()
    }
}

/// Memory-backed store that fails every call while `down` is set.
#[derive(Default)]
struct FlakyRecordStore {
    inner: MemoryRecordStore,
    down: AtomicBool,
}

impl FlakyRecordStore {
    fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(Error::Storage("backend unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FlakyRecordStore {
    async fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Record>> {
        self.check()?;
        self.inner.select(table, filters).await
    }

    async fn insert(&self, table: &str, record: Record) -> Result<()> {
        self.check()?;
        self.inner.insert(table, record).await
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Record) -> Result<u64> {
        self.check()?;
        self.inner.update(table, filters, patch).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64> {
        self.check()?;
        self.inner.delete(table, filters).await
    }
}

fn article(id: &str) -> Article {
    Article {
        id: id.to_string(),
        title: format!("Story {}", id),
        description: "desc".to_string(),
        content: "content".to_string(),
        url: format!("https://example.com/{}", id),
        image_url: "https://images.example.com/a.jpg".to_string(),
        published_at: Utc::now(),
        source: "Example".to_string(),
        category: Category::Technology,
    }
}

#[tokio::test]
async fn test_anonymous_saves_never_touch_remote() {
    let remote = Arc::new(FailingRecordStore::default());
    let saved = SavedArticles::new(LocalSavedStore::in_memory(), Some(remote.clone()));

    assert_eq!(saved.save(article("a"), None).await.unwrap(), SaveOutcome::Saved);
    assert!(saved.is_saved("a", None).await);
    assert_eq!(saved.get(None).await.len(), 1);
    saved.remove("a", None).await;

    assert_eq!(remote.calls(), 0);
}

#[tokio::test]
async fn test_save_is_idempotent() {
    let saved = SavedArticles::new(LocalSavedStore::in_memory(), None);
    assert_eq!(saved.save(article("a"), None).await.unwrap(), SaveOutcome::Saved);
    assert_eq!(saved.save(article("a"), None).await.unwrap(), SaveOutcome::AlreadySaved);
    assert_eq!(saved.get(None).await.len(), 1);
}

#[tokio::test]
async fn test_invalid_article_is_rejected() {
    let saved = SavedArticles::new(LocalSavedStore::in_memory(), None);
    let mut untitled = article("a");
    untitled.title = "  ".to_string();
    let err = saved.save(untitled, None).await.unwrap_err();
    assert!(matches!(err, Error::Validation { code: "INVALID_ARTICLE", .. }));
}

#[tokio::test]
async fn test_remove_missing_is_noop() {
    let saved = SavedArticles::new(LocalSavedStore::in_memory(), None);
    saved.save(article("a"), Some("u1")).await.unwrap();
    saved.remove("missing", Some("u1")).await;
    assert_eq!(saved.get(Some("u1")).await.len(), 1);
}

#[tokio::test]
async fn test_remote_failure_falls_back_to_local() {
    let remote = Arc::new(FailingRecordStore::default());
    let saved = SavedArticles::new(LocalSavedStore::in_memory(), Some(remote.clone()));

    assert_eq!(saved.save(article("a"), Some("u1")).await.unwrap(), SaveOutcome::Saved);
    let list = saved.get(Some("u1")).await;
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].article.id, "a");
    assert!(saved.get_by_id("a", Some("u1")).await.is_some());
    assert!(remote.calls() >= 3);

    // Other users and the anonymous slot stay separate
    assert!(saved.get(Some("u2")).await.is_empty());
    assert!(saved.get(None).await.is_empty());
}

#[tokio::test]
async fn test_remote_is_source_of_truth_and_mirrored() {
    let remote = Arc::new(MemoryRecordStore::new());
    let dir = TempDir::new().unwrap();
    let saved = SavedArticles::new(LocalSavedStore::open(dir.path()), Some(remote.clone()));

    saved.save(article("a"), Some("u1")).await.unwrap();
    assert_eq!(saved.save(article("a"), Some("u1")).await.unwrap(), SaveOutcome::AlreadySaved);
    saved.save(article("b"), Some("u1")).await.unwrap();
    assert_eq!(remote.row_count(SAVED_ARTICLES_TABLE).await, 2);

    let rows = remote
        .select(SAVED_ARTICLES_TABLE, &[Filter::eq("article_id", "a")])
        .await
        .unwrap();
    assert!(rows[0]["article_data"].is_string());

    saved.remove("a", Some("u1")).await;
    assert_eq!(remote.row_count(SAVED_ARTICLES_TABLE).await, 1);

    // A fresh adapter over the same directory sees the mirror without the remote
    let offline = SavedArticles::new(LocalSavedStore::open(dir.path()), None);
    let mirrored = offline.get(Some("u1")).await;
    assert_eq!(mirrored.len(), 1);
    assert_eq!(mirrored[0].article.id, "b");
}

#[tokio::test]
async fn test_placeholder_image_is_applied_on_save() {
    let saved = SavedArticles::new(LocalSavedStore::in_memory(), None);
    let mut broken = article("a");
    broken.image_url = String::new();
    saved.save(broken, None).await.unwrap();
    let stored = saved.get_by_id("a", None).await.unwrap();
    assert!(stored.article.image_url.starts_with("/placeholder.svg"));
}

#[tokio::test]
async fn test_offline_saves_are_pushed_after_recovery() {
    let remote = Arc::new(FlakyRecordStore::default());
    let saved = SavedArticles::new(LocalSavedStore::in_memory(), Some(remote.clone()));
    saved.save(article("before"), Some("u1")).await.unwrap();

    remote.set_down(true);
    assert_eq!(saved.save(article("offline"), Some("u1")).await.unwrap(), SaveOutcome::Saved);
    assert_eq!(saved.get(Some("u1")).await.len(), 2);

    remote.set_down(false);
    let ids: Vec<String> = saved.get(Some("u1")).await.into_iter().map(|s| s.article.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"offline".to_string()));

    let rows = remote.select(SAVED_ARTICLES_TABLE, &[Filter::eq("user_id", "u1")]).await.unwrap();
    assert_eq!(rows.len(), 2);
    // Already pushed, so a second read does not insert again
    saved.get(Some("u1")).await;
    let rows = remote.select(SAVED_ARTICLES_TABLE, &[Filter::eq("user_id", "u1")]).await.unwrap();
    assert_eq!(rows.len(), 2);
}
