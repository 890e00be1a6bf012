use lx_core::{Result, SavedArticle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::warn;

pub const SAVED_ARTICLES_FILE: &str = "saved-articles.json";
pub const ANONYMOUS_SLOT: &str = "anonymous";

pub fn user_slot(user_id: &str) -> String {
    format!("user:{}", user_id)
}

/// Articles a user saved while the remote store was failing, not yet pushed.
pub fn pending_slot(user_id: &str) -> String {
    format!("pending:{}", user_id)
}

/// Named lists of saved articles, one per slot, optionally backed by a JSON
/// file. Each list holds at most one entry per article id.
pub struct LocalSavedStore {
    path: Option<PathBuf>,
    slots: RwLock<BTreeMap<String, Vec<SavedArticle>>>,
}

impl LocalSavedStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            slots: RwLock::new(BTreeMap::new()),
        }
    }

    /// Loads `saved-articles.json` from `dir`; a missing or unreadable file
    /// starts empty.
    pub fn open(dir: &Path) -> Self {
        let path = dir.join(SAVED_ARTICLES_FILE);
        let slots = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring corrupt {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self {
            path: Some(path),
            slots: RwLock::new(slots),
        }
    }

    pub fn from_dir(dir: Option<&Path>) -> Self {
        match dir {
            Some(dir) => Self::open(dir),
            None => Self::in_memory(),
        }
    }

    pub async fn list(&self, slot: &str) -> Vec<SavedArticle> {
        self.slots.read().await.get(slot).cloned().unwrap_or_default()
    }

    pub async fn get(&self, slot: &str, article_id: &str) -> Option<SavedArticle> {
        self.slots
            .read()
            .await
            .get(slot)
            .and_then(|list| list.iter().find(|s| s.article.id == article_id).cloned())
    }

    /// Returns `false` when the article was already in the slot.
    pub async fn insert(&self, slot: &str, saved: SavedArticle) -> bool {
        let mut slots = self.slots.write().await;
        let list = slots.entry(slot.to_string()).or_default();
        if list.iter().any(|s| s.article.id == saved.article.id) {
            return false;
        }
        list.insert(0, saved);
        self.persist(&slots).await;
        true
    }

    pub async fn remove(&self, slot: &str, article_id: &str) -> bool {
        let mut slots = self.slots.write().await;
        let Some(list) = slots.get_mut(slot) else {
            return false;
        };
        let before = list.len();
        list.retain(|s| s.article.id != article_id);
        let removed = list.len() != before;
        if removed {
            self.persist(&slots).await;
        }
        removed
    }

    pub async fn replace(&self, slot: &str, articles: Vec<SavedArticle>) {
        let mut slots = self.slots.write().await;
        slots.insert(slot.to_string(), articles);
        self.persist(&slots).await;
    }

    async fn persist(&self, slots: &BTreeMap<String, Vec<SavedArticle>>) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = write_slots(path, slots).await {
            warn!("Failed to persist saved articles to {}: {}", path.display(), e);
        }
    }
}

async fn write_slots(path: &Path, slots: &BTreeMap<String, Vec<SavedArticle>>) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let raw = serde_json::to_string_pretty(slots)?;
    tokio::fs::write(path, raw).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lx_core::{Article, Category};
    use tempfile::TempDir;

    fn saved(id: &str) -> SavedArticle {
        SavedArticle {
            article: Article {
                id: id.to_string(),
                title: format!("Title {}", id),
                description: String::new(),
                content: String::new(),
                url: format!("https://example.com/{}", id),
                image_url: "https://example.com/i.png".to_string(),
                published_at: Utc::now(),
                source: "Example".to_string(),
                category: Category::General,
            },
            user_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_is_unique_by_id() {
        let store = LocalSavedStore::in_memory();
        assert!(store.insert(ANONYMOUS_SLOT, saved("a")).await);
        assert!(!store.insert(ANONYMOUS_SLOT, saved("a")).await);
        assert_eq!(store.list(ANONYMOUS_SLOT).await.len(), 1);
        assert!(store.list(&user_slot("u1")).await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let store = LocalSavedStore::in_memory();
        assert!(!store.remove(ANONYMOUS_SLOT, "nope").await);
        store.insert(ANONYMOUS_SLOT, saved("a")).await;
        assert!(store.remove(ANONYMOUS_SLOT, "a").await);
        assert!(store.get(ANONYMOUS_SLOT, "a").await.is_none());
    }

    #[tokio::test]
    async fn test_slots_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = LocalSavedStore::open(dir.path());
            store.insert(ANONYMOUS_SLOT, saved("a")).await;
            store.replace(&user_slot("u1"), vec![saved("b"), saved("c")]).await;
        }
        let reopened = LocalSavedStore::open(dir.path());
        assert_eq!(reopened.list(ANONYMOUS_SLOT).await.len(), 1);
        assert_eq!(reopened.list(&user_slot("u1")).await.len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SAVED_ARTICLES_FILE), "{not json").unwrap();
        let store = LocalSavedStore::open(dir.path());
        assert!(store.list(ANONYMOUS_SLOT).await.is_empty());
    }
}
