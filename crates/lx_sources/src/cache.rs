use lx_core::Category;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Deterministic cache key for one logical request.
///
/// Every kind carries its own prefix and free text always comes last, so
/// requests differing in any parameter never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn headlines(category: Option<&Category>, country: &str, page_size: usize) -> Self {
        let category = category.map(|c| c.as_str().to_lowercase()).unwrap_or_else(|| "general".to_string());
        Self(format!("top-headlines|{}|{}|{}", country.to_lowercase(), page_size, category))
    }

    pub fn search(query: &str, page_size: usize) -> Self {
        Self(format!("search|{}|{}", page_size, query.trim().to_lowercase()))
    }

    pub fn topic(topic: &str) -> Self {
        Self(format!("topic|{}", topic.trim().to_lowercase()))
    }

    pub fn media(query: &str, prefer_video: bool) -> Self {
        let kind = if prefer_video { "video" } else { "photo" };
        Self(format!("media|{}|{}", kind, query))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct CacheEntry<T> {
    data: T,
    stored_at: Instant,
}

/// Time-boxed in-memory memoization. Stale entries are never served and are
/// simply overwritten on the next `put`.
pub struct ResponseCache<T> {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry<T>>>,
}

impl<T: Clone> ResponseCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<T> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            debug!("Using cached response for {}", key);
            Some(entry.data.clone())
        } else {
            None
        }
    }

    pub async fn put(&self, key: CacheKey, data: T) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                data,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries, stale ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
