//! Saved-article persistence.
//!
//! Anonymous callers use the shared local slot. Signed-in callers use the
//! remote `saved_articles` table as the source of truth and every successful
//! remote read or write is mirrored into that user's local slot. When the
//! remote store is missing or failing, signed-in calls quietly work against
//! the local mirror instead. Saves made during a remote failure are queued
//! and pushed on the next successful read.

use chrono::{DateTime, Utc};
use lx_core::{Article, Error, Filter, Record, RecordStore, Result, SavedArticle};
use lx_sources::normalize::optimized_image_url;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::local::{pending_slot, user_slot, LocalSavedStore, ANONYMOUS_SLOT};

pub const SAVED_ARTICLES_TABLE: &str = "saved_articles";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveOutcome {
    Saved,
    AlreadySaved,
}

pub struct SavedArticles {
    local: LocalSavedStore,
    remote: Option<Arc<dyn RecordStore>>,
}

impl SavedArticles {
    pub fn new(local: LocalSavedStore, remote: Option<Arc<dyn RecordStore>>) -> Self {
        Self { local, remote }
    }

    pub async fn get(&self, user: Option<&str>) -> Vec<SavedArticle> {
        let (Some(user_id), Some(remote)) = (user, &self.remote) else {
            return self.local.list(&slot_for(user)).await;
        };

        match remote.select(SAVED_ARTICLES_TABLE, &[Filter::eq("user_id", user_id)]).await {
            Ok(rows) => {
                let mut saved: Vec<SavedArticle> = rows.iter().filter_map(|r| from_row(r, user_id)).collect();
                self.push_pending(remote.as_ref(), user_id, &mut saved).await;
                saved.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                self.local.replace(&user_slot(user_id), saved.clone()).await;
                saved
            }
            Err(e) => {
                warn!("Remote saved articles unavailable, using local copy: {}", e);
                self.local.list(&user_slot(user_id)).await
            }
        }
    }

    pub async fn save(&self, article: Article, user: Option<&str>) -> Result<SaveOutcome> {
        if article.id.trim().is_empty() || article.title.trim().is_empty() {
            return Err(Error::validation("INVALID_ARTICLE", "Invalid article data"));
        }

        let mut article = article;
        article.image_url = optimized_image_url(&article.image_url, &article.title);
        let saved = SavedArticle {
            article,
            user_id: user.map(str::to_string),
            created_at: Utc::now(),
        };

        let (Some(user_id), Some(remote)) = (user, &self.remote) else {
            return Ok(self.save_local(&slot_for(user), saved).await);
        };

        match self.save_remote(remote.as_ref(), user_id, &saved).await {
            Ok(outcome) => {
                self.local.insert(&user_slot(user_id), saved).await;
                Ok(outcome)
            }
            Err(e) => {
                warn!("Remote save failed, keeping article locally: {}", e);
                self.local.insert(&pending_slot(user_id), saved.clone()).await;
                Ok(self.save_local(&user_slot(user_id), saved).await)
            }
        }
    }

    pub async fn remove(&self, article_id: &str, user: Option<&str>) {
        let (Some(user_id), Some(remote)) = (user, &self.remote) else {
            self.local.remove(&slot_for(user), article_id).await;
            return;
        };

        let filters = [Filter::eq("user_id", user_id), Filter::eq("article_id", article_id)];
        if let Err(e) = remote.delete(SAVED_ARTICLES_TABLE, &filters).await {
            warn!("Remote remove failed, removing locally only: {}", e);
        }
        self.local.remove(&pending_slot(user_id), article_id).await;
        self.local.remove(&user_slot(user_id), article_id).await;
    }

    pub async fn is_saved(&self, article_id: &str, user: Option<&str>) -> bool {
        self.get_by_id(article_id, user).await.is_some()
    }

    pub async fn get_by_id(&self, article_id: &str, user: Option<&str>) -> Option<SavedArticle> {
        let (Some(user_id), Some(remote)) = (user, &self.remote) else {
            return self.local.get(&slot_for(user), article_id).await;
        };

        let filters = [Filter::eq("user_id", user_id), Filter::eq("article_id", article_id)];
        match remote.select(SAVED_ARTICLES_TABLE, &filters).await {
            Ok(rows) => rows.iter().find_map(|r| from_row(r, user_id)),
            Err(e) => {
                warn!("Remote lookup failed, using local copy: {}", e);
                self.local.get(&user_slot(user_id), article_id).await
            }
        }
    }

    /// Entries that still fail stay queued and are kept in `saved` so the
    /// mirror does not drop them.
    async fn push_pending(&self, remote: &dyn RecordStore, user_id: &str, saved: &mut Vec<SavedArticle>) {
        let slot = pending_slot(user_id);
        for pending in self.local.list(&slot).await {
            let id = pending.article.id.clone();
            if saved.iter().any(|s| s.article.id == id) {
                self.local.remove(&slot, &id).await;
                continue;
            }
            match self.save_remote(remote, user_id, &pending).await {
                Ok(_) => {
                    debug!("Synced article {} saved offline for {}", id, user_id);
                    self.local.remove(&slot, &id).await;
                }
                Err(e) => warn!("Article {} still not synced: {}", id, e),
            }
            saved.push(pending);
        }
    }

    async fn save_local(&self, slot: &str, saved: SavedArticle) -> SaveOutcome {
        if self.local.insert(slot, saved).await {
            SaveOutcome::Saved
        } else {
            SaveOutcome::AlreadySaved
        }
    }

    async fn save_remote(&self, remote: &dyn RecordStore, user_id: &str, saved: &SavedArticle) -> Result<SaveOutcome> {
        let filters = [Filter::eq("user_id", user_id), Filter::eq("article_id", saved.article.id.as_str())];
        if !remote.select(SAVED_ARTICLES_TABLE, &filters).await?.is_empty() {
            debug!("Article {} already saved for {}", saved.article.id, user_id);
            return Ok(SaveOutcome::AlreadySaved);
        }
        remote.insert(SAVED_ARTICLES_TABLE, to_row(user_id, saved)?).await?;
        Ok(SaveOutcome::Saved)
    }
}

fn slot_for(user: Option<&str>) -> String {
    match user {
        Some(user_id) => user_slot(user_id),
        None => ANONYMOUS_SLOT.to_string(),
    }
}

fn to_row(user_id: &str, saved: &SavedArticle) -> Result<Record> {
    let mut row = Record::new();
    row.insert("user_id".to_string(), Value::String(user_id.to_string()));
    row.insert("article_id".to_string(), Value::String(saved.article.id.clone()));
    row.insert(
        "article_data".to_string(),
        Value::String(serde_json::to_string(&saved.article)?),
    );
    row.insert("created_at".to_string(), Value::String(saved.created_at.to_rfc3339()));
    Ok(row)
}

/// Rows with unparseable `article_data` are skipped.
fn from_row(row: &Record, user_id: &str) -> Option<SavedArticle> {
    let article = match row.get("article_data")? {
        Value::String(raw) => serde_json::from_str::<Article>(raw).ok()?,
        other => serde_json::from_value::<Article>(other.clone()).ok()?,
    };
    let created_at = row
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);
    Some(SavedArticle {
        article,
        user_id: Some(user_id.to_string()),
        created_at,
    })
}
