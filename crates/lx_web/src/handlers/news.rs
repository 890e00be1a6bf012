use axum::extract::{Query, State};
use lx_core::{Article, Category, Error, Filter};
use lx_sources::{MediaOptions, MediaOutcome, SourceUsageSnapshot};
use lx_storage::accounts::PROFILES_TABLE;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::response::{ok, ApiResult};
use crate::validation::{self, sanitize};
use crate::AppState;

const DEFAULT_COUNTRY: &str = "us";
const DEFAULT_TOPIC: &str = "world news";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsQuery {
    pub category: Option<String>,
    pub country: Option<String>,
    pub page_size: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopicQuery {
    pub topic: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MediaQuery {
    pub title: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ArticleList {
    pub articles: Vec<Article>,
    pub total: usize,
}

impl From<Vec<Article>> for ArticleList {
    fn from(articles: Vec<Article>) -> Self {
        Self {
            total: articles.len(),
            articles,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(sanitize).filter(|s| !s.is_empty())
}

pub async fn get_news(State(state): State<Arc<AppState>>, Query(query): Query<NewsQuery>) -> ApiResult<ArticleList> {
    let page_size = validation::page_size(query.page_size.as_deref())?;
    let articles = match non_empty(query.q.as_deref()) {
        Some(q) => state.fetch.search_articles(&q, page_size).await,
        None => {
            let category = non_empty(query.category.as_deref()).map(|c| Category::parse(&c));
            let country = non_empty(query.country.as_deref()).unwrap_or_else(|| DEFAULT_COUNTRY.to_string());
            state.fetch.fetch_top_headlines(category, &country, page_size).await
        }
    };
    ok(articles.into())
}

pub async fn search(State(state): State<Arc<AppState>>, Query(query): Query<NewsQuery>) -> ApiResult<ArticleList> {
    let q = non_empty(query.q.as_deref())
        .ok_or_else(|| Error::validation("VALIDATION_ERROR", "Missing or invalid required field: q"))?;
    let page_size = validation::page_size(query.page_size.as_deref())?;
    ok(state.fetch.search_articles(&q, page_size).await.into())
}

pub async fn google_news(State(state): State<Arc<AppState>>, Query(query): Query<TopicQuery>) -> ApiResult<ArticleList> {
    let topic = non_empty(query.topic.as_deref()).unwrap_or_else(|| DEFAULT_TOPIC.to_string());
    ok(state.fetch.fetch_topic(&topic).await.into())
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

pub async fn clear_cache(State(state): State<Arc<AppState>>) -> ApiResult<Message> {
    state.fetch.clear_cache().await;
    ok(Message {
        message: "Cache cleared successfully",
    })
}

#[derive(Debug, Serialize)]
pub struct Status {
    pub sources: Vec<SourceUsageSnapshot>,
}

pub async fn status(State(state): State<Arc<AppState>>) -> ApiResult<Status> {
    ok(Status {
        sources: state.fetch.usage_stats().await,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub status: &'static str,
    pub services: Services,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Services {
    pub database: &'static str,
    pub identity: String,
    pub news_sources: Vec<SourceHealth>,
    pub media: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SourceHealth {
    pub id: String,
    pub status: &'static str,
}

/// Liveness plus per-service state. Only the record store is probed; the
/// news sources report whether they are usable without spending quota.
pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<Health> {
    let database = match &state.store {
        Some(store) => match store.select(PROFILES_TABLE, &[Filter::eq("id", "health-check")]).await {
            Ok(_) => "healthy",
            Err(_) => "unhealthy",
        },
        None => "not_configured",
    };

    let news_sources: Vec<SourceHealth> = state
        .fetch
        .usage_stats()
        .await
        .into_iter()
        .map(|s| SourceHealth {
            status: if s.active { "healthy" } else { "not_configured" },
            id: s.id,
        })
        .collect();

    let media = if state.media.is_configured() { "healthy" } else { "not_configured" };

    ok(Health {
        status: if database == "unhealthy" { "degraded" } else { "healthy" },
        services: Services {
            database,
            identity: state.accounts.identity().name().to_string(),
            news_sources,
            media,
        },
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn media(State(state): State<Arc<AppState>>, Query(query): Query<MediaQuery>) -> ApiResult<MediaOutcome> {
    let title = non_empty(query.title.as_deref())
        .ok_or_else(|| Error::validation("VALIDATION_ERROR", "Missing or invalid required field: title"))?;
    let category = non_empty(query.category.as_deref())
        .ok_or_else(|| Error::validation("VALIDATION_ERROR", "Missing or invalid required field: category"))?;
    if !state.media.is_configured() {
        return Err(Error::NotConfigured("Media provider").into());
    }

    let options = MediaOptions {
        enabled: true,
        prefer_video: query.kind.as_deref() == Some("video"),
        ..MediaOptions::default()
    };
    ok(state.media.resolve(&title, &category, &options).await)
}
