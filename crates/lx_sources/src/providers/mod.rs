use async_trait::async_trait;
use lx_core::config::{self, SourceConfig};
use lx_core::{Article, Category, Config, Error, Result};
use std::sync::Arc;

pub mod google_news;
pub mod newsapi;
pub mod newsdata;
pub mod oxylabs;

pub use google_news::GoogleNewsProvider;
pub use newsapi::NewsApiProvider;
pub use newsdata::NewsDataProvider;
pub use oxylabs::OxylabsProvider;

/// One logical content request, independent of any upstream.
#[derive(Debug, Clone, PartialEq)]
pub enum NewsRequest {
    TopHeadlines {
        category: Option<Category>,
        country: String,
        page_size: usize,
    },
    Search {
        query: String,
        page_size: usize,
    },
    Topic {
        topic: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    TopHeadlines,
    Search,
    Topic,
}

impl NewsRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            NewsRequest::TopHeadlines { .. } => RequestKind::TopHeadlines,
            NewsRequest::Search { .. } => RequestKind::Search,
            NewsRequest::Topic { .. } => RequestKind::Topic,
        }
    }
}

#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Source id, matching `SourceConfig::id`.
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn supports(&self, kind: RequestKind) -> bool;
    /// One upstream call. Timeouts and retries are the caller's job.
    async fn fetch(&self, request: &NewsRequest) -> Result<Vec<Article>>;
}

/// All built-in providers in priority order. Oxylabs only serves searches and
/// Google News only topics, so headlines start at NewsAPI.
pub fn build_providers(config: &Config, client: reqwest::Client) -> Vec<Arc<dyn NewsProvider>> {
    let mut providers: Vec<Arc<dyn NewsProvider>> = Vec::new();
    if let Some(source) = config.source(config::OXYLABS) {
        providers.push(Arc::new(OxylabsProvider::new(source.clone(), client.clone())));
    }
    if let Some(source) = config.source(config::NEWSAPI) {
        providers.push(Arc::new(NewsApiProvider::new(source.clone(), client.clone())));
    }
    if let Some(source) = config.source(config::NEWSDATA) {
        providers.push(Arc::new(NewsDataProvider::new(source.clone(), client.clone())));
    }
    if let Some(source) = config.source(config::GOOGLE_NEWS) {
        providers.push(Arc::new(GoogleNewsProvider::new(source.clone(), client)));
    }
    providers
}

pub(crate) fn require_key<'a>(source: &'a SourceConfig) -> Result<&'a str> {
    source
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| Error::Upstream {
            source_id: source.id.clone(),
            status: 401,
        })
}

/// Maps non-2xx responses to `Error::Upstream` so 426 can be recognised.
pub(crate) fn check_status(source_id: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::Upstream {
            source_id: source_id.to_string(),
            status: status.as_u16(),
        })
    }
}
