use async_trait::async_trait;
use lx_core::config::SourceConfig;
use lx_core::{Article, Result};
use serde::Deserialize;
use serde_json::json;

use super::{check_status, require_key, NewsProvider, NewsRequest, RequestKind};
use crate::normalize::{self, OxylabsNewsResult, RawArticle};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OxylabsContent {
    news_results: Vec<OxylabsNewsResult>,
    #[serde(default)]
    results: Option<OxylabsOrganic>,
}

/// Newer responses nest news under `results.main`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OxylabsOrganic {
    main: Vec<OxylabsNewsResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OxylabsResult {
    content: OxylabsContent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OxylabsResponse {
    results: Vec<OxylabsResult>,
}

impl OxylabsResponse {
    fn into_news(self) -> Vec<OxylabsNewsResult> {
        let Some(first) = self.results.into_iter().next() else {
            return Vec::new();
        };
        if !first.content.news_results.is_empty() {
            first.content.news_results
        } else {
            first.content.results.map(|r| r.main).unwrap_or_default()
        }
    }
}

/// Google News search through the Oxylabs realtime scraper API.
pub struct OxylabsProvider {
    source: SourceConfig,
    client: reqwest::Client,
}

impl OxylabsProvider {
    pub fn new(source: SourceConfig, client: reqwest::Client) -> Self {
        Self { source, client }
    }

    fn payload(query: &str, page_size: usize) -> serde_json::Value {
        json!({
            "source": "google_search",
            "domain": "com",
            "query": query,
            "parse": true,
            "limit": page_size,
            "context": [{"key": "tbm", "value": "nws"}],
        })
    }
}

#[async_trait]
impl NewsProvider for OxylabsProvider {
    fn id(&self) -> &str {
        &self.source.id
    }

    fn name(&self) -> &str {
        &self.source.name
    }

    fn supports(&self, kind: RequestKind) -> bool {
        kind == RequestKind::Search
    }

    async fn fetch(&self, request: &NewsRequest) -> Result<Vec<Article>> {
        let NewsRequest::Search { query, page_size } = request else {
            return Ok(Vec::new());
        };
        let password = require_key(&self.source)?;
        let username = self.source.username.clone().unwrap_or_default();

        let url = format!("{}{}", self.source.base_url, self.source.endpoints.everything);
        let response = self
            .client
            .post(&url)
            .basic_auth(username, Some(password))
            .json(&Self::payload(query, *page_size))
            .send()
            .await?;
        let body: OxylabsResponse = check_status(&self.source.id, response)?.json().await?;

        Ok(body
            .into_news()
            .into_iter()
            .map(|r| normalize::normalize(&RawArticle::Oxylabs(r), &self.source.name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_requests_news_vertical() {
        let payload = OxylabsProvider::payload("elections", 5);
        assert_eq!(payload["source"], "google_search");
        assert_eq!(payload["context"][0]["value"], "nws");
        assert_eq!(payload["query"], "elections");
    }

    #[test]
    fn test_news_results_are_extracted() {
        let body: OxylabsResponse = serde_json::from_value(json!({
            "results": [{
                "content": {
                    "news_results": [
                        {"title": "One", "url": "https://a.example/1", "desc": "first", "source": "A"},
                        {"title": "Two", "url": "https://a.example/2"}
                    ]
                }
            }]
        }))
        .unwrap();
        let news = body.into_news();
        assert_eq!(news.len(), 2);
        assert_eq!(news[0].snippet.as_deref(), Some("first"));
    }

    #[test]
    fn test_empty_response_yields_nothing() {
        let body: OxylabsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(body.into_news().is_empty());
    }
}
