use async_trait::async_trait;
use lx_core::config::SourceConfig;
use lx_core::{Article, Result};
use serde::Deserialize;

use super::{check_status, require_key, NewsProvider, NewsRequest, RequestKind};
use crate::normalize::{self, category_for_upstream, NewsApiArticle, RawArticle, SourceKind};

/// NewsAPI caps `pageSize` at 100.
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

pub struct NewsApiProvider {
    source: SourceConfig,
    client: reqwest::Client,
}

impl NewsApiProvider {
    pub fn new(source: SourceConfig, client: reqwest::Client) -> Self {
        Self { source, client }
    }

    fn query_for(&self, request: &NewsRequest, api_key: &str) -> Option<(String, Vec<(&'static str, String)>)> {
        match request {
            NewsRequest::TopHeadlines {
                category,
                country,
                page_size,
            } => {
                let mut params = vec![
                    ("country", country.clone()),
                    ("pageSize", (*page_size).min(MAX_PAGE_SIZE).to_string()),
                    ("apiKey", api_key.to_string()),
                ];
                let category = category.clone().unwrap_or_default();
                if let Some(upstream) = category_for_upstream(&category, SourceKind::NewsApi) {
                    params.push(("category", upstream));
                }
                Some((self.source.endpoints.top_headlines.clone(), params))
            }
            NewsRequest::Search { query, page_size } => Some((
                self.source.endpoints.everything.clone(),
                vec![
                    ("q", query.clone()),
                    ("pageSize", (*page_size).min(MAX_PAGE_SIZE).to_string()),
                    ("sortBy", "publishedAt".to_string()),
                    ("apiKey", api_key.to_string()),
                ],
            )),
            NewsRequest::Topic { .. } => None,
        }
    }
}

#[async_trait]
impl NewsProvider for NewsApiProvider {
    fn id(&self) -> &str {
        &self.source.id
    }

    fn name(&self) -> &str {
        &self.source.name
    }

    fn supports(&self, kind: RequestKind) -> bool {
        matches!(kind, RequestKind::TopHeadlines | RequestKind::Search)
    }

    async fn fetch(&self, request: &NewsRequest) -> Result<Vec<Article>> {
        let api_key = require_key(&self.source)?;
        let Some((endpoint, params)) = self.query_for(request, api_key) else {
            return Ok(Vec::new());
        };

        let url = format!("{}{}", self.source.base_url, endpoint);
        let response = self.client.get(&url).query(&params).send().await?;
        let body: NewsApiResponse = check_status(&self.source.id, response)?.json().await?;

        Ok(body
            .articles
            .into_iter()
            .map(|a| normalize::normalize(&RawArticle::NewsApi(a), &self.source.name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lx_core::{config, Category, Config};

    fn provider() -> NewsApiProvider {
        let source = Config::default().source(config::NEWSAPI).cloned().unwrap();
        NewsApiProvider::new(source, reqwest::Client::new())
    }

    #[test]
    fn test_headline_params_skip_unsupported_category() {
        let request = NewsRequest::TopHeadlines {
            category: Some(Category::Politics),
            country: "us".into(),
            page_size: 10,
        };
        let (endpoint, params) = provider().query_for(&request, "k").unwrap();
        assert_eq!(endpoint, "/top-headlines");
        assert!(params.iter().all(|(name, _)| *name != "category"));
    }

    #[test]
    fn test_search_uses_everything_endpoint() {
        let request = NewsRequest::Search {
            query: "rust".into(),
            page_size: 500,
        };
        let (endpoint, params) = provider().query_for(&request, "k").unwrap();
        assert_eq!(endpoint, "/everything");
        assert!(params.contains(&("pageSize", "100".to_string())));
        assert!(params.contains(&("q", "rust".to_string())));
    }

    #[tokio::test]
    async fn test_fetch_without_key_fails_fast() {
        let request = NewsRequest::Search {
            query: "rust".into(),
            page_size: 5,
        };
        assert!(provider().fetch(&request).await.is_err());
    }
}
