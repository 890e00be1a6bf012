use async_trait::async_trait;
use lx_core::config::SourceConfig;
use lx_core::{Article, Result};
use serde::Deserialize;

use super::{check_status, require_key, NewsProvider, NewsRequest, RequestKind};
use crate::normalize::{self, category_for_upstream, NewsDataArticle, RawArticle, SourceKind};

/// Free-tier page size ceiling.
const MAX_PAGE_SIZE: usize = 10;

#[derive(Debug, Deserialize)]
struct NewsDataResponse {
    #[serde(default)]
    results: Vec<NewsDataArticle>,
}

pub struct NewsDataProvider {
    source: SourceConfig,
    client: reqwest::Client,
}

impl NewsDataProvider {
    pub fn new(source: SourceConfig, client: reqwest::Client) -> Self {
        Self { source, client }
    }

    fn params_for(&self, request: &NewsRequest, api_key: &str) -> Option<Vec<(&'static str, String)>> {
        let mut params = vec![("apikey", api_key.to_string()), ("language", "en".to_string())];
        match request {
            NewsRequest::TopHeadlines {
                category,
                country,
                page_size,
            } => {
                params.push(("country", country.clone()));
                params.push(("size", (*page_size).min(MAX_PAGE_SIZE).to_string()));
                let category = category.clone().unwrap_or_default();
                if let Some(upstream) = category_for_upstream(&category, SourceKind::NewsData) {
                    params.push(("category", upstream));
                }
            }
            NewsRequest::Search { query, page_size } => {
                params.push(("q", query.clone()));
                params.push(("size", (*page_size).min(MAX_PAGE_SIZE).to_string()));
            }
            NewsRequest::Topic { .. } => return None,
        }
        Some(params)
    }
}

#[async_trait]
impl NewsProvider for NewsDataProvider {
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
        let Some(params) = self.params_for(request, api_key) else {
            return Ok(Vec::new());
        };

        let endpoint = match request.kind() {
            RequestKind::Search => &self.source.endpoints.everything,
            _ => &self.source.endpoints.top_headlines,
        };
        let url = format!("{}{}", self.source.base_url, endpoint);
        let response = self.client.get(&url).query(&params).send().await?;
        let body: NewsDataResponse = check_status(&self.source.id, response)?.json().await?;

        Ok(body
            .results
            .into_iter()
            .map(|a| normalize::normalize(&RawArticle::NewsData(a), &self.source.name))
            .collect())
    }
}
