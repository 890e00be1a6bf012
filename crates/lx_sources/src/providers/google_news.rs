use async_trait::async_trait;
use chrono::Utc;
use feed_rs::parser;
use lx_core::config::SourceConfig;
use lx_core::{Article, Category, Error, Result};

use super::{check_status, NewsProvider, NewsRequest, RequestKind};
use crate::normalize::{self, RawArticle, RssItem};

pub struct GoogleNewsProvider {
    source: SourceConfig,
    client: reqwest::Client,
}

impl GoogleNewsProvider {
    pub fn new(source: SourceConfig, client: reqwest::Client) -> Self {
        Self { source, client }
    }

    pub fn feed_url(&self, topic: &str) -> String {
        format!(
            "{}{}?q={}&hl=en-US&gl=US&ceid=US:en",
            self.source.base_url,
            self.source.endpoints.everything,
            urlencoding::encode(topic.trim())
        )
    }
}

/// Parses an RSS document into articles tagged with `topic`.
pub fn parse_feed(bytes: &[u8], topic: &str, source_name: &str) -> Result<Vec<Article>> {
    let feed = parser::parse(bytes).map_err(|e| Error::External(anyhow::anyhow!("invalid RSS feed: {}", e)))?;
    let category = Category::parse(topic);

    Ok(feed
        .entries
        .into_iter()
        .map(|entry| {
            let item = RssItem {
                title: entry.title.map(|t| t.content),
                link: entry.links.first().map(|l| l.href.clone()),
                published: entry.published.or(entry.updated).map(|d| d.with_timezone(&Utc)),
                description: entry.summary.map(|s| s.content),
            };
            let mut article = normalize::normalize(&RawArticle::Rss(item), source_name);
            article.category = category.clone();
            article
        })
        .collect())
}

#[async_trait]
impl NewsProvider for GoogleNewsProvider {
    fn id(&self) -> &str {
        &self.source.id
    }

    fn name(&self) -> &str {
        &self.source.name
    }

    fn supports(&self, kind: RequestKind) -> bool {
        kind == RequestKind::Topic
    }

    async fn fetch(&self, request: &NewsRequest) -> Result<Vec<Article>> {
        let NewsRequest::Topic { topic } = request else {
            return Ok(Vec::new());
        };
        let response = self.client.get(self.feed_url(topic)).send().await?;
        let bytes = check_status(&self.source.id, response)?.bytes().await?;
        parse_feed(&bytes, topic, &self.source.name)
    }
}
