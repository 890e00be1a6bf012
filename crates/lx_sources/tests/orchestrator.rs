use async_trait::async_trait;
use lx_core::config::{self, FetchPolicy};
use lx_core::{Article, Category, Config, Error, Result};
use lx_sources::normalize::{normalize, NewsApiArticle, RawArticle};
use lx_sources::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Copy)]
enum Behavior {
    Articles(usize),
    Empty,
    Status(u16),
    Hang,
}

struct MockProvider {
    id: &'static str,
    kinds: Vec<RequestKind>,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockProvider {
    fn new(id: &'static str, kinds: &[RequestKind], behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            id,
            kinds: kinds.to_vec(),
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NewsProvider for MockProvider {
    fn id(&self) -> &str {
        self.id
    }

    fn name(&self) -> &str {
        self.id
    }

    fn supports(&self, kind: RequestKind) -> bool {
        self.kinds.contains(&kind)
    }

    async fn fetch(&self, _request: &NewsRequest) -> Result<Vec<Article>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Articles(n) => Ok((0..n)
                .map(|i| {
                    let raw = NewsApiArticle {
                        title: Some(format!("{} story {}", self.id, i)),
                        url: Some(format!("https://{}.example.com/story/{}", self.id, i)),
                        ..Default::default()
                    };
                    normalize(&RawArticle::NewsApi(raw), self.id)
                })
                .collect()),
            Behavior::Empty => Ok(Vec::new()),
            Behavior::Status(status) => Err(Error::Upstream {
                source_id: self.id.to_string(),
                status,
            }),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Vec::new())
            }
        }
    }
}

const HEADLINES: &[RequestKind] = &[RequestKind::TopHeadlines, RequestKind::Search];
const SEARCH_ONLY: &[RequestKind] = &[RequestKind::Search];
const TOPIC_ONLY: &[RequestKind] = &[RequestKind::Topic];

fn test_config(cache_ttl: Duration) -> Config {
    let mut config = Config::default();
    for source in &mut config.sources {
        source.api_key = Some("test-key".to_string());
        source.username = Some("test-user".to_string());
        source.rate_limit.min_request_interval = Duration::ZERO;
        source.rate_limit.max_request_interval = Duration::ZERO;
    }
    config.cache_ttl = cache_ttl;
    config.fetch = FetchPolicy {
        max_retries: 1,
        request_timeout: Duration::from_millis(50),
        retry_base_delay: Duration::from_millis(1),
    };
    config
}

fn manager(config: &Config, providers: &[Arc<MockProvider>]) -> FetchManager {
    let providers: Vec<Arc<dyn NewsProvider>> = providers.iter().map(|p| p.clone() as Arc<dyn NewsProvider>).collect();
    FetchManager::new(config, providers)
}

#[tokio::test]
async fn test_headlines_never_empty_when_every_source_fails() {
    let config = test_config(Duration::from_secs(60));
    let newsapi = MockProvider::new(config::NEWSAPI, HEADLINES, Behavior::Status(500));
    let newsdata = MockProvider::new(config::NEWSDATA, HEADLINES, Behavior::Hang);
    let manager = manager(&config, &[newsapi.clone(), newsdata.clone()]);

    let articles = manager.fetch_top_headlines(Some(Category::Science), "us", 7).await;
    assert_eq!(articles.len(), 7);
    assert!(articles.iter().all(|a| a.category == Category::Science));
    assert_eq!(newsapi.calls(), 1);
    // Timeouts are retried once
    assert_eq!(newsdata.calls(), 2);
}

#[tokio::test]
async fn test_second_identical_call_is_served_from_cache() {
    let config = test_config(Duration::from_secs(60));
    let newsapi = MockProvider::new(config::NEWSAPI, HEADLINES, Behavior::Articles(12));
    let manager = manager(&config, &[newsapi.clone()]);

    let first = manager.fetch_top_headlines(None, "us", 10).await;
    let second = manager.fetch_top_headlines(None, "us", 10).await;
    assert_eq!(first.len(), 10);
    assert_eq!(first, second);
    assert_eq!(newsapi.calls(), 1);
}

#[tokio::test]
async fn test_expired_cache_goes_back_upstream() {
    let config = test_config(Duration::from_millis(30));
    let newsapi = MockProvider::new(config::NEWSAPI, HEADLINES, Behavior::Articles(3));
    let manager = manager(&config, &[newsapi.clone()]);

    manager.fetch_top_headlines(None, "us", 3).await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    manager.fetch_top_headlines(None, "us", 3).await;
    assert_eq!(newsapi.calls(), 2);
}

#[tokio::test]
async fn test_quota_exceeded_disables_source_and_fails_over() {
    let config = test_config(Duration::from_secs(60));
    let newsapi = MockProvider::new(config::NEWSAPI, HEADLINES, Behavior::Status(426));
    let newsdata = MockProvider::new(config::NEWSDATA, HEADLINES, Behavior::Articles(8));
    let manager = manager(&config, &[newsapi.clone(), newsdata.clone()]);

    let articles = manager.fetch_top_headlines(Some(Category::Technology), "us", 5).await;
    assert_eq!(articles.len(), 5);
    assert!(articles.iter().all(|a| a.category == Category::Technology));
    assert!(articles.iter().all(|a| a.source == config::NEWSDATA));

    let stats = manager.usage_stats().await;
    let newsapi_stats = stats.iter().find(|s| s.id == config::NEWSAPI).unwrap();
    assert!(!newsapi_stats.active);

    // A different request no longer touches the disabled source
    manager.fetch_top_headlines(Some(Category::Health), "us", 5).await;
    assert_eq!(newsapi.calls(), 1);
    assert_eq!(newsdata.calls(), 2);
}

#[tokio::test]
async fn test_search_fallback_is_prefixed_with_query() {
    let config = test_config(Duration::from_secs(60));
    let oxylabs = MockProvider::new(config::OXYLABS, SEARCH_ONLY, Behavior::Hang);
    let newsapi = MockProvider::new(config::NEWSAPI, HEADLINES, Behavior::Hang);
    let newsdata = MockProvider::new(config::NEWSDATA, HEADLINES, Behavior::Status(503));
    let manager = manager(&config, &[oxylabs, newsapi, newsdata]);

    let articles = manager.search_articles("bitcoin", 10).await;
    assert_eq!(articles.len(), 10);
    assert!(articles.iter().all(|a| a.title.starts_with("bitcoin - ")));
}

#[tokio::test]
async fn test_search_tries_search_engine_first() {
    let config = test_config(Duration::from_secs(60));
    let oxylabs = MockProvider::new(config::OXYLABS, SEARCH_ONLY, Behavior::Empty);
    let newsapi = MockProvider::new(config::NEWSAPI, HEADLINES, Behavior::Articles(4));
    let newsdata = MockProvider::new(config::NEWSDATA, HEADLINES, Behavior::Articles(4));
    let manager = manager(&config, &[oxylabs.clone(), newsapi.clone(), newsdata.clone()]);

    let articles = manager.search_articles("rust", 10).await;
    assert_eq!(articles.len(), 4);
    assert!(articles.iter().all(|a| a.source == config::NEWSAPI));
    assert_eq!(oxylabs.calls(), 1);
    assert_eq!(newsdata.calls(), 0);

    // Oxylabs never serves headlines
    manager.fetch_top_headlines(None, "us", 2).await;
    assert_eq!(oxylabs.calls(), 1);
}

#[tokio::test]
async fn test_clear_cache_forces_fresh_attempt() {
    let config = test_config(Duration::from_secs(60));
    let newsapi = MockProvider::new(config::NEWSAPI, HEADLINES, Behavior::Articles(2));
    let manager = manager(&config, &[newsapi.clone()]);

    manager.search_articles("climate", 5).await;
    manager.clear_cache().await;
    manager.search_articles("climate", 5).await;
    assert_eq!(newsapi.calls(), 2);
}

#[tokio::test]
async fn test_fallback_results_are_not_cached() {
    let config = test_config(Duration::from_secs(60));
    let newsapi = MockProvider::new(config::NEWSAPI, HEADLINES, Behavior::Empty);
    let manager = manager(&config, &[newsapi.clone()]);

    manager.fetch_top_headlines(None, "us", 3).await;
    manager.fetch_top_headlines(None, "us", 3).await;
    assert_eq!(newsapi.calls(), 2);
}

#[tokio::test]
async fn test_unconfigured_sources_are_skipped() {
    let mut config = test_config(Duration::from_secs(60));
    config.sources.iter_mut().for_each(|s| s.api_key = None);
    let newsapi = MockProvider::new(config::NEWSAPI, HEADLINES, Behavior::Articles(5));
    let manager = manager(&config, &[newsapi.clone()]);

    let articles = manager.fetch_top_headlines(None, "us", 4).await;
    assert_eq!(articles.len(), 4);
    assert!(articles.iter().all(|a| a.id.starts_with("fallback-")));
    assert_eq!(newsapi.calls(), 0);
}

#[tokio::test]
async fn test_topic_feed_and_fallback() {
    let config = test_config(Duration::from_secs(60));
    let google = MockProvider::new(config::GOOGLE_NEWS, TOPIC_ONLY, Behavior::Articles(15));
    let manager_ok = manager(&config, &[google.clone()]);
    assert_eq!(manager_ok.fetch_topic("world news").await.len(), 15);

    let failing = MockProvider::new(config::GOOGLE_NEWS, TOPIC_ONLY, Behavior::Status(500));
    let manager_failing = manager(&config, &[failing]);
    let fallback = manager_failing.fetch_topic("elections").await;
    assert_eq!(fallback.len(), 6);
    assert!(fallback.iter().all(|a| a.category.as_str() == "elections"));
}

#[tokio::test]
async fn test_successful_calls_are_counted() {
    let config = test_config(Duration::from_secs(60));
    let newsapi = MockProvider::new(config::NEWSAPI, HEADLINES, Behavior::Articles(2));
    let manager = manager(&config, &[newsapi]);

    manager.fetch_top_headlines(None, "us", 2).await;
    manager.fetch_top_headlines(None, "gb", 2).await;

    let stats = manager.usage_stats().await;
    let newsapi_stats = stats.iter().find(|s| s.id == config::NEWSAPI).unwrap();
    assert_eq!(newsapi_stats.remaining_calls, newsapi_stats.daily_limit - 2);
    let limiter = newsapi_stats.rate_limiter.as_ref().unwrap();
    assert_eq!(limiter.remaining_requests, 98);
}

#[tokio::test]
async fn test_limiter_state_is_written_to_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(Duration::from_secs(60));
    config.data_dir = Some(dir.path().to_path_buf());
    let newsapi = MockProvider::new(config::NEWSAPI, HEADLINES, Behavior::Articles(1));
    let manager = manager(&config, &[newsapi]);

    manager.fetch_top_headlines(None, "us", 1).await;
    assert!(dir.path().join("api-rate-limiter-newsapi.json").exists());
}
