use chrono::{DateTime, Duration as ChronoDuration, Local, Utc};
use lx_core::config::{FetchPolicy, RateLimitConfig};
use lx_core::{Article, Category, Config, Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

use crate::cache::{CacheKey, ResponseCache};
use crate::fallback;
use crate::logging::Logger;
use crate::normalize::dedupe_by_id;
use crate::providers::{build_providers, NewsProvider, NewsRequest};
use crate::rate_limiter::{RateLimiterRegistry, RateLimiterState};

/// Usage bookkeeping for providers missing from `Config::sources`.
const DEFAULT_DAILY_LIMIT: u32 = 100;

#[derive(Debug, Clone)]
struct SourceUsage {
    name: String,
    active: bool,
    daily_limit: u32,
    remaining_calls: u32,
    reset_time: DateTime<Utc>,
}

impl SourceUsage {
    fn new(name: &str, active: bool, daily_limit: u32) -> Self {
        Self {
            name: name.to_string(),
            active,
            daily_limit,
            remaining_calls: daily_limit,
            reset_time: next_local_midnight(),
        }
    }

    fn reconcile(&mut self, now: DateTime<Utc>) {
        if now < self.reset_time {
            return;
        }
        self.remaining_calls = self.daily_limit;
        while self.reset_time <= now {
            self.reset_time += ChronoDuration::hours(24);
        }
    }
}

fn next_local_midnight() -> DateTime<Utc> {
    let now = Local::now();
    now.date_naive()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|dt| dt.and_local_timezone(Local).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc::now() + ChronoDuration::hours(24))
}

/// One row of `FetchManager::usage_stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceUsageSnapshot {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub daily_limit: u32,
    pub remaining_calls: u32,
    pub reset_time: DateTime<Utc>,
    pub rate_limiter: Option<RateLimiterState>,
}

/// Multi-source fetch with caching, per-source quotas, bounded retries and
/// a deterministic placeholder fallback. Content operations never fail.
pub struct FetchManager {
    providers: Vec<Arc<dyn NewsProvider>>,
    cache: ResponseCache<Vec<Article>>,
    limiters: RateLimiterRegistry,
    usage: Mutex<BTreeMap<String, SourceUsage>>,
    policy: FetchPolicy,
}

impl FetchManager {
    pub fn new(config: &Config, providers: Vec<Arc<dyn NewsProvider>>) -> Self {
        let mut limiters = RateLimiterRegistry::new(config.data_dir.clone());
        let mut usage = BTreeMap::new();

        for provider in &providers {
            let id = provider.id().to_string();
            let (active, daily_limit, rate_limit) = match config.source(&id) {
                Some(source) => (source.is_configured(), source.daily_limit, source.rate_limit.clone()),
                None => (
                    true,
                    DEFAULT_DAILY_LIMIT,
                    RateLimitConfig::new(DEFAULT_DAILY_LIMIT, 0, 0),
                ),
            };
            if !active {
                debug!("{} has no credentials, marking inactive", provider.name());
            }
            limiters.register(&id, rate_limit);
            usage.insert(id, SourceUsage::new(provider.name(), active, daily_limit));
        }

        Self {
            providers,
            cache: ResponseCache::new(config.cache_ttl),
            limiters,
            usage: Mutex::new(usage),
            policy: config.fetch.clone(),
        }
    }

    /// Builds the HTTP client and the built-in providers from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("luxora/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let providers = build_providers(config, client);
        info!("📡 Fetch manager ready with {} providers", providers.len());
        Ok(Self::new(config, providers))
    }

    pub async fn fetch_top_headlines(&self, category: Option<Category>, country: &str, page_size: usize) -> Vec<Article> {
        let key = CacheKey::headlines(category.as_ref(), country, page_size);
        if let Some(hit) = self.cache.get(&key).await {
            return hit;
        }

        let category = category.unwrap_or_default();
        let request = NewsRequest::TopHeadlines {
            category: Some(category.clone()),
            country: country.to_string(),
            page_size,
        };

        match self.run(&request).await {
            Some(articles) => {
                let mut articles = finish(articles, Some(page_size));
                for article in &mut articles {
                    article.category = category.clone();
                }
                self.cache.put(key, articles.clone()).await;
                articles
            }
            None => {
                info!("Using fallback headlines for {}", category);
                fallback::headlines(&category, page_size)
            }
        }
    }

    pub async fn search_articles(&self, query: &str, page_size: usize) -> Vec<Article> {
        let key = CacheKey::search(query, page_size);
        if let Some(hit) = self.cache.get(&key).await {
            return hit;
        }

        let request = NewsRequest::Search {
            query: query.trim().to_string(),
            page_size,
        };

        match self.run(&request).await {
            Some(articles) => {
                let articles = finish(articles, Some(page_size));
                self.cache.put(key, articles.clone()).await;
                articles
            }
            None => {
                info!("Using fallback search results for \"{}\"", query);
                fallback::search(query, page_size)
            }
        }
    }

    pub async fn fetch_topic(&self, topic: &str) -> Vec<Article> {
        let key = CacheKey::topic(topic);
        if let Some(hit) = self.cache.get(&key).await {
            return hit;
        }

        let request = NewsRequest::Topic {
            topic: topic.trim().to_string(),
        };

        match self.run(&request).await {
            Some(articles) => {
                let articles = finish(articles, None);
                self.cache.put(key, articles.clone()).await;
                articles
            }
            None => {
                info!("Using fallback articles for topic \"{}\"", topic);
                fallback::topic(topic)
            }
        }
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        info!("🧹 Response cache cleared");
    }

    pub async fn usage_stats(&self) -> Vec<SourceUsageSnapshot> {
        let now = Utc::now();
        let mut usage = self.usage.lock().await;
        let mut out = Vec::with_capacity(usage.len());
        for (id, entry) in usage.iter_mut() {
            entry.reconcile(now);
            let rate_limiter = match self.limiters.get(id) {
                Some(limiter) => Some(limiter.state().await),
                None => None,
            };
            out.push(SourceUsageSnapshot {
                id: id.clone(),
                name: entry.name.clone(),
                active: entry.active,
                daily_limit: entry.daily_limit,
                remaining_calls: entry.remaining_calls,
                reset_time: entry.reset_time,
                rate_limiter,
            });
        }
        out
    }

    /// Tries each capable provider in order and returns the first non-empty
    /// result, or `None` when every source failed.
    async fn run(&self, request: &NewsRequest) -> Option<Vec<Article>> {
        for provider in self.providers.iter().filter(|p| p.supports(request.kind())) {
            let id = provider.id();
            let log = Logger::for_source(id);

            if !self.is_available(id).await {
                log.debug("skipped, inactive or out of daily calls");
                continue;
            }

            if let Some(limiter) = self.limiters.get(id) {
                if !limiter.acquire_permission().await {
                    log.warn("rate limit reached, trying next source");
                    continue;
                }
            }

            match self.call_with_retry(provider.as_ref(), request, &log).await {
                Ok(articles) if !articles.is_empty() => {
                    self.record_success(id).await;
                    log.info(&format!("returned {} articles", articles.len()));
                    return Some(articles);
                }
                Ok(_) => log.info("returned no articles, trying next source"),
                Err(e) if e.is_quota_exceeded() => {
                    log.warn("quota exceeded (426), disabling source");
                    self.deactivate(id).await;
                }
                Err(e) => log.warn(&format!("failed: {}", e)),
            }
        }
        None
    }

    async fn call_with_retry(&self, provider: &dyn NewsProvider, request: &NewsRequest, log: &Logger) -> Result<Vec<Article>> {
        let mut attempt = 0;
        loop {
            let outcome = match timeout(self.policy.request_timeout, provider.fetch(request)).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout),
            };

            match outcome {
                Err(e) if e.is_transient() && attempt < self.policy.max_retries => {
                    let delay = backoff(self.policy.retry_base_delay, attempt);
                    log.debug(&format!("attempt {} failed ({}), retrying in {:?}", attempt + 1, e, delay));
                    sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn is_available(&self, id: &str) -> bool {
        let mut usage = self.usage.lock().await;
        match usage.get_mut(id) {
            Some(entry) => {
                entry.reconcile(Utc::now());
                entry.active && entry.remaining_calls > 0
            }
            None => true,
        }
    }

    async fn record_success(&self, id: &str) {
        if let Some(entry) = self.usage.lock().await.get_mut(id) {
            entry.remaining_calls = entry.remaining_calls.saturating_sub(1);
        }
    }

    async fn deactivate(&self, id: &str) {
        if let Some(entry) = self.usage.lock().await.get_mut(id) {
            entry.active = false;
        }
    }
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

fn finish(articles: Vec<Article>, limit: Option<usize>) -> Vec<Article> {
    let mut articles = dedupe_by_id(articles);
    if let Some(limit) = limit {
        articles.truncate(limit);
    }
    articles
}
