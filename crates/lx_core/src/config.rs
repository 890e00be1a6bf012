use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const NEWSAPI: &str = "newsapi";
pub const NEWSDATA: &str = "newsdata";
pub const OXYLABS: &str = "oxylabs";
pub const GOOGLE_NEWS: &str = "google-news";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    pub max_requests_per_day: u32,
    pub reset_interval_hours: u32,
    pub min_request_interval: Duration,
    pub max_request_interval: Duration,
}

impl RateLimitConfig {
    pub fn new(max_requests_per_day: u32, min_ms: u64, max_ms: u64) -> Self {
        Self {
            max_requests_per_day,
            reset_interval_hours: 24,
            min_request_interval: Duration::from_millis(min_ms),
            max_request_interval: Duration::from_millis(max_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub top_headlines: String,
    pub everything: String,
}

/// One upstream content API, in priority order inside `Config::sources`.
#[derive(Clone, PartialEq)]
pub struct SourceConfig {
    pub id: String,
    pub name: String,
    pub base_url: String,
    pub endpoints: Endpoints,
    pub api_key: Option<String>,
    /// Basic-auth user for providers that authenticate with a user/password
    /// pair; `api_key` then holds the password.
    pub username: Option<String>,
    pub requires_key: bool,
    pub daily_limit: u32,
    pub rate_limit: RateLimitConfig,
}

impl SourceConfig {
    pub fn is_configured(&self) -> bool {
        !self.requires_key || self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }
}

impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("daily_limit", &self.daily_limit)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchPolicy {
    pub max_retries: u32,
    pub request_timeout: Duration,
    pub retry_base_delay: Duration,
}

impl FetchPolicy {
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self {
                max_retries: 1,
                request_timeout: Duration::from_secs(3),
                retry_base_delay: Duration::from_millis(500),
            },
            Environment::Development => Self {
                max_retries: 2,
                request_timeout: Duration::from_secs(8),
                retry_base_delay: Duration::from_millis(500),
            },
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct MediaConfig {
    pub api_key: Option<String>,
    pub photo_base_url: String,
    pub video_base_url: String,
    pub hourly_limit: u32,
    pub cache_ttl: Duration,
}

impl std::fmt::Debug for MediaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaConfig")
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("photo_base_url", &self.photo_base_url)
            .field("video_base_url", &self.video_base_url)
            .field("hourly_limit", &self.hourly_limit)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

#[derive(Clone, PartialEq)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub environment: Environment,
    pub data_dir: Option<PathBuf>,
    pub cache_ttl: Duration,
    pub fetch: FetchPolicy,
    pub sources: Vec<SourceConfig>,
    pub media: MediaConfig,
    pub backend: Option<BackendConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let environment = Environment::Development;
        Self {
            environment,
            data_dir: None,
            cache_ttl: Duration::from_secs(15 * 60),
            fetch: FetchPolicy::for_environment(environment),
            sources: default_sources(None, None, None, None),
            media: MediaConfig {
                api_key: None,
                photo_base_url: "https://api.pexels.com/v1".to_string(),
                video_base_url: "https://api.pexels.com/videos".to_string(),
                hourly_limit: 200,
                cache_ttl: Duration::from_secs(6 * 60 * 60),
            },
            backend: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let environment = match env::var("LUXORA_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        };

        let mut config = Self {
            environment,
            fetch: FetchPolicy::for_environment(environment),
            ..Self::default()
        };

        config.data_dir = non_empty_var("LUXORA_DATA_DIR").map(PathBuf::from);
        if let Some(secs) = non_empty_var("LUXORA_CACHE_TTL_SECS").and_then(|s| s.parse::<u64>().ok()) {
            config.cache_ttl = Duration::from_secs(secs);
        }

        config.sources = default_sources(
            non_empty_var("NEWS_API_KEY"),
            non_empty_var("NEWSDATA_API_KEY"),
            non_empty_var("OXYLABS_USERNAME"),
            non_empty_var("OXYLABS_PASSWORD"),
        );
        config.media.api_key = non_empty_var("PEXELS_API_KEY");

        config.backend = match (non_empty_var("SUPABASE_URL"), non_empty_var("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(BackendConfig {
                url: url.trim_end_matches('/').to_string(),
                anon_key,
            }),
            _ => None,
        };

        config
    }

    pub fn source(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn default_sources(
    news_api_key: Option<String>,
    newsdata_key: Option<String>,
    oxylabs_user: Option<String>,
    oxylabs_password: Option<String>,
) -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            id: NEWSAPI.to_string(),
            name: "NewsAPI".to_string(),
            base_url: "https://newsapi.org/v2".to_string(),
            endpoints: Endpoints {
                top_headlines: "/top-headlines".to_string(),
                everything: "/everything".to_string(),
            },
            api_key: news_api_key,
            username: None,
            requires_key: true,
            daily_limit: 100,
            rate_limit: RateLimitConfig::new(100, 1000, 10_000),
        },
        SourceConfig {
            id: NEWSDATA.to_string(),
            name: "NewsData.io".to_string(),
            base_url: "https://newsdata.io/api/1".to_string(),
            endpoints: Endpoints {
                top_headlines: "/news".to_string(),
                everything: "/news".to_string(),
            },
            api_key: newsdata_key,
            username: None,
            requires_key: true,
            daily_limit: 200,
            rate_limit: RateLimitConfig::new(200, 1000, 8000),
        },
        SourceConfig {
            id: OXYLABS.to_string(),
            name: "Oxylabs".to_string(),
            base_url: "https://realtime.oxylabs.io/v1".to_string(),
            endpoints: Endpoints {
                top_headlines: "/queries".to_string(),
                everything: "/queries".to_string(),
            },
            api_key: oxylabs_password,
            username: oxylabs_user,
            requires_key: true,
            daily_limit: 100,
            rate_limit: RateLimitConfig::new(100, 1000, 5000),
        },
        SourceConfig {
            id: GOOGLE_NEWS.to_string(),
            name: "Google News".to_string(),
            base_url: "https://news.google.com".to_string(),
            endpoints: Endpoints {
                top_headlines: "/rss".to_string(),
                everything: "/rss/search".to_string(),
            },
            api_key: None,
            username: None,
            requires_key: false,
            daily_limit: 500,
            rate_limit: RateLimitConfig::new(500, 500, 5000),
        },
    ]
}
