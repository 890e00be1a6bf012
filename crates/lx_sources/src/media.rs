//! Best-effort illustrative photo or video lookup for articles whose own
//! image is missing or broken.

use async_trait::async_trait;
use lx_core::config::MediaConfig;
use lx_core::{Category, Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::cache::{CacheKey, ResponseCache};
use crate::providers::check_status;

const MAX_TITLE_KEYWORDS: usize = 3;

const STOPWORDS: [&str; 31] = [
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is", "are", "was",
    "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "will", "would", "could", "should",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    pub kind: MediaKind,
    pub id: u64,
    pub url: String,
    pub preview_url: String,
    pub width: u32,
    pub height: u32,
    pub attribution: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaOptions {
    pub enabled: bool,
    pub prefer_video: bool,
    pub retry_count: u32,
    pub retry_delay: Duration,
}

impl Default for MediaOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            prefer_video: false,
            retry_count: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MediaOutcome {
    Disabled,
    Found(MediaAsset),
    NotFound,
    Failed { attempts: u32, error: String },
}

#[async_trait]
pub trait MediaProvider: Send + Sync {
    fn name(&self) -> &str;
    fn is_configured(&self) -> bool;
    /// First match for `query`, `None` when the provider has nothing.
    async fn search(&self, query: &str, kind: MediaKind) -> Result<Option<MediaAsset>>;
}

fn category_hint(category: &str) -> String {
    match Category::parse(category) {
        Category::Business => "business finance".to_string(),
        Category::Technology => "technology computer".to_string(),
        Category::Science => "science laboratory".to_string(),
        Category::Health => "health medical".to_string(),
        Category::Entertainment => "entertainment cinema".to_string(),
        Category::Sports => "sports stadium".to_string(),
        Category::Politics => "politics government".to_string(),
        Category::General => "news".to_string(),
        Category::Custom(other) => other.to_lowercase(),
    }
}

fn punctuation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid punctuation regex"))
}

/// Category hint words followed by up to three meaningful title words.
pub fn build_query(title: &str, category: &str) -> String {
    let lowered = title.to_lowercase();
    let cleaned = punctuation_regex().replace_all(&lowered, "");
    let keywords = cleaned
        .split_whitespace()
        .filter(|w| w.chars().count() > 2 && !STOPWORDS.contains(w))
        .take(MAX_TITLE_KEYWORDS);

    let mut parts: Vec<String> = Vec::new();
    let hint = category_hint(category);
    if !hint.is_empty() {
        parts.push(hint);
    }
    parts.extend(keywords.map(str::to_string));
    parts.join(" ")
}

/// Simple counter plus reset instant, separate from the news rate limiters.
#[derive(Debug)]
struct HourlyQuota {
    limit: u32,
    used: u32,
    reset_at: Instant,
}

impl HourlyQuota {
    fn new(limit: u32) -> Self {
        Self {
            limit,
            used: 0,
            reset_at: Instant::now() + Duration::from_secs(3600),
        }
    }

    fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        if now >= self.reset_at {
            self.used = 0;
            self.reset_at = now + Duration::from_secs(3600);
        }
        if self.used >= self.limit {
            return false;
        }
        self.used += 1;
        true
    }
}

pub struct MediaService {
    provider: Arc<dyn MediaProvider>,
    cache: ResponseCache<Option<MediaAsset>>,
    quota: Mutex<HourlyQuota>,
}

impl MediaService {
    pub fn new(provider: Arc<dyn MediaProvider>, cache_ttl: Duration, hourly_limit: u32) -> Self {
        Self {
            provider,
            cache: ResponseCache::new(cache_ttl),
            quota: Mutex::new(HourlyQuota::new(hourly_limit)),
        }
    }

    pub fn from_config(config: &MediaConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        let provider = Arc::new(PexelsProvider::new(config.clone(), client));
        Ok(Self::new(provider, config.cache_ttl, config.hourly_limit))
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    pub async fn resolve(&self, title: &str, category: &str, options: &MediaOptions) -> MediaOutcome {
        if !options.enabled {
            return MediaOutcome::Disabled;
        }

        let query = build_query(title, category);
        let key = CacheKey::media(&query, options.prefer_video);
        if let Some(cached) = self.cache.get(&key).await {
            return outcome_of(cached);
        }

        if !self.provider.is_configured() {
            return MediaOutcome::Failed {
                attempts: 0,
                error: Error::NotConfigured("Media provider").to_string(),
            };
        }

        let mut attempt = 0;
        loop {
            match self.lookup(&query, options.prefer_video).await {
                Ok(found) => {
                    self.cache.put(key, found.clone()).await;
                    return outcome_of(found);
                }
                Err(Error::RateLimited) => {
                    warn!("{} hourly limit reached", self.provider.name());
                    return MediaOutcome::Failed {
                        attempts: attempt + 1,
                        error: Error::RateLimited.to_string(),
                    };
                }
                Err(e) if attempt < options.retry_count => {
                    let delay = options.retry_delay.saturating_mul(2u32.saturating_pow(attempt));
                    debug!("Media lookup for \"{}\" failed ({}), retrying in {:?}", query, e, delay);
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!("Media lookup for \"{}\" failed after {} attempts: {}", query, attempt + 1, e);
                    self.cache.put(key, None).await;
                    return MediaOutcome::Failed {
                        attempts: attempt + 1,
                        error: e.to_string(),
                    };
                }
            }
        }
    }

    async fn lookup(&self, query: &str, prefer_video: bool) -> Result<Option<MediaAsset>> {
        let kinds: &[MediaKind] = if prefer_video {
            &[MediaKind::Video, MediaKind::Photo]
        } else {
            &[MediaKind::Photo]
        };

        for kind in kinds {
            if !self.quota.lock().await.try_acquire() {
                return Err(Error::RateLimited);
            }
            if let Some(asset) = self.provider.search(query, *kind).await? {
                return Ok(Some(asset));
            }
        }
        Ok(None)
    }
}

fn outcome_of(found: Option<MediaAsset>) -> MediaOutcome {
    match found {
        Some(asset) => MediaOutcome::Found(asset),
        None => MediaOutcome::NotFound,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PexelsPhotoSrc {
    original: String,
    large2x: String,
    large: String,
    medium: String,
}

#[derive(Debug, Deserialize)]
struct PexelsPhoto {
    id: u64,
    width: u32,
    height: u32,
    #[serde(default)]
    photographer: Option<String>,
    #[serde(default)]
    src: PexelsPhotoSrc,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PexelsVideoFile {
    quality: Option<String>,
    link: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PexelsUser {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PexelsVideo {
    id: u64,
    width: u32,
    height: u32,
    #[serde(default)]
    image: String,
    #[serde(default)]
    user: PexelsUser,
    #[serde(default)]
    video_files: Vec<PexelsVideoFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PexelsResponse {
    photos: Vec<PexelsPhoto>,
    videos: Vec<PexelsVideo>,
}

impl From<PexelsPhoto> for MediaAsset {
    fn from(photo: PexelsPhoto) -> Self {
        let src = photo.src;
        let url = [src.large2x, src.large, src.original]
            .into_iter()
            .find(|u| !u.is_empty())
            .unwrap_or_default();
        Self {
            kind: MediaKind::Photo,
            id: photo.id,
            preview_url: if src.medium.is_empty() { url.clone() } else { src.medium },
            url,
            width: photo.width,
            height: photo.height,
            attribution: photo.photographer,
        }
    }
}

impl From<PexelsVideo> for MediaAsset {
    fn from(video: PexelsVideo) -> Self {
        let url = video
            .video_files
            .iter()
            .find(|f| f.quality.as_deref() == Some("hd"))
            .or_else(|| video.video_files.first())
            .map(|f| f.link.clone())
            .unwrap_or_default();
        Self {
            kind: MediaKind::Video,
            id: video.id,
            url,
            preview_url: video.image,
            width: video.width,
            height: video.height,
            attribution: video.user.name,
        }
    }
}

/// Pexels photo and video search. The key is sent raw in `Authorization`.
pub struct PexelsProvider {
    config: MediaConfig,
    client: reqwest::Client,
}

impl PexelsProvider {
    pub fn new(config: MediaConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl MediaProvider for PexelsProvider {
    fn name(&self) -> &str {
        "Pexels"
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    async fn search(&self, query: &str, kind: MediaKind) -> Result<Option<MediaAsset>> {
        let api_key = self.config.api_key.as_deref().ok_or(Error::NotConfigured("Pexels"))?;
        let base = match kind {
            MediaKind::Photo => &self.config.photo_base_url,
            MediaKind::Video => &self.config.video_base_url,
        };

        let response = self
            .client
            .get(format!("{}/search", base))
            .header("Authorization", api_key)
            .query(&[("query", query), ("per_page", "1"), ("orientation", "landscape")])
            .send()
            .await?;
        let body: PexelsResponse = check_status("pexels", response)?.json().await?;

        Ok(match kind {
            MediaKind::Photo => body.photos.into_iter().next().map(MediaAsset::from),
            MediaKind::Video => body.videos.into_iter().next().map(MediaAsset::from),
        })
    }
}
