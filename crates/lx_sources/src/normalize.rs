//! Maps the upstream article shapes onto the canonical [`Article`].

use chrono::{DateTime, NaiveDateTime, Utc};
use lx_core::{Article, Category};
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

pub const UNTITLED: &str = "Untitled Article";
const PLACEHOLDER_PATH: &str = "/placeholder.svg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    NewsApi,
    NewsData,
    Oxylabs,
    GoogleNewsRss,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewsApiSourceRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewsApiArticle {
    pub source: Option<NewsApiSourceRef>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "urlToImage")]
    pub url_to_image: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewsDataArticle {
    pub article_id: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "pubDate")]
    pub pub_date: Option<String>,
    pub image_url: Option<String>,
    pub source_id: Option<String>,
    pub category: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OxylabsNewsResult {
    pub title: Option<String>,
    pub url: Option<String>,
    #[serde(alias = "desc")]
    pub snippet: Option<String>,
    pub source: Option<String>,
    pub date: Option<String>,
    pub thumbnail: Option<String>,
}

/// An RSS `<item>`; `description` keeps its raw HTML.
#[derive(Debug, Clone, Default)]
pub struct RssItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub enum RawArticle {
    NewsApi(NewsApiArticle),
    NewsData(NewsDataArticle),
    Oxylabs(OxylabsNewsResult),
    Rss(RssItem),
}

impl RawArticle {
    pub fn kind(&self) -> SourceKind {
        match self {
            RawArticle::NewsApi(_) => SourceKind::NewsApi,
            RawArticle::NewsData(_) => SourceKind::NewsData,
            RawArticle::Oxylabs(_) => SourceKind::Oxylabs,
            RawArticle::Rss(_) => SourceKind::GoogleNewsRss,
        }
    }
}

/// Intermediate view shared by every upstream shape.
struct Fields {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    image: Option<String>,
    published: Option<DateTime<Utc>>,
    published_raw: Option<String>,
    source: Option<String>,
    category: Option<Category>,
}

/// Normalize one upstream item. The category is `general` unless the
/// upstream item carries its own; callers re-tag with the requested category.
pub fn normalize(raw: &RawArticle, source_name: &str) -> Article {
    let fields = match raw {
        RawArticle::NewsApi(a) => Fields {
            title: a.title.clone(),
            description: a.description.clone(),
            content: a.content.clone(),
            url: a.url.clone(),
            image: a.url_to_image.clone(),
            published: None,
            published_raw: a.published_at.clone(),
            source: a.source.as_ref().and_then(|s| s.name.clone()),
            category: None,
        },
        RawArticle::NewsData(a) => Fields {
            title: a.title.clone(),
            description: a.description.clone(),
            content: a.content.clone(),
            url: a.link.clone(),
            image: a.image_url.clone(),
            published: None,
            published_raw: a.pub_date.clone(),
            source: a.source_id.clone(),
            category: a
                .category
                .as_ref()
                .and_then(|c| c.first())
                .map(|c| category_from_upstream(c)),
        },
        RawArticle::Oxylabs(a) => Fields {
            title: a.title.clone(),
            description: a.snippet.clone(),
            content: a.snippet.clone(),
            url: a.url.clone(),
            image: a.thumbnail.clone(),
            published: None,
            published_raw: a.date.clone(),
            source: a.source.clone(),
            category: None,
        },
        RawArticle::Rss(item) => {
            let raw_title = item.title.clone().unwrap_or_default();
            let (title, publisher) = split_rss_title(&raw_title);
            let raw_description = item.description.clone().unwrap_or_default();
            Fields {
                title: Some(title),
                description: Some(strip_html(&raw_description)),
                content: item.description.clone(),
                url: item.link.clone(),
                image: None,
                published: item.published,
                published_raw: None,
                source: publisher,
                category: None,
            }
        }
    };

    build_article(fields, source_name)
}

fn build_article(fields: Fields, source_name: &str) -> Article {
    let title = non_blank(fields.title).unwrap_or_else(|| UNTITLED.to_string());
    let description = non_blank(fields.description).unwrap_or_default();
    let content = non_blank(fields.content)
        .map(|c| strip_truncation_marker(&c))
        .unwrap_or_else(|| description.clone());
    let url = non_blank(fields.url).unwrap_or_default();

    let image_url = match non_blank(fields.image) {
        Some(image) => optimized_image_url(&image, &title),
        None => extract_image_from_content(&content)
            .or_else(|| extract_image_from_content(&description))
            .map(|image| optimized_image_url(&image, &title))
            .unwrap_or_else(|| placeholder_image(&title)),
    };

    let published_at = fields
        .published
        .unwrap_or_else(|| parse_published_at(fields.published_raw.as_deref()));

    Article {
        id: article_id(&url),
        title,
        description,
        content,
        url,
        image_url,
        published_at,
        source: non_blank(fields.source).unwrap_or_else(|| source_name.to_string()),
        category: fields.category.unwrap_or_default(),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Stable id: the canonical URL when there is one, a random UUID otherwise.
pub fn article_id(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return uuid::Uuid::new_v4().to_string();
    }
    match Url::parse(trimmed) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}

pub fn placeholder_image(title: &str) -> String {
    let text: String = title.chars().take(20).collect();
    format!(
        "{}?height=400&width=600&text={}",
        PLACEHOLDER_PATH,
        urlencoding::encode(&text)
    )
}

pub fn is_placeholder(url: &str) -> bool {
    url.contains(PLACEHOLDER_PATH)
}

/// Keep usable image URLs, replace invalid ones with the placeholder.
pub fn optimized_image_url(url: &str, title: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return placeholder_image(title);
    }
    if is_placeholder(url) || url.starts_with('/') {
        return url.to_string();
    }
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => url.to_string(),
        _ => placeholder_image(title),
    }
}

fn bare_image_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(https?://[^\s"'<>]+\.(?:jpg|jpeg|png|gif|webp))"#).expect("valid image regex")
    })
}

fn truncation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\[\+\d+ chars\]\s*$").expect("valid truncation regex"))
}

/// First `<img src>` in an HTML fragment, else the first bare image URL.
pub fn extract_image_from_content(content: &str) -> Option<String> {
    if content.is_empty() {
        return None;
    }

    if content.contains("<img") {
        let fragment = Html::parse_fragment(content);
        if let Ok(selector) = Selector::parse("img[src]") {
            let src = fragment
                .select(&selector)
                .filter_map(|el| el.value().attr("src"))
                .map(str::trim)
                .find(|src| !src.is_empty());
            if let Some(src) = src {
                return Some(src.to_string());
            }
        }
    }

    bare_image_regex()
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Text content of an HTML fragment with entities decoded and whitespace collapsed.
pub fn strip_html(html: &str) -> String {
    if !html.contains('<') && !html.contains('&') {
        return html.trim().to_string();
    }
    let fragment = Html::parse_fragment(html);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn strip_truncation_marker(content: &str) -> String {
    truncation_regex().replace(content, "").trim_end().to_string()
}

/// RFC 3339, RFC 2822 or `YYYY-MM-DD HH:MM:SS` (UTC); anything else is "now".
pub fn parse_published_at(raw: Option<&str>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Utc::now();
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return naive.and_utc();
    }
    Utc::now()
}

/// Google News titles read "Headline - Publisher".
pub fn split_rss_title(title: &str) -> (String, Option<String>) {
    match title.rsplit_once(" - ") {
        Some((headline, publisher)) if !headline.trim().is_empty() && !publisher.trim().is_empty() => {
            (headline.trim().to_string(), Some(publisher.trim().to_string()))
        }
        _ => (title.trim().to_string(), None),
    }
}

const NEWSAPI_CATEGORIES: [&str; 7] = [
    "business",
    "entertainment",
    "general",
    "health",
    "science",
    "sports",
    "technology",
];

const NEWSDATA_CATEGORIES: [&str; 11] = [
    "business",
    "entertainment",
    "environment",
    "food",
    "health",
    "politics",
    "science",
    "sports",
    "technology",
    "top",
    "world",
];

/// Category parameter to send upstream, `None` when the parameter must be omitted.
pub fn category_for_upstream(category: &Category, kind: SourceKind) -> Option<String> {
    let name = category.as_str().to_lowercase();
    match kind {
        SourceKind::NewsApi => NEWSAPI_CATEGORIES.contains(&name.as_str()).then_some(name),
        SourceKind::NewsData => {
            if name == "general" {
                Some("top".to_string())
            } else if NEWSDATA_CATEGORIES.contains(&name.as_str()) {
                Some(name)
            } else {
                Some("top".to_string())
            }
        }
        SourceKind::Oxylabs | SourceKind::GoogleNewsRss => None,
    }
}

/// Upstream category bucket to the canonical taxonomy.
pub fn category_from_upstream(value: &str) -> Category {
    match value.trim().to_lowercase().as_str() {
        "top" | "world" | "general" => Category::General,
        "tech" => Category::Technology,
        "sport" => Category::Sports,
        other => Category::parse(other),
    }
}

/// Keep the first article for each id.
pub fn dedupe_by_id(articles: Vec<Article>) -> Vec<Article> {
    let mut seen = HashSet::new();
    articles.into_iter().filter(|a| seen.insert(a.id.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_get_defaults() {
        let started = Utc::now();
        let article = normalize(&RawArticle::NewsApi(NewsApiArticle::default()), "NewsAPI");
        assert_eq!(article.title, UNTITLED);
        assert!(is_placeholder(&article.image_url));
        assert!(article.published_at >= started);
        assert_eq!(article.source, "NewsAPI");
        assert_eq!(article.url, "");
        assert!(!article.id.is_empty());
    }

    #[test]
    fn test_newsapi_fields_are_mapped() {
        let raw: NewsApiArticle = serde_json::from_value(serde_json::json!({
            "source": {"id": null, "name": "The Verge"},
            "title": "Chips get faster",
            "description": "A short summary",
            "url": "https://example.com/chips#comments",
            "urlToImage": "https://cdn.example.com/chips.jpg",
            "publishedAt": "2024-03-01T10:00:00Z",
            "content": "Long body text [+1532 chars]"
        }))
        .unwrap();
        let article = normalize(&RawArticle::NewsApi(raw), "NewsAPI");
        assert_eq!(article.id, "https://example.com/chips");
        assert_eq!(article.source, "The Verge");
        assert_eq!(article.content, "Long body text");
        assert_eq!(article.image_url, "https://cdn.example.com/chips.jpg");
        assert_eq!(article.published_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }

    #[test]
    fn test_same_url_yields_same_id() {
        let a = NewsApiArticle {
            url: Some("https://example.com/story".into()),
            ..Default::default()
        };
        let b = NewsDataArticle {
            link: Some("https://example.com/story".into()),
            ..Default::default()
        };
        let first = normalize(&RawArticle::NewsApi(a), "NewsAPI");
        let second = normalize(&RawArticle::NewsData(b), "NewsData.io");
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_image_recovered_from_content() {
        let raw = NewsDataArticle {
            title: Some("Rover lands".into()),
            content: Some(r#"<p>Intro</p><img class="x" src="https://img.example.com/rover.png">"#.into()),
            ..Default::default()
        };
        let article = normalize(&RawArticle::NewsData(raw), "NewsData.io");
        assert_eq!(article.image_url, "https://img.example.com/rover.png");

        let bare = extract_image_from_content("see https://img.example.com/pic.JPEG for details");
        assert_eq!(bare.as_deref(), Some("https://img.example.com/pic.JPEG"));
        assert_eq!(extract_image_from_content("no images here"), None);
    }

    #[test]
    fn test_placeholder_encodes_truncated_title() {
        let url = placeholder_image("Markets rally & bonds slide today");
        assert_eq!(url, "/placeholder.svg?height=400&width=600&text=Markets%20rally%20%26%20bond");
    }

    #[test]
    fn test_invalid_image_urls_become_placeholder() {
        assert!(is_placeholder(&optimized_image_url("not a url", "t")));
        assert!(is_placeholder(&optimized_image_url("ftp://example.com/x.png", "t")));
        assert_eq!(optimized_image_url("/images/local.png", "t"), "/images/local.png");
    }

    #[test]
    fn test_rss_item_splits_title_and_strips_html() {
        let item = RssItem {
            title: Some("Storm hits coast - Weather Daily".into()),
            link: Some("https://news.google.com/articles/abc".into()),
            published: None,
            description: Some(r#"<a href="x">Storm &amp; floods</a><img src="https://img.example.com/s.gif">"#.into()),
        };
        let article = normalize(&RawArticle::Rss(item), "Google News");
        assert_eq!(article.title, "Storm hits coast");
        assert_eq!(article.source, "Weather Daily");
        assert_eq!(article.description, "Storm & floods");
        assert!(article.content.contains("<a href"));
        assert_eq!(article.image_url, "https://img.example.com/s.gif");
    }

    #[test]
    fn test_rss_title_without_publisher() {
        assert_eq!(split_rss_title("Just a headline"), ("Just a headline".to_string(), None));
        assert_eq!(
            split_rss_title("A - B - Publisher"),
            ("A - B".to_string(), Some("Publisher".to_string()))
        );
    }

    #[test]
    fn test_date_formats() {
        let rfc2822 = parse_published_at(Some("Tue, 05 Mar 2024 14:30:00 GMT"));
        assert_eq!(rfc2822.to_rfc3339(), "2024-03-05T14:30:00+00:00");
        let newsdata = parse_published_at(Some("2024-03-05 14:30:00"));
        assert_eq!(newsdata, rfc2822);
        let before = Utc::now();
        assert!(parse_published_at(Some("3 hours ago")) >= before);
    }

    #[test]
    fn test_category_mapping_round_trip() {
        assert_eq!(category_for_upstream(&Category::General, SourceKind::NewsData).as_deref(), Some("top"));
        assert_eq!(category_from_upstream("top"), Category::General);
        assert_eq!(category_for_upstream(&Category::Politics, SourceKind::NewsApi), None);
        assert_eq!(
            category_for_upstream(&Category::Technology, SourceKind::NewsApi).as_deref(),
            Some("technology")
        );
        assert_eq!(
            category_for_upstream(&Category::Custom("crypto".into()), SourceKind::NewsData).as_deref(),
            Some("top")
        );
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let mut a = normalize(&RawArticle::NewsApi(NewsApiArticle::default()), "x");
        a.id = "same".into();
        let mut b = a.clone();
        b.title = "second".into();
        let deduped = dedupe_by_id(vec![a.clone(), b]);
        assert_eq!(deduped, vec![a]);
    }
}
