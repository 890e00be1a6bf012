use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub url: String,
    pub image_url: String,
    pub published_at: DateTime<Utc>,
    pub source: String,
    pub category: Category,
}

/// Canonical article taxonomy. Anything outside the fixed buckets is carried
/// as free text (search terms, RSS topics).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Business,
    Technology,
    Science,
    Health,
    Entertainment,
    Sports,
    Politics,
    General,
    Custom(String),
}

impl Category {
    pub const FIXED: [Category; 8] = [
        Category::Business,
        Category::Technology,
        Category::Science,
        Category::Health,
        Category::Entertainment,
        Category::Sports,
        Category::Politics,
        Category::General,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Category::Business => "business",
            Category::Technology => "technology",
            Category::Science => "science",
            Category::Health => "health",
            Category::Entertainment => "entertainment",
            Category::Sports => "sports",
            Category::Politics => "politics",
            Category::General => "general",
            Category::Custom(s) => s,
        }
    }

    pub fn parse(value: &str) -> Self {
        let normalized = value.trim().to_lowercase();
        Self::FIXED
            .iter()
            .find(|c| c.as_str() == normalized)
            .cloned()
            .unwrap_or(Category::Custom(value.trim().to_string()))
    }
}

impl Default for Category {
    fn default() -> Self {
        Self::General
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Category::parse(&value)
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Category::parse(value)
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedArticle {
    pub article: Article,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub user: AuthUser,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Pushed to `IdentityService::subscribe` listeners on sign-in and sign-out.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(AuthUser),
    SignedOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!(Category::parse("Technology"), Category::Technology);
        assert_eq!(Category::parse(" sports "), Category::Sports);
        assert_eq!(Category::parse("bitcoin"), Category::Custom("bitcoin".into()));
    }

    #[test]
    fn test_article_serializes_camel_case() {
        let article = Article {
            id: "https://example.com/a".into(),
            title: "Title".into(),
            description: String::new(),
            content: String::new(),
            url: "https://example.com/a".into(),
            image_url: "/placeholder.svg?height=400&width=600".into(),
            published_at: Utc::now(),
            source: "Example".into(),
            category: Category::Science,
        };
        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["imageUrl"], "/placeholder.svg?height=400&width=600");
        assert_eq!(json["category"], "science");
        assert!(json.get("publishedAt").is_some());

        let back: Article = serde_json::from_value(json).unwrap();
        assert_eq!(back, article);
    }
}
