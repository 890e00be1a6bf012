use async_trait::async_trait;
use serde_json::{Map, Value};
use crate::Result;

pub type Record = Map<String, Value>;

/// Equality filter, the only predicate the record backend is asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.get(&self.column) == Some(&self.value)
    }
}

/// Per-user record storage of the backend-as-a-service. Used for profiles and
/// saved articles.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Rows matching every filter, oldest first
    async fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Record>>;

    async fn insert(&self, table: &str, record: Record) -> Result<()>;

    /// Merge `patch` into matching rows, returning how many changed
    async fn update(&self, table: &str, filters: &[Filter], patch: Record) -> Result<u64>;

    /// Delete matching rows, returning how many were removed
    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches_exact_value() {
        let record = json!({"user_id": "u1", "article_id": "a"});
        let record = record.as_object().unwrap();
        assert!(Filter::eq("user_id", "u1").matches(record));
        assert!(!Filter::eq("user_id", "u2").matches(record));
        assert!(!Filter::eq("missing", "u1").matches(record));
    }
}
