use async_trait::async_trait;
use lx_core::{Filter, Record, RecordStore, Result};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local tables, used for development and tests.
#[derive(Default)]
pub struct MemoryRecordStore {
    tables: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn row_count(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map(Vec::len).unwrap_or(0)
    }
}

fn matches_all(record: &Record, filters: &[Filter]) -> bool {
    filters.iter().all(|f| f.matches(record))
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Record>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| matches_all(r, filters)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, table: &str, mut record: Record) -> Result<()> {
        if !record.contains_key("id") {
            record.insert("id".to_string(), Value::String(uuid::Uuid::new_v4().to_string()));
        }
        self.tables.write().await.entry(table.to_string()).or_default().push(record);
        Ok(())
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Record) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| matches_all(r, filters)) {
                for (key, value) in &patch {
                    row.insert(key.clone(), value.clone());
                }
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !matches_all(r, filters));
        Ok((before - rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_crud_round() {
        let store = MemoryRecordStore::new();
        store.insert("profiles", record(json!({"email": "a@example.com", "username": "ann"}))).await.unwrap();
        store.insert("profiles", record(json!({"email": "b@example.com", "username": "bob"}))).await.unwrap();

        let ann = store.select("profiles", &[Filter::eq("username", "ann")]).await.unwrap();
        assert_eq!(ann.len(), 1);
        assert!(ann[0].contains_key("id"));

        let changed = store
            .update("profiles", &[Filter::eq("username", "bob")], record(json!({"avatar_url": "x.png"})))
            .await
            .unwrap();
        assert_eq!(changed, 1);

        assert_eq!(store.delete("profiles", &[Filter::eq("username", "nobody")]).await.unwrap(), 0);
        assert_eq!(store.delete("profiles", &[]).await.unwrap(), 2);
        assert_eq!(store.row_count("profiles").await, 0);
    }

    #[tokio::test]
    async fn test_unknown_table_is_empty() {
        let store = MemoryRecordStore::new();
        assert!(store.select("missing", &[]).await.unwrap().is_empty());
        assert_eq!(store.update("missing", &[], Record::new()).await.unwrap(), 0);
    }
}
