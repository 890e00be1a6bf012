use async_trait::async_trait;
use lx_core::config::BackendConfig;
use lx_core::{Error, Filter, Record, RecordStore, Result};
use serde_json::Value;
use tracing::debug;

/// PostgREST-style table access (`/rest/v1/<table>?col=eq.value`).
#[derive(Clone)]
pub struct RestRecordStore {
    base_url: String,
    anon_key: String,
    client: reqwest::Client,
}

impl RestRecordStore {
    pub fn new(config: &BackendConfig, client: reqwest::Client) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            client,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: reqwest::Method, table: &str, filters: &[Filter]) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .query(&filter_params(filters))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    async fn send(&self, table: &str, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            debug!("{} request failed with {}: {}", table, status, body);
            Err(Error::Storage(format!("{} responded with status {}", table, status.as_u16())))
        }
    }
}

pub(crate) fn filter_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

pub(crate) fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|f| (f.column.clone(), format!("eq.{}", filter_value(&f.value))))
        .collect()
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn select(&self, table: &str, filters: &[Filter]) -> Result<Vec<Record>> {
        let builder = self
            .request(reqwest::Method::GET, table, filters)
            .query(&[("select", "*")]);
        let response = self.send(table, builder).await?;
        Ok(response.json().await?)
    }

    async fn insert(&self, table: &str, record: Record) -> Result<()> {
        let builder = self
            .request(reqwest::Method::POST, table, &[])
            .header("Prefer", "return=minimal")
            .json(&vec![record]);
        self.send(table, builder).await?;
        Ok(())
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Record) -> Result<u64> {
        let builder = self
            .request(reqwest::Method::PATCH, table, filters)
            .header("Prefer", "return=representation")
            .json(&patch);
        let rows: Vec<Record> = self.send(table, builder).await?.json().await?;
        Ok(rows.len() as u64)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<u64> {
        let builder = self
            .request(reqwest::Method::DELETE, table, filters)
            .header("Prefer", "return=representation");
        let rows: Vec<Record> = self.send(table, builder).await?.json().await?;
        Ok(rows.len() as u64)
    }
}
