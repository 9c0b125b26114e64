use crate::domain::model::SaleRecord;
use crate::domain::ports::{Filter, SalesTable, SelectQuery};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;

/// Client for a PostgREST-style table API (Supabase and friends). Each
/// request carries the `apikey` header plus the same key as a bearer token.
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Preflight used for the fatal connection check before any writes: a
    /// cheap authenticated GET against the API root.
    pub async fn connect(&self) -> Result<()> {
        let response = self
            .authed(self.client.get(format!("{}/rest/v1/", self.base_url)))
            .send()
            .await?;
        response.error_for_status()?;
        tracing::debug!("Connected to destination at {}", self.base_url);
        Ok(())
    }

    fn apply_query(req: reqwest::RequestBuilder, query: &SelectQuery) -> reqwest::RequestBuilder {
        let mut pairs: Vec<(String, String)> =
            query.filters.iter().map(|f| f.to_query_pair()).collect();
        if let Some((column, descending)) = &query.order {
            let direction = if *descending { "desc" } else { "asc" };
            pairs.push(("order".to_string(), format!("{}.{}", column, direction)));
        }
        if let Some(limit) = query.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        req.query(&pairs)
    }
}

#[async_trait]
impl SalesTable for PostgrestClient {
    async fn insert(&self, table: &str, records: &[SaleRecord]) -> Result<()> {
        let response = self
            .authed(self.client.post(self.table_url(table)))
            .header("Prefer", "return=minimal")
            .json(records)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(EtlError::Write(format!("{}: {}", status, body)))
        }
    }

    async fn select(&self, table: &str, query: SelectQuery) -> Result<Vec<SaleRecord>> {
        let request = Self::apply_query(
            self.authed(self.client.get(self.table_url(table))),
            &query,
        );
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EtlError::Verify(format!("{}: {}", status, body)));
        }

        let records: Vec<SaleRecord> = response.json().await?;
        Ok(records)
    }

    async fn update(
        &self,
        table: &str,
        filter: Filter,
        changes: &HashMap<String, serde_json::Value>,
    ) -> Result<()> {
        let (key, value) = filter.to_query_pair();
        let response = self
            .authed(self.client.patch(self.table_url(table)))
            .query(&[(key, value)])
            .header("Prefer", "return=minimal")
            .json(changes)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(EtlError::Write(format!("{}: {}", status, body)))
        }
    }

    async fn delete(&self, table: &str, filter: Filter) -> Result<()> {
        let (key, value) = filter.to_query_pair();
        let response = self
            .authed(self.client.delete(self.table_url(table)))
            .query(&[(key, value)])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(EtlError::Write(format!("{}: {}", status, body)))
        }
    }

    async fn count(&self, table: &str) -> Result<u64> {
        // PostgREST reports the exact total in the Content-Range header.
        let response = self
            .authed(self.client.get(self.table_url(table)))
            .query(&[("select", "*"), ("limit", "1")])
            .header("Prefer", "count=exact")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EtlError::Verify(format!("{}: {}", status, body)));
        }

        let total = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit('/').next())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| {
                EtlError::Verify("Missing or malformed Content-Range header".to_string())
            })?;

        Ok(total)
    }
}
