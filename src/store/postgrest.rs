use super::{FOREIGN_KEY_VIOLATION, Store, StoreError};
use crate::record::{FlatRecord, Table};
use log::debug;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Supabase's REST interface (PostgREST) addressed with a project URL and an
/// API key.
#[derive(Debug, Clone)]
pub struct PostgrestStore {
    client: Client,
    rest_url: String,
    api_key: String,
    timeout: Duration,
}

/// Error body PostgREST sends with non-2xx answers.
#[derive(Debug, Deserialize, Default)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

impl PostgrestError {
    fn describe(&self, status: u16) -> String {
        let mut text = self.message.clone().unwrap_or_else(|| format!("HTTP {status}"));
        if let Some(details) = &self.details {
            text.push_str(&format!(" ({details})"));
        }
        text
    }
}

impl PostgrestStore {
    pub fn new(project_url: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            rest_url: format!("{}/rest/v1", project_url.trim_end_matches('/')),
            api_key: api_key.to_owned(),
            timeout,
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
    }

    async fn write(&self, record: &FlatRecord, merge: bool) -> Result<(), StoreError> {
        let table = record.table();
        let key = table.conflict_key();

        let (url, prefer) = if merge && !key.is_empty() {
            (
                format!("{}/{table}?on_conflict={}", self.rest_url, key.join(",")),
                "resolution=merge-duplicates,return=minimal",
            )
        } else {
            (format!("{}/{table}", self.rest_url), "return=minimal")
        };

        debug!("POST {url}");
        let response = self
            .authorized(self.client.post(&url))
            .header("Prefer", prefer)
            .json(&record.to_json())
            .send()
            .await
            .map_err(|e| StoreError::Request(e, url.clone()))?;

        check(table, response).await.map(|_| ())
    }
}

async fn check(table: Table, response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: PostgrestError = response.json().await.unwrap_or_default();
    let message = body.describe(status.as_u16());
    if body.code.as_deref() == Some(FOREIGN_KEY_VIOLATION) {
        Err(StoreError::ForeignKey { table, detail: message })
    } else {
        Err(StoreError::Rejected { table, message })
    }
}

impl Store for PostgrestStore {
    async fn upsert(&self, record: &FlatRecord) -> Result<(), StoreError> {
        self.write(record, true).await
    }

    async fn insert(&self, record: &FlatRecord) -> Result<(), StoreError> {
        self.write(record, false).await
    }

    async fn select_all(&self, table: Table) -> Result<Vec<Value>, StoreError> {
        let url = format!("{}/{table}?select=*", self.rest_url);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| StoreError::Request(e, url.clone()))?;

        check(table, response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Request(e, url))
    }
}
