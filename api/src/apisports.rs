/// api-sports.io providers (American football, hockey, ...). Every endpoint
/// answers with the same envelope; the interesting rows live in `response`.
use crate::client::{ApiError, ApiResult, HttpClient, with_query};
use log::warn;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::Value;

pub const AMERICAN_FOOTBALL_HOST: &str = "v1.american-football.api-sports.io";

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Envelope {
    pub results: Option<u32>,
    /// `[]` when fine, otherwise an object of `{ "kind": "message" }`.
    #[serde(default)]
    pub errors: Value,
    #[serde(default)]
    pub response: Vec<Value>,
}

impl Envelope {
    pub fn error_messages(&self) -> Vec<String> {
        match &self.errors {
            Value::Object(map) => map
                .iter()
                .map(|(kind, msg)| match msg {
                    Value::String(s) => format!("{kind}: {s}"),
                    other => format!("{kind}: {other}"),
                })
                .collect(),
            Value::Array(items) => items.iter().map(Value::to_string).collect(),
            _ => Vec::new(),
        }
    }
}

/// Authenticated client for one api-sports host.
#[derive(Debug, Clone)]
pub struct ApiSports {
    client: HttpClient,
    base_url: String,
    headers: HeaderMap,
}

impl ApiSports {
    /// `base_url` defaults to `https://{host}`.
    pub fn new(
        client: HttpClient,
        host: &str,
        api_key: &str,
        base_url: Option<&str>,
    ) -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("x-rapidapi-host", header_value(host)?);
        headers.insert("x-rapidapi-key", header_value(api_key)?);

        let base_url = base_url
            .map(|b| b.trim_end_matches('/').to_owned())
            .unwrap_or_else(|| format!("https://{host}"));

        Ok(Self { client, base_url, headers })
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub async fn leagues(&self) -> ApiResult<Vec<Value>> {
        self.get(&format!("{}/leagues", self.base_url)).await
    }

    pub async fn teams(&self, league_id: i64, season: i32) -> ApiResult<Vec<Value>> {
        let url = with_query(
            &format!("{}/teams", self.base_url),
            &[("league", &league_id.to_string()), ("season", &season.to_string())],
        )?;
        self.get(&url).await
    }

    async fn get(&self, url: &str) -> ApiResult<Vec<Value>> {
        let envelope: Envelope = self.client.get_json_with(url, &self.headers).await?;
        for message in envelope.error_messages() {
            warn!("api-sports reported an error for {url}: {message}");
        }
        Ok(envelope.response)
    }
}

fn header_value(raw: &str) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(raw).map_err(|e| ApiError::Other(format!("invalid header value: {e}")))
}
