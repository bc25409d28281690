use log::debug;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;

pub type ApiResult<T> = Result<T, ApiError>;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin GET-only HTTP client shared by every provider.
///
/// Every request carries the configured timeout; a hung upstream fails the
/// call instead of stalling the run.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error, String),
    Api(reqwest::Error, String),
    Parsing(reqwest::Error, String),
    NotFound(String),
    Other(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e, url) => write!(f, "Network error for {url}: {e}"),
            ApiError::Api(e, url) => write!(f, "API error for {url}: {e}"),
            ApiError::Parsing(e, url) => write!(f, "Parse error for {url}: {e}"),
            ApiError::NotFound(msg) => write!(f, "Not found: {msg}"),
            ApiError::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Network(e, _) | ApiError::Api(e, _) | ApiError::Parsing(e, _) => Some(e),
            ApiError::NotFound(_) | ApiError::Other(_) => None,
        }
    }
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("sportsdb-ingest/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` and return the body untouched.
    pub async fn get_text(&self, url: &str) -> ApiResult<String> {
        self.send(url, &HeaderMap::new())
            .await?
            .text()
            .await
            .map_err(|e| ApiError::Parsing(e, url.to_owned()))
    }

    /// Like [`HttpClient::get_text`], but a 404 answer yields `None`.
    pub async fn get_text_if_found(&self, url: &str) -> ApiResult<Option<String>> {
        match self.get_text(url).await {
            Err(ApiError::Api(e, _)) if e.status() == Some(StatusCode::NOT_FOUND) => {
                debug!("{url} not found");
                Ok(None)
            }
            other => other.map(Some),
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        self.get_json_with(url, &HeaderMap::new()).await
    }

    /// GET `url` with extra headers and decode the body as JSON.
    pub async fn get_json_with<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &HeaderMap,
    ) -> ApiResult<T> {
        self.send(url, headers)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ApiError::Parsing(e, url.to_owned()))
    }

    async fn send(&self, url: &str, headers: &HeaderMap) -> ApiResult<Response> {
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .headers(headers.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ApiError::Network(e, url.to_owned()))?;

        response
            .error_for_status()
            .map_err(|e| ApiError::Api(e, url.to_owned()))
    }
}

/// Append percent-encoded query parameters to `base`.
pub fn with_query(base: &str, params: &[(&str, &str)]) -> ApiResult<String> {
    Url::parse_with_params(base, params)
        .map(String::from)
        .map_err(|e| ApiError::Other(format!("invalid url {base}: {e}")))
}
