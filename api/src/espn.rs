/// ESPN core API (`sports.core.api.espn.com/v2`): collection envelopes and
/// `$ref` resolution. Item bodies stay as raw JSON trees; columns are pulled
/// out of them by the extractor.
use crate::client::{ApiError, ApiResult, HttpClient};
use crate::reference_url;
use log::debug;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub const ESPN_CORE_V2: &str = "https://sports.core.api.espn.com/v2";

/// One page of an ESPN collection. Items are usually `$ref` links.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Collection {
    pub count: Option<u32>,
    #[serde(rename = "pageIndex")]
    pub page_index: Option<u32>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<u32>,
    #[serde(rename = "pageCount")]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub items: Vec<Value>,
}

/// A `sport/league` pair such as `football/nfl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EspnLeague {
    pub sport: String,
    pub league: String,
}

impl EspnLeague {
    pub fn new(sport: impl Into<String>, league: impl Into<String>) -> Self {
        Self { sport: sport.into(), league: league.into() }
    }
}

impl FromStr for EspnLeague {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((sport, league)) if !sport.is_empty() && !league.is_empty() => {
                Ok(Self::new(sport, league))
            }
            _ => Err(ApiError::Other(format!(
                "league must look like sport/league, got {s:?}"
            ))),
        }
    }
}

impl fmt::Display for EspnLeague {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.sport, self.league)
    }
}

/// ESPN core client scoped to one base URL.
#[derive(Debug, Clone)]
pub struct EspnCore {
    client: HttpClient,
    base_url: String,
}

impl EspnCore {
    pub fn new(client: HttpClient, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub fn league_url(&self, league: &EspnLeague) -> String {
        format!(
            "{}/sports/{}/leagues/{}",
            self.base_url, league.sport, league.league
        )
    }

    pub fn season_url(&self, league: &EspnLeague, year: i32) -> String {
        format!("{}/seasons/{year}", self.league_url(league))
    }

    pub async fn season(&self, league: &EspnLeague, year: i32) -> ApiResult<Value> {
        self.client.get_json(&self.season_url(league, year)).await
    }

    pub async fn season_teams(&self, league: &EspnLeague, year: i32) -> ApiResult<Vec<Value>> {
        self.collection(&format!("{}/teams", self.season_url(league, year)))
            .await
    }

    pub async fn teams(&self, league: &EspnLeague) -> ApiResult<Vec<Value>> {
        self.collection(&format!("{}/teams", self.league_url(league)))
            .await
    }

    pub async fn athletes(&self, league: &EspnLeague) -> ApiResult<Vec<Value>> {
        self.collection(&format!("{}/athletes", self.league_url(league)))
            .await
    }

    /// Fetch every page of a collection and return the raw items.
    ///
    /// The page count is taken from the first answer only; an empty page
    /// ends the walk early.
    pub async fn collection(&self, url: &str) -> ApiResult<Vec<Value>> {
        let first: Collection = self.client.get_json(url).await?;
        let page_count = first.page_count.unwrap_or(1);
        let mut items = first.items;

        for next in 2..=page_count {
            let page_url = page_url(url, next)?;
            debug!("fetching page {next}/{page_count} of {url}");
            let mut page: Collection = self.client.get_json(&page_url).await?;
            if page.items.is_empty() {
                break;
            }
            items.append(&mut page.items);
        }

        Ok(items)
    }

    /// Follow an item's `$ref` link, or return inline items unchanged.
    pub async fn resolve(&self, item: &Value) -> ApiResult<Value> {
        match reference_url(item) {
            Some(url) => self.client.get_json(url).await,
            None => Ok(item.clone()),
        }
    }
}

fn page_url(url: &str, page: u32) -> ApiResult<String> {
    let mut parsed =
        Url::parse(url).map_err(|e| ApiError::Other(format!("invalid url {url}: {e}")))?;
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("page", &page.to_string());
    Ok(parsed.into())
}
