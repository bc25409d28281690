use anyhow::{Context, Result, anyhow, bail};
use sportsdb_api::apisports::AMERICAN_FOOTBALL_HOST;
use sportsdb_api::client::DEFAULT_TIMEOUT;
use sportsdb_api::espn::{ESPN_CORE_V2, EspnLeague};
use sportsdb_api::places::MAPS_API;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_ESPN_LEAGUES: &str = "football/nfl,basketball/nba,baseball/mlb";

/// Half-open range of season years, `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub const fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..self.end).contains(&year)
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start..self.end
    }
}

impl FromStr for YearRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s
            .split_once("..")
            .ok_or_else(|| anyhow!("year range must look like 2021..2024, got {s:?}"))?;
        let start: i32 = start.trim().parse().with_context(|| format!("bad start year in {s:?}"))?;
        let end: i32 = end.trim().parse().with_context(|| format!("bad end year in {s:?}"))?;
        if end <= start {
            bail!("year range {s:?} is empty");
        }
        Ok(Self { start, end })
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Postgrest,
    Postgres,
    Memory,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgrest" | "supabase" => Ok(BackendKind::Postgrest),
            "postgres" | "pg" => Ok(BackendKind::Postgres),
            "memory" => Ok(BackendKind::Memory),
            other => bail!("unknown INGEST_BACKEND {other:?} (expected postgrest, postgres or memory)"),
        }
    }
}

/// Connection parameters for a direct Postgres connection.
#[derive(Debug, Clone)]
pub struct PgSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendKind,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub postgres: Option<PgSettings>,
    pub api_key: Option<String>,
    pub apisports_host: String,
    pub apisports_base_url: Option<String>,
    pub espn_base_url: String,
    pub espn_leagues: Vec<EspnLeague>,
    pub maps_api_key: Option<String>,
    pub maps_base_url: String,
    pub timeout: Duration,
    /// Overrides each ingester's default season window.
    pub years: Option<YearRange>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any variable source; blank values count as unset.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| get(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let timeout = match var("INGEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse()
                    .context("INGEST_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            None => DEFAULT_TIMEOUT,
        };

        let postgres = match (var("DB_HOST"), var("DB_USER"), var("DB_NAME")) {
            (Some(host), Some(user), Some(database)) => Some(PgSettings {
                host,
                port: var("DB_PORT")
                    .map(|p| p.parse().context("DB_PORT must be a valid u16 integer"))
                    .transpose()?
                    .unwrap_or(5432),
                user,
                password: var("DB_PASSWORD").unwrap_or_default(),
                database,
                timeout,
            }),
            _ => None,
        };

        let espn_leagues = var("ESPN_LEAGUES")
            .unwrap_or_else(|| DEFAULT_ESPN_LEAGUES.to_owned())
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<EspnLeague>().map_err(anyhow::Error::from))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            backend: var("INGEST_BACKEND")
                .map(|b| b.parse())
                .transpose()?
                .unwrap_or(BackendKind::Postgrest),
            supabase_url: var("SUPABASE_URL"),
            supabase_key: var("SUPABASE_KEY"),
            postgres,
            api_key: var("API_KEY"),
            apisports_host: var("APISPORTS_HOST").unwrap_or_else(|| AMERICAN_FOOTBALL_HOST.to_owned()),
            apisports_base_url: var("APISPORTS_BASE_URL"),
            espn_base_url: var("ESPN_BASE_URL").unwrap_or_else(|| ESPN_CORE_V2.to_owned()),
            espn_leagues,
            maps_api_key: var("MAPS_API_KEY").or_else(|| var("REACT_APP_GOOGLE_MAPS_API_KEY")),
            maps_base_url: var("MAPS_BASE_URL").unwrap_or_else(|| MAPS_API.to_owned()),
            timeout,
            years: var("INGEST_YEARS").map(|y| y.parse()).transpose()?,
        })
    }

    pub fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().context("API_KEY must be set for api-sports requests")
    }

    pub fn maps_api_key(&self) -> Result<&str> {
        self.maps_api_key
            .as_deref()
            .context("MAPS_API_KEY must be set for venue search")
    }

    pub fn supabase(&self) -> Result<(&str, &str)> {
        let url = self.supabase_url.as_deref().context("SUPABASE_URL must be set")?;
        let key = self.supabase_key.as_deref().context("SUPABASE_KEY must be set")?;
        Ok((url, key))
    }

    pub fn postgres(&self) -> Result<&PgSettings> {
        self.postgres
            .as_ref()
            .context("DB_HOST, DB_USER and DB_NAME must be set for the postgres backend")
    }

    pub fn years_or(&self, default: YearRange) -> YearRange {
        self.years.unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn year_range_is_half_open() {
        let range: YearRange = "2021..2024".parse().unwrap();
        assert_eq!(range, YearRange::new(2021, 2024));
        assert!(range.contains(2021));
        assert!(range.contains(2023));
        assert!(!range.contains(2024));
        assert!(!range.contains(2019));
        assert_eq!(range.years().collect::<Vec<_>>(), vec![2021, 2022, 2023]);
        assert_eq!(range.to_string(), "2021..2024");
    }

    #[test]
    fn bad_year_ranges_are_rejected() {
        assert!("2021-2024".parse::<YearRange>().is_err());
        assert!("2024..2021".parse::<YearRange>().is_err());
        assert!("abc..2021".parse::<YearRange>().is_err());
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.backend, BackendKind::Postgrest);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.espn_leagues.len(), 3);
        assert_eq!(config.espn_leagues[0], EspnLeague::new("football", "nfl"));
        assert_eq!(config.apisports_host, AMERICAN_FOOTBALL_HOST);
        assert!(config.postgres.is_none());
        assert!(config.api_key().is_err());
        assert_eq!(config.years_or(YearRange::new(2021, 2024)), YearRange::new(2021, 2024));
    }

    #[test]
    fn env_values_override_defaults() {
        let config = config(&[
            ("INGEST_BACKEND", "postgres"),
            ("DB_HOST", "db.local"),
            ("DB_USER", "ingest"),
            ("DB_NAME", "sports"),
            ("DB_PORT", "6543"),
            ("INGEST_TIMEOUT_SECS", "3"),
            ("INGEST_YEARS", "2019..2020"),
            ("ESPN_LEAGUES", "hockey/nhl"),
            ("REACT_APP_GOOGLE_MAPS_API_KEY", "legacy"),
        ])
        .unwrap();

        assert_eq!(config.backend, BackendKind::Postgres);
        let pg = config.postgres().unwrap();
        assert_eq!((pg.host.as_str(), pg.port), ("db.local", 6543));
        assert_eq!(pg.password, "");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.years, Some(YearRange::new(2019, 2020)));
        assert_eq!(config.espn_leagues, vec![EspnLeague::new("hockey", "nhl")]);
        assert_eq!(config.maps_api_key().unwrap(), "legacy");
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config(&[("SUPABASE_URL", "  "), ("API_KEY", "")]).unwrap();
        assert!(config.supabase().is_err());
        assert!(config.api_key.is_none());
    }

    #[test]
    fn invalid_values_fail_loudly() {
        assert!(config(&[("INGEST_BACKEND", "sqlite")]).is_err());
        assert!(config(&[("DB_HOST", "h"), ("DB_USER", "u"), ("DB_NAME", "d"), ("DB_PORT", "x")]).is_err());
        assert!(config(&[("ESPN_LEAGUES", "nfl")]).is_err());
    }
}
