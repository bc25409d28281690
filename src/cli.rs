use crate::config::YearRange;
use crate::venues::DEFAULT_OUTPUT;
use anyhow::{Context, Result, bail};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Espn,
    ApiSports,
    Venues { address: String, out: PathBuf },
    Sample { player_name: String, player_sport: String },
    Check,
    Migrate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    /// Overrides `INGEST_YEARS` and the ingester defaults.
    pub years: Option<YearRange>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Run(Invocation),
    Help,
    Version,
}

pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Parsed> {
    let mut positional = Vec::new();
    let mut years = None;
    let mut dry_run = false;
    let mut out = None;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Parsed::Help),
            "-V" | "--version" => return Ok(Parsed::Version),
            "--dry-run" => dry_run = true,
            "--years" => {
                let raw = args.next().context("--years needs a value like 2021..2024")?;
                years = Some(raw.parse()?);
            }
            "--out" => out = Some(PathBuf::from(args.next().context("--out needs a path")?)),
            flag if flag.starts_with('-') => bail!("Unknown argument: {flag}"),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let Some(name) = positional.next() else {
        bail!("No command given");
    };
    let command = match name.as_str() {
        "espn" => Command::Espn,
        "apisports" => Command::ApiSports,
        "venues" => Command::Venues {
            address: positional.next().context("venues needs an address")?,
            out: out.take().unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
        },
        "sample" => Command::Sample {
            player_name: positional.next().context("sample needs a player name")?,
            player_sport: positional.next().context("sample needs a player sport")?,
        },
        "check" => Command::Check,
        "migrate" => Command::Migrate,
        other => bail!("Unknown command: {other}"),
    };

    if let Some(extra) = positional.next() {
        bail!("Unexpected argument: {extra}");
    }
    if out.is_some() {
        bail!("--out only applies to venues");
    }

    Ok(Parsed::Run(Invocation { command, years, dry_run }))
}

pub fn usage_text() -> &'static str {
    "sportsdb-ingest - load sports reference data into the sports database

Usage:
  sportsdb-ingest espn [--years 2020..2026] [--dry-run]
  sportsdb-ingest apisports [--years 2021..2024] [--dry-run]
  sportsdb-ingest venues <address> [--out local_sports_venues.json]
  sportsdb-ingest sample <player_name> <player_sport> [--dry-run]
  sportsdb-ingest check
  sportsdb-ingest migrate
  sportsdb-ingest --help
  sportsdb-ingest --version

Environment:
  INGEST_BACKEND        postgrest (default), postgres or memory
  SUPABASE_URL          Supabase project URL (postgrest backend)
  SUPABASE_KEY          Supabase API key (postgrest backend)
  DB_HOST, DB_PORT, DB_USER, DB_PASSWORD, DB_NAME
                        Direct connection settings (postgres backend)
  API_KEY               api-sports key
  APISPORTS_HOST        api-sports host (default v1.american-football.api-sports.io)
  ESPN_LEAGUES          Comma list of sport/league (default football/nfl,basketball/nba,baseball/mlb)
  MAPS_API_KEY          Google Maps key for venue search
  INGEST_YEARS          Season window start..end, end exclusive
  INGEST_TIMEOUT_SECS   Per-request timeout (default 10)
  RUST_LOG              Log filter (default info)"
}
