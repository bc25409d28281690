use super::fields::{APISPORTS_LEAGUE, APISPORTS_SEASON, APISPORTS_TEAM};
use super::{Pipeline, RunContext};
use crate::config::YearRange;
use crate::record::Table;
use crate::store::Store;
use anyhow::Result;
use log::{debug, info, warn};
use serde_json::{Value, json};
use sportsdb_api::apisports::ApiSports;

pub const DEFAULT_YEARS: YearRange = YearRange::new(2021, 2024);
pub const SPORT: &str = "American Football";

/// Ingest leagues, their seasons and, for seasons inside `years`, the teams
/// playing in them.
pub async fn run<S: Store>(
    api: &ApiSports,
    store: &S,
    years: YearRange,
    ctx: &mut RunContext,
) -> Result<()> {
    let pipeline = Pipeline::new(api.client(), store);
    let leagues = api.leagues().await?;
    info!("Fetched {} api-sports leagues, teams limited to {years}", leagues.len());

    for league in &leagues {
        let record = pipeline
            .flatten(Table::Leagues, league, APISPORTS_LEAGUE, &[("sport", json!(SPORT))])
            .await?;
        if !pipeline.submit(&record, ctx).await? {
            continue;
        }
        let name = record.get("name").cloned().unwrap_or(Value::Null);

        let Some(league_id) = league.pointer("/league/id").and_then(Value::as_i64) else {
            warn!("League {name} has no id, skipping its seasons");
            continue;
        };

        for season in league["seasons"].as_array().into_iter().flatten() {
            let record = pipeline
                .flatten(Table::Seasons, season, APISPORTS_SEASON, &[("league", name.clone())])
                .await?;
            pipeline.submit(&record, ctx).await?;

            let Some(year) = season["year"].as_i64().and_then(|y| i32::try_from(y).ok()) else {
                continue;
            };
            if !years.contains(year) {
                debug!("Season {year} of {name} is outside {years}");
                continue;
            }
            ingest_teams(api, &pipeline, league_id, year, &name, ctx).await?;
        }
    }

    Ok(())
}

async fn ingest_teams<S: Store>(
    api: &ApiSports,
    pipeline: &Pipeline<'_, S>,
    league_id: i64,
    year: i32,
    league: &Value,
    ctx: &mut RunContext,
) -> Result<()> {
    let teams = api.teams(league_id, year).await?;
    debug!("{league} {year}: {} teams", teams.len());

    let fixed = [("league", league.clone()), ("sport", json!(SPORT))];
    for team in &teams {
        let Some(name) = team["name"].as_str() else {
            warn!("Skipping unnamed team in {league} {year}: {team}");
            continue;
        };
        if !ctx.seen_teams.insert(name.to_owned()) {
            continue;
        }
        let record = pipeline.flatten(Table::Teams, team, APISPORTS_TEAM, &fixed).await?;
        pipeline.submit(&record, ctx).await?;
    }

    Ok(())
}
