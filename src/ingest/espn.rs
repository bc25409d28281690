use super::fields::{ESPN_DRAFT, ESPN_DRAFT_TEAM, ESPN_PLAYER, ESPN_SEASON, ESPN_TEAM, Format};
use super::{Pipeline, RunContext};
use crate::config::YearRange;
use crate::record::{FlatRecord, Table};
use crate::store::Store;
use anyhow::Result;
use log::{debug, info};
use serde_json::{Value, json};
use sportsdb_api::espn::{EspnCore, EspnLeague};
use sportsdb_api::extract::{extract, lookup};
use std::collections::BTreeMap;

pub const DEFAULT_YEARS: YearRange = YearRange::new(2020, 2026);

/// Team id → season years the team took part in.
type Memberships = BTreeMap<String, Vec<i32>>;

/// Ingest seasons, teams, players and drafts for each league from ESPN's
/// core API.
pub async fn run<S: Store>(
    core: &EspnCore,
    store: &S,
    leagues: &[EspnLeague],
    years: YearRange,
    ctx: &mut RunContext,
) -> Result<()> {
    let pipeline = Pipeline::new(core.client(), store);
    for league in leagues {
        info!("Ingesting {league} seasons {years}");
        let memberships = ingest_seasons(core, &pipeline, league, years, ctx).await?;
        ingest_teams(core, &pipeline, league, &memberships, ctx).await?;
        ingest_players(core, &pipeline, league, ctx).await?;
    }
    Ok(())
}

async fn ingest_seasons<S: Store>(
    core: &EspnCore,
    pipeline: &Pipeline<'_, S>,
    league: &EspnLeague,
    years: YearRange,
    ctx: &mut RunContext,
) -> Result<Memberships> {
    let mut memberships = Memberships::new();

    for year in years.years() {
        let season = core.season(league, year).await?;
        let record = pipeline
            .flatten(Table::Seasons, &season, ESPN_SEASON, &[("league", json!(league.league))])
            .await?;
        pipeline.submit(&record, ctx).await?;

        let items = core.season_teams(league, year).await?;
        debug!("{league} {year}: {} teams", items.len());
        for item in &items {
            let team = core.resolve(item).await?;
            if let Value::String(id) = Format::Text.apply(lookup(&team, "id", None)) {
                memberships.entry(id).or_default().push(year);
            }
        }
    }

    Ok(memberships)
}

async fn ingest_teams<S: Store>(
    core: &EspnCore,
    pipeline: &Pipeline<'_, S>,
    league: &EspnLeague,
    memberships: &Memberships,
    ctx: &mut RunContext,
) -> Result<()> {
    let items = core.teams(league).await?;
    info!("Fetched {} teams for {league}", items.len());

    let fixed = [("league", json!(league.league)), ("sport", json!(league.sport))];
    for item in &items {
        let team = core.resolve(item).await?;
        let record = pipeline.flatten(Table::Teams, &team, ESPN_TEAM, &fixed).await?;
        if !pipeline.submit(&record, ctx).await? {
            continue;
        }

        let Some(Value::String(id)) = record.get("id") else {
            continue;
        };
        for year in memberships.get(id).into_iter().flatten() {
            let mut membership = FlatRecord::new(Table::SeasonTeams);
            membership.set("teams_id", id.as_str())?;
            membership.set("league", league.league.as_str())?;
            membership.set("year", *year)?;
            pipeline.submit_relation(&membership, ctx).await?;
        }
    }

    Ok(())
}

async fn ingest_players<S: Store>(
    core: &EspnCore,
    pipeline: &Pipeline<'_, S>,
    league: &EspnLeague,
    ctx: &mut RunContext,
) -> Result<()> {
    let items = core.athletes(league).await?;
    info!("Fetched {} athletes for {league}", items.len());

    for item in &items {
        let player = core.resolve(item).await?;
        let record = pipeline
            .flatten(Table::Players, &player, ESPN_PLAYER, &[])
            .await?;
        if !pipeline.submit(&record, ctx).await? {
            continue;
        }

        let draft_team = extract(pipeline.client(), &player, &ESPN_DRAFT_TEAM).await?;
        let Some(team) = draft_team.decode() else {
            continue;
        };
        let team_id = Format::Text.apply(lookup(&team, "id", None));
        let player_id = record.get("id").cloned().unwrap_or(Value::Null);

        let draft = pipeline
            .flatten(
                Table::Drafts,
                &player,
                ESPN_DRAFT,
                &[
                    ("league", json!(league.league)),
                    ("teamid", team_id),
                    ("playerid", player_id),
                ],
            )
            .await?;
        pipeline.submit_relation(&draft, ctx).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use mockito::Server;
    use sportsdb_api::client::HttpClient;

    const NFL_PATH: &str = "/sports/football/leagues/nfl";

    fn nfl() -> EspnLeague {
        EspnLeague::new("football", "nfl")
    }

    fn refs(server: &Server, paths: &[&str]) -> String {
        let items: Vec<Value> = paths
            .iter()
            .map(|p| json!({"$ref": format!("{}{p}", server.url())}))
            .collect();
        json!({"count": items.len(), "pageIndex": 1, "pageCount": 1, "items": items}).to_string()
    }

    #[tokio::test]
    async fn three_referenced_teams_make_three_fetches_and_three_upserts() {
        let mut server = Server::new_async().await;
        let paths = ["/teams/1", "/teams/2", "/teams/3"];
        let listing = refs(&server, &paths);
        server
            .mock("GET", format!("{NFL_PATH}/teams").as_str())
            .with_body(listing)
            .expect(1)
            .create_async()
            .await;
        let mut detail_mocks = Vec::new();
        for (i, path) in paths.iter().enumerate() {
            let body = json!({"id": (i + 1).to_string(), "name": format!("Team {}", i + 1)});
            detail_mocks.push(
                server
                    .mock("GET", *path)
                    .with_body(body.to_string())
                    .expect(1)
                    .create_async()
                    .await,
            );
        }

        let core = EspnCore::new(HttpClient::default(), server.url());
        let store = MemoryStore::new();
        let pipeline = Pipeline::new(core.client(), &store);
        let mut ctx = RunContext::new();
        ingest_teams(&core, &pipeline, &nfl(), &Memberships::new(), &mut ctx)
            .await
            .unwrap();

        for mock in &detail_mocks {
            mock.assert_async().await;
        }
        assert_eq!(store.writes(Table::Teams), 3);
        for row in store.rows(Table::Teams) {
            assert_eq!(row.columns().count(), Table::Teams.columns().len());
            assert_eq!(row.get("league"), Some(&json!("nfl")));
            assert_eq!(row.get("coach"), Some(&Value::Null));
        }
    }

    #[tokio::test]
    async fn memberships_become_seasonteam_rows() {
        let mut server = Server::new_async().await;
        let listing = refs(&server, &["/teams/1"]);
        server
            .mock("GET", format!("{NFL_PATH}/teams").as_str())
            .with_body(listing)
            .create_async()
            .await;
        server
            .mock("GET", "/teams/1")
            .with_body(r#"{"id":"1","name":"Falcons"}"#)
            .create_async()
            .await;

        let core = EspnCore::new(HttpClient::default(), server.url());
        let store = MemoryStore::new();
        let pipeline = Pipeline::new(core.client(), &store);
        let mut ctx = RunContext::new();
        let memberships = Memberships::from([
            ("1".to_owned(), vec![2022, 2023]),
            ("404".to_owned(), vec![2022]),
        ]);
        ingest_teams(&core, &pipeline, &nfl(), &memberships, &mut ctx)
            .await
            .unwrap();

        let rows = store.rows(Table::SeasonTeams);
        let years: Vec<_> = rows.iter().map(|r| r.get("year").cloned().unwrap()).collect();
        assert_eq!(years, vec![json!(2022), json!(2023)]);
        assert_eq!(rows[0].get("teams_id"), Some(&json!("1")));
    }

    #[tokio::test]
    async fn undrafted_player_gets_no_draft_row() {
        let mut server = Server::new_async().await;
        let listing = refs(&server, &["/athletes/10"]);
        server
            .mock("GET", format!("{NFL_PATH}/athletes").as_str())
            .with_body(listing)
            .create_async()
            .await;
        server
            .mock("GET", "/athletes/10")
            .with_body(r#"{"id":"10","type":"football","fullName":"Walk On","draft":{"round":1}}"#)
            .create_async()
            .await;

        let core = EspnCore::new(HttpClient::default(), server.url());
        let store = MemoryStore::new();
        let pipeline = Pipeline::new(core.client(), &store);
        let mut ctx = RunContext::new();
        ingest_players(&core, &pipeline, &nfl(), &mut ctx).await.unwrap();

        assert_eq!(store.writes(Table::Players), 1);
        assert_eq!(store.writes(Table::Drafts), 0);
        assert_eq!(ctx.stats.skipped(Table::Drafts), 0);
    }

    #[tokio::test]
    async fn drafted_player_links_to_team() {
        let mut server = Server::new_async().await;
        let url = server.url();
        let listing = refs(&server, &["/athletes/20", "/athletes/21"]);
        server
            .mock("GET", format!("{NFL_PATH}/athletes").as_str())
            .with_body(listing)
            .create_async()
            .await;
        server
            .mock("GET", "/athletes/20")
            .with_body(
                json!({
                    "id": "20",
                    "fullName": "First Pick",
                    "draft": {"year": 2023, "round": 1, "selection": 1,
                              "team": {"$ref": format!("{url}/draftteams/5")}}
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/athletes/21")
            .with_body(
                json!({
                    "id": "21",
                    "fullName": "Orphan Pick",
                    "draft": {"year": 2023, "round": 7, "selection": 250,
                              "team": {"$ref": format!("{url}/draftteams/6")}}
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/draftteams/5")
            .with_body(r#"{"id":"5","name":"Panthers"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/draftteams/6")
            .with_body(r#"{"id":"6","name":"Not Stored"}"#)
            .create_async()
            .await;

        let store = MemoryStore::new();
        let mut team = FlatRecord::new(Table::Teams);
        team.set("league", "nfl").unwrap();
        team.set("id", "5").unwrap();
        store.upsert(&team).await.unwrap();

        let core = EspnCore::new(HttpClient::default(), url.clone());
        let pipeline = Pipeline::new(core.client(), &store);
        let mut ctx = RunContext::new();
        ingest_players(&core, &pipeline, &nfl(), &mut ctx).await.unwrap();

        assert_eq!(store.writes(Table::Players), 2);
        let drafts = store.rows(Table::Drafts);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].get("teamid"), Some(&json!("5")));
        assert_eq!(drafts[0].get("playerid"), Some(&json!("20")));
        assert_eq!(drafts[0].get("year"), Some(&json!(2023)));
        assert_eq!(ctx.stats.skipped(Table::Drafts), 1);
    }

    #[tokio::test]
    async fn dangling_links_do_not_stop_the_run() {
        let mut server = Server::new_async().await;
        let url = server.url();
        let listing = refs(&server, &["/athletes/1", "/athletes/2"]);
        server
            .mock("GET", format!("{NFL_PATH}/athletes").as_str())
            .with_body(listing)
            .create_async()
            .await;
        server
            .mock("GET", "/athletes/1")
            .with_body(
                json!({
                    "id": "1",
                    "fullName": "Missing Stats",
                    "statistics": {"$ref": format!("{url}/athletes/1/statistics")},
                    "draft": {"year": 2022, "round": 3, "selection": 70,
                              "team": {"$ref": format!("{url}/teams/404")}}
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/athletes/2")
            .with_body(
                json!({
                    "id": "2",
                    "fullName": "Has Stats",
                    "statistics": {"$ref": format!("{url}/athletes/2/statistics")}
                })
                .to_string(),
            )
            .create_async()
            .await;
        let missing = server
            .mock("GET", "/athletes/1/statistics")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/teams/404")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/athletes/2/statistics")
            .with_body(r#"{"splits":{}}"#)
            .create_async()
            .await;

        let core = EspnCore::new(HttpClient::default(), url.clone());
        let store = MemoryStore::new();
        let pipeline = Pipeline::new(core.client(), &store);
        let mut ctx = RunContext::new();
        ingest_players(&core, &pipeline, &nfl(), &mut ctx).await.unwrap();

        missing.assert_async().await;
        let players = store.rows(Table::Players);
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].get("statistics"), Some(&Value::Null));
        assert_eq!(players[1].get("statistics"), Some(&json!(r#"{"splits":{}}"#)));
        assert_eq!(store.writes(Table::Drafts), 0);
    }

    async fn mock_league(server: &mut Server) -> Vec<mockito::Mock> {
        let url = server.url();
        let listing = |path: &str| json!({"items": [{"$ref": format!("{url}{path}")}]}).to_string();
        let routes = [
            (
                format!("{NFL_PATH}/seasons/2023"),
                r#"{"year":2023,"startDate":"2023-08-03T07:00Z","endDate":"2024-02-14T07:59Z"}"#.to_owned(),
            ),
            (format!("{NFL_PATH}/seasons/2023/teams"), listing("/teams/1")),
            (format!("{NFL_PATH}/teams"), listing("/teams/1")),
            (
                "/teams/1".to_owned(),
                r#"{"id":"1","name":"Falcons","location":"Atlanta","color":"a71930"}"#.to_owned(),
            ),
            (format!("{NFL_PATH}/athletes"), listing("/athletes/7")),
            (
                "/athletes/7".to_owned(),
                json!({
                    "id": "7", "fullName": "Bijan Robinson",
                    "draft": {"year": 2023, "round": 1, "selection": 8,
                              "team": {"$ref": format!("{url}/teams/1")}}
                })
                .to_string(),
            ),
        ];

        let mut mocks = Vec::new();
        for (path, body) in routes {
            mocks.push(server.mock("GET", path.as_str()).with_body(body).create_async().await);
        }
        mocks
    }

    #[tokio::test]
    async fn full_run_is_idempotent() {
        let mut server = Server::new_async().await;
        let _mocks = mock_league(&mut server).await;
        let core = EspnCore::new(HttpClient::default(), server.url());
        let store = MemoryStore::new();
        let years = YearRange::new(2023, 2024);

        run(&core, &store, &[nfl()], years, &mut RunContext::new()).await.unwrap();
        let snapshot: Vec<_> = Table::ALL.iter().map(|t| store.rows(*t)).collect();

        run(&core, &store, &[nfl()], years, &mut RunContext::new()).await.unwrap();
        let again: Vec<_> = Table::ALL.iter().map(|t| store.rows(*t)).collect();

        assert_eq!(snapshot, again);
        assert_eq!(store.len(Table::Seasons), 1);
        assert_eq!(store.len(Table::Teams), 1);
        assert_eq!(store.len(Table::SeasonTeams), 1);
        assert_eq!(store.len(Table::Players), 1);
        assert_eq!(store.len(Table::Drafts), 1);

        let season = &store.rows(Table::Seasons)[0];
        assert_eq!(season.get("startdate"), Some(&json!("2023-08-03")));
        assert_eq!(season.get("league"), Some(&json!("nfl")));
        let team = &store.rows(Table::Teams)[0];
        assert_eq!(team.get("city"), Some(&json!("Atlanta")));
    }
}
