mod admin;
mod cli;
mod config;
mod ingest;
mod record;
mod store;
mod venues;

use crate::cli::{Command, Invocation, Parsed};
use crate::config::Config;
use crate::ingest::RunContext;
use crate::store::Backend;
use dotenv::dotenv;
use env_logger::Env;
use log::{error, info};
use sportsdb_api::apisports::ApiSports;
use sportsdb_api::client::HttpClient;
use sportsdb_api::espn::EspnCore;
use sportsdb_api::places::Places;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let Some(invocation) = handle_cli_args() else {
        return Ok(());
    };

    better_panic::install();
    dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    if let Err(e) = run(invocation).await {
        error!("{e:#}");
        std::process::exit(1);
    }
    Ok(())
}

fn handle_cli_args() -> Option<Invocation> {
    match cli::parse(std::env::args().skip(1)) {
        Ok(Parsed::Run(invocation)) => Some(invocation),
        Ok(Parsed::Help) => {
            println!("{}", cli::usage_text());
            None
        }
        Ok(Parsed::Version) => {
            println!("sportsdb-ingest {}", env!("CARGO_PKG_VERSION"));
            None
        }
        Err(e) => {
            eprintln!("{e}\n\n{}", cli::usage_text());
            std::process::exit(2);
        }
    }
}

async fn run(invocation: Invocation) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if invocation.years.is_some() {
        config.years = invocation.years;
    }
    let client = HttpClient::new(config.timeout);

    match invocation.command {
        Command::Espn => {
            let store = Backend::open(&config, invocation.dry_run).await?;
            let core = EspnCore::new(client, config.espn_base_url.as_str());
            let years = config.years_or(ingest::espn::DEFAULT_YEARS);
            let mut ctx = RunContext::new();
            let result = ingest::espn::run(&core, &store, &config.espn_leagues, years, &mut ctx).await;
            ctx.stats.log_summary();
            result
        }
        Command::ApiSports => {
            let store = Backend::open(&config, invocation.dry_run).await?;
            let api = ApiSports::new(
                client,
                &config.apisports_host,
                config.api_key()?,
                config.apisports_base_url.as_deref(),
            )?;
            let years = config.years_or(ingest::apisports::DEFAULT_YEARS);
            let mut ctx = RunContext::new();
            let result = ingest::apisports::run(&api, &store, years, &mut ctx).await;
            ctx.stats.log_summary();
            result
        }
        Command::Venues { address, out } => {
            let places = Places::new(client, config.maps_base_url.as_str(), config.maps_api_key()?);
            venues::discover(&places, &address, &out).await.map(|_| ())
        }
        Command::Sample { player_name, player_sport } => {
            let store = Backend::open(&config, invocation.dry_run).await?;
            for row in admin::sample(&store, &player_name, &player_sport).await? {
                info!("  {row}");
            }
            Ok(())
        }
        Command::Check => {
            let store = Backend::open(&config, invocation.dry_run).await?;
            admin::check(&store).await
        }
        Command::Migrate => {
            let store = Backend::open(&config, false).await?;
            admin::migrate(&store).await
        }
    }
}
