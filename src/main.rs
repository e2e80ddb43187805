use std::path::PathBuf;

use clap::Parser;
use fbref_scraping::api::FbrefClient;
use fbref_scraping::config::Config;
use fbref_scraping::data_collector::Pipeline;
use fbref_scraping::storage::MatchStatsStore;
use log::info;
use url::Url;

#[derive(Parser)]
struct Opts {
    /// TOML file with the run settings.  Built-in defaults are used without it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides `database_path`.
    #[arg(long)]
    database: Option<PathBuf>,
    /// Overrides `max_matches_per_run`.
    #[arg(long, conflicts_with = "no_limit")]
    max_matches: Option<usize>,
    /// Scrape every new match found.
    #[arg(long)]
    no_limit: bool,
    /// Replaces the configured leagues.  May be repeated.
    #[arg(long = "league")]
    leagues: Vec<Url>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opts = Opts::parse();
    let mut config = match &opts.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(database) = opts.database {
        config.database_path = database;
    }
    if let Some(max_matches) = opts.max_matches {
        config.max_matches_per_run = Some(max_matches);
    }
    if opts.no_limit {
        config.max_matches_per_run = None;
    }
    if !opts.leagues.is_empty() {
        config.leagues = opts.leagues;
    }
    config.validate()?;
    info!("Running with {config:?}");

    let client = FbrefClient::new(&config)?;
    let store = MatchStatsStore::open(&config.database_path, &config.dataset_name)?;
    let mut pipeline = Pipeline::new(config, client, store);
    let load_info = pipeline.run().await?;
    println!("{load_info}");

    Ok(())
}
