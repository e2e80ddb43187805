use std::path::PathBuf;

use clap::Parser;
use fbref_scraping::parser::{match_info::extract_info, match_tables::extract_tables};
use fbref_scraping::schema::{MatchRecord, MatchUrl};
use fbref_scraping_utils::fs_json_util::write_json_pretty;
use scraper::Html;

#[derive(Parser)]
struct Opts {
    /// A match report page saved from the site.
    input_file: PathBuf,
    /// Recorded as the `url` field.
    #[arg(long, default_value = "https://fbref.com/en/matches/saved-page")]
    url: String,
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let opts = Opts::parse();

    let html = Html::parse_document(&fs_err::read_to_string(&opts.input_file)?);
    let info = extract_info(&html);
    let tables = extract_tables(&html);
    for missing in info.missing.iter().chain(&tables.missing) {
        eprintln!("{missing}");
    }
    let record = MatchRecord::new(MatchUrl::from_href(&opts.url), info.value, tables.value);

    match opts.output {
        Some(output) => write_json_pretty(output, &record)?,
        None => println!("{}", serde_json::to_string_pretty(&record)?),
    }

    Ok(())
}
