use std::path::PathBuf;

use clap::Parser;
use fbref_scraping::data_collector::new_match_urls;
use scraper::Html;

#[derive(Parser)]
struct Opts {
    /// A league schedule page saved from the site.
    input_file: PathBuf,
    /// Leaves out the matches already loaded into this database.
    #[arg(long)]
    database: Option<PathBuf>,
    #[arg(long, default_value = "fbref")]
    dataset: String,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let opts = Opts::parse();

    let html = Html::parse_document(&fs_err::read_to_string(&opts.input_file)?);
    let urls = new_match_urls(&html, opts.database.as_deref(), &opts.dataset);
    for url in &urls {
        println!("{url}");
    }
    eprintln!("{} new match report(s)", urls.len());

    Ok(())
}
