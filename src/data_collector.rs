use std::{
    collections::HashSet,
    fmt,
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::{DateTime, Utc};
use getset::{CopyGetters, Getters};
use log::{info, trace, warn};
use scraper::Html;

use crate::{
    api::PageFetcher,
    config::Config,
    parser::{match_info::extract_info, match_tables::extract_tables, schedule::parse_match_report_urls},
    query::DocumentQuery,
    schema::{MatchRecord, MatchUrl},
    storage::{load_prior_urls, LoadId, MatchStatsStore, StorageError},
};

/// Match-report URLs of a schedule page that are not loaded yet.
///
/// Without a readable database every URL counts as new.
pub fn new_match_urls<D: DocumentQuery + ?Sized>(
    html: &D,
    database_path: Option<&Path>,
    dataset: &str,
) -> Vec<MatchUrl> {
    let candidates = parse_match_report_urls(html);
    let prior = match database_path.map(|path| load_prior_urls(path, dataset)) {
        None => HashSet::new(),
        Some(Ok(urls)) => urls,
        Some(Err(StorageError::NotFound(path))) => {
            info!("No database at {path:?} yet.  Every match report is new.");
            HashSet::new()
        }
        Some(Err(e)) => {
            warn!("Could not read the loaded match urls, so every match report is treated as new: {e}");
            HashSet::new()
        }
    };
    filter_new(candidates, &prior)
}

/// Keeps the candidates that are not in `prior`, in order and with duplicates.
pub fn filter_new(candidates: Vec<MatchUrl>, prior: &HashSet<MatchUrl>) -> Vec<MatchUrl> {
    candidates
        .into_iter()
        .filter(|url| {
            let known = prior.contains(url);
            trace!("Checking {url}: {}", if known { "already loaded" } else { "new" });
            !known
        })
        .collect()
}

/// Fetches a match page and runs both extractors on it.
pub async fn scrape_match<F: PageFetcher>(fetcher: &F, url: MatchUrl) -> anyhow::Result<MatchRecord> {
    info!("Scraping match URL: {url}");
    let body = fetcher.fetch(url.as_str()).await?;
    let html = Html::parse_document(&body);
    let info = extract_info(&html).value;
    let tables = extract_tables(&html).value;
    Ok(MatchRecord::new(url, info, tables))
}

/// Lazily scrapes one match per call to [`Self::next_record`].
pub struct MatchStatsStream<'f, F> {
    fetcher: &'f F,
    urls: std::vec::IntoIter<MatchUrl>,
}

impl<'f, F: PageFetcher> MatchStatsStream<'f, F> {
    pub fn new(fetcher: &'f F, urls: Vec<MatchUrl>) -> Self {
        Self {
            fetcher,
            urls: urls.into_iter(),
        }
    }

    pub async fn next_record(&mut self) -> Option<anyhow::Result<MatchRecord>> {
        let url = self.urls.next()?;
        Some(scrape_match(self.fetcher, url).await)
    }

    pub fn remaining(&self) -> usize {
        self.urls.len()
    }
}

#[derive(Debug, Getters, CopyGetters)]
pub struct LoadInfo {
    #[getset(get = "pub")]
    load_id: LoadId,
    #[getset(get = "pub")]
    dataset: String,
    #[getset(get = "pub")]
    database_path: PathBuf,
    #[getset(get_copy = "pub")]
    records: usize,
    #[getset(get_copy = "pub")]
    started_at: DateTime<Utc>,
    #[getset(get_copy = "pub")]
    finished_at: DateTime<Utc>,
}
impl fmt::Display for LoadInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Load {} finished in {:.1}s: {} match record(s) appended to dataset {:?} in {:?}",
            self.load_id,
            (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0,
            self.records,
            self.dataset,
            self.database_path,
        )
    }
}

/// Discovers new matches on the configured leagues and loads them.
pub struct Pipeline<F> {
    config: Config,
    fetcher: F,
    store: MatchStatsStore,
}

impl<F: PageFetcher> Pipeline<F> {
    pub fn new(config: Config, fetcher: F, store: MatchStatsStore) -> Self {
        Self {
            config,
            fetcher,
            store,
        }
    }

    /// New match URLs of every league, capped to `max_matches_per_run`.
    pub async fn collect_match_urls(&self) -> anyhow::Result<Vec<MatchUrl>> {
        let mut match_urls = vec![];
        for league in &self.config.leagues {
            let body = self
                .fetcher
                .fetch(league.as_str())
                .await
                .with_context(|| format!("Failed to fetch the schedule page {league}"))?;
            let season_urls = new_match_urls(
                &Html::parse_document(&body),
                Some(self.config.database_path.as_path()),
                &self.config.dataset_name,
            );
            info!(
                "League: {league} - New match reports to scrape: {}",
                season_urls.len()
            );
            match_urls.extend(season_urls);
        }
        if let Some(max) = self.config.max_matches_per_run {
            if match_urls.len() > max {
                info!(
                    "Limiting this run to {max} of {} new match reports.",
                    match_urls.len()
                );
                match_urls.truncate(max);
            }
        }
        Ok(match_urls)
    }

    /// Runs the whole pipeline.  Each record is written as soon as it has
    /// been scraped; the first failure aborts the run.
    pub async fn run(&mut self) -> anyhow::Result<LoadInfo> {
        let started_at = Utc::now();
        let match_urls = self.collect_match_urls().await?;
        let load_id = self.store.start_load(started_at)?;
        info!("Starting load {load_id} with {} match(es).", match_urls.len());

        let mut stream = MatchStatsStream::new(&self.fetcher, match_urls);
        let mut records = 0;
        while let Some(record) = stream.next_record().await {
            let record = record?;
            self.store
                .append(&load_id, &record)
                .with_context(|| format!("Failed to store {}", record.url))?;
            records += 1;
            trace!("{} match(es) left.", stream.remaining());
        }

        let finished_at = Utc::now();
        self.store.finish_load(&load_id, finished_at, records)?;
        Ok(LoadInfo {
            load_id,
            dataset: self.store.dataset().to_owned(),
            database_path: self.store.path().to_owned(),
            records,
            started_at,
            finished_at,
        })
    }
}
