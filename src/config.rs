use std::{fmt::Debug, path::PathBuf, time::Duration};

use fbref_scraping_utils::{fs_json_util::read_toml, regex};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use url::Url;

use crate::api::DelayRange;

pub const DEFAULT_LEAGUES: [&str; 2] = [
    "https://fbref.com/en/comps/12/schedule/La-Liga-Scores-and-Fixtures",
    "https://fbref.com/en/comps/9/schedule/Premier-League-Scores-and-Fixtures",
];

fn default_leagues() -> Vec<Url> {
    DEFAULT_LEAGUES
        .iter()
        .map(|league| Url::parse(league).expect("default league urls are valid"))
        .collect()
}
fn default_max_matches_per_run() -> Option<usize> {
    Some(5)
}
fn default_min_delay_seconds() -> f64 {
    1.5
}
fn default_max_delay_seconds() -> f64 {
    4.0
}
fn default_database_path() -> PathBuf {
    "load_fbref_pipeline.sqlite".into()
}
fn default_dataset_name() -> String {
    "fbref".to_owned()
}
fn default_request_timeout_seconds() -> u64 {
    30
}

/// Runtime settings of a pipeline run, usually read from a TOML file.
/// Every field has a default.
#[derive(Clone, Debug, TypedBuilder, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Schedule pages to look for new match reports on.
    #[builder(default = default_leagues())]
    #[serde(default = "default_leagues")]
    pub leagues: Vec<Url>,
    /// `None` scrapes every new match found.
    #[builder(default = default_max_matches_per_run())]
    #[serde(default = "default_max_matches_per_run")]
    pub max_matches_per_run: Option<usize>,
    #[builder(default = default_min_delay_seconds())]
    #[serde(default = "default_min_delay_seconds")]
    pub min_delay_seconds: f64,
    #[builder(default = default_max_delay_seconds())]
    #[serde(default = "default_max_delay_seconds")]
    pub max_delay_seconds: f64,
    #[builder(default = default_database_path())]
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[builder(default = default_dataset_name())]
    #[serde(default = "default_dataset_name")]
    pub dataset_name: String,
    #[builder(default = default_request_timeout_seconds())]
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("At least one league schedule url is required.")]
    NoLeagues,
    #[error("Delays must be non-negative and representable as a duration: min={min}, max={max}")]
    InvalidDelay { min: f64, max: f64 },
    #[error("The minimum delay ({min}s) exceeds the maximum delay ({max}s).")]
    DelayRangeReversed { min: f64, max: f64 },
    #[error("Invalid dataset name {0:?}: only ASCII letters, digits and underscores are allowed.")]
    InvalidDataset(String),
}

impl Config {
    pub fn load<P: Into<PathBuf> + Debug>(path: P) -> anyhow::Result<Self> {
        read_toml(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.leagues.is_empty() {
            return Err(ConfigError::NoLeagues);
        }
        DelayRange::new(self.min_delay_seconds, self.max_delay_seconds)?;
        if !regex!(r"^[A-Za-z_][A-Za-z0-9_]*$").is_match(&self.dataset_name) {
            return Err(ConfigError::InvalidDataset(self.dataset_name.clone()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}
