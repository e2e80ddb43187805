use std::time::Duration;

use anyhow::Context;
use log::{debug, info, warn};
use rand::Rng;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tokio::time::sleep;

use crate::config::{Config, ConfigError};

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Source of raw HTML pages.
#[allow(async_fn_in_trait)]
pub trait PageFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<String>;
}

/// Bounds of the random pause taken before every request.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}
impl DelayRange {
    pub fn new(min_seconds: f64, max_seconds: f64) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidDelay {
            min: min_seconds,
            max: max_seconds,
        };
        let min = Duration::try_from_secs_f64(min_seconds).map_err(|_| invalid())?;
        let max = Duration::try_from_secs_f64(max_seconds).map_err(|_| invalid())?;
        if min > max {
            return Err(ConfigError::DelayRangeReversed {
                min: min_seconds,
                max: max_seconds,
            });
        }
        Ok(Self { min, max })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max == self.min {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

/// HTTP client that looks like a desktop Chrome to the site and paces its
/// requests.  One request is in flight at a time.
pub struct FbrefClient {
    client: reqwest::Client,
    delay: DelayRange,
}

impl FbrefClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest_client(config.request_timeout()).context("Failed to build the HTTP client")?;
        Ok(Self {
            client,
            delay: DelayRange::new(config.min_delay_seconds, config.max_delay_seconds)?,
        })
    }
}

impl PageFetcher for FbrefClient {
    async fn fetch(&self, url: &str) -> anyhow::Result<String> {
        let delay = self.delay.sample(&mut rand::thread_rng());
        debug!("Waiting {delay:?} before requesting {url}");
        sleep(delay).await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to request {url}"))?;
        let status = response.status();
        info!("Response status code: {status} for URL: {url}");
        if !status.is_success() {
            warn!("Unexpected status {status:?} for {url}; the page will be parsed anyway.");
        }
        response
            .text()
            .await
            .with_context(|| format!("Failed to read the body of {url}"))
    }
}

fn reqwest_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .cookie_store(true)
        .gzip(true)
        .timeout(timeout)
        .build()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::{rngs::StdRng, SeedableRng};

    use super::{DelayRange, FbrefClient};
    use crate::config::{Config, ConfigError};

    #[test]
    fn test_delay_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let range = DelayRange::new(1.5, 4.0).unwrap();
        for _ in 0..1000 {
            let delay = range.sample(&mut rng);
            assert!(Duration::from_secs_f64(1.5) <= delay);
            assert!(delay <= Duration::from_secs_f64(4.0));
        }
    }

    #[test]
    fn test_fixed_delay() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            DelayRange::new(0.0, 0.0).unwrap().sample(&mut rng),
            Duration::ZERO
        );
        assert_eq!(
            DelayRange::new(2.0, 2.0).unwrap().sample(&mut rng),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_unrepresentable_delay_is_rejected() {
        for (min, max) in [(1e20, 1e20), (-1.0, 2.0), (0.0, f64::NAN), (0.0, f64::INFINITY)] {
            assert!(matches!(
                DelayRange::new(min, max),
                Err(ConfigError::InvalidDelay { .. })
            ));
        }
        assert!(matches!(
            DelayRange::new(3.0, 1.0),
            Err(ConfigError::DelayRangeReversed { .. })
        ));

        let config = Config::builder()
            .min_delay_seconds(-1.0)
            .max_delay_seconds(2.0)
            .build();
        assert!(FbrefClient::new(&config).is_err());
    }

    #[test]
    fn test_client_builds() {
        FbrefClient::new(&Config::default()).unwrap();
    }
}
