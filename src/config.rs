//! Validated run settings.
//!
//! [`Config::from_cli`] is the only place a run can fail before doing any
//! work: missing Supabase credentials, an unparseable URL or a broken heading
//! pattern all surface here as a [`ConfigError`].

use crate::cli::Cli;
use crate::scrapers::Heuristics;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{var} is not a valid URL: {source}")]
    InvalidUrl {
        var: &'static str,
        source: url::ParseError,
    },
    #[error("invalid heading heuristics: {0}")]
    Heuristics(String),
}

pub struct Config {
    pub supabase_url: String,
    pub supabase_key: String,
    pub table: String,
    pub geocoder_url: String,
    pub geocoder_user_agent: String,
    pub min_interval: Duration,
    pub fetch_timeout: Duration,
    pub geocode_timeout: Duration,
    pub heuristics: Heuristics,
    /// Pause between passes; `None` for a single pass.
    pub watch: Option<Duration>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("supabase_url", &self.supabase_url)
            .field("supabase_key", &"<redacted>")
            .field("table", &self.table)
            .field("geocoder_url", &self.geocoder_url)
            .field("geocoder_user_agent", &self.geocoder_user_agent)
            .field("min_interval", &self.min_interval)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("geocode_timeout", &self.geocode_timeout)
            .field("watch", &self.watch)
            .finish()
    }
}

fn required(value: &Option<String>, var: &'static str) -> Result<String, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::Missing(var))
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let supabase_url = required(&cli.supabase_url, "SUPABASE_URL")?;
        let supabase_key = required(&cli.supabase_key, "SUPABASE_KEY")?;
        Url::parse(&supabase_url).map_err(|source| ConfigError::InvalidUrl {
            var: "SUPABASE_URL",
            source,
        })?;
        Url::parse(&cli.geocoder_url).map_err(|source| ConfigError::InvalidUrl {
            var: "GEOCODER_URL",
            source,
        })?;

        let heuristics =
            Heuristics::new(cli.skip_heading_words.clone(), &cli.title_split_pattern)
                .map_err(|e| ConfigError::Heuristics(e.to_string()))?;

        Ok(Self {
            supabase_url,
            supabase_key,
            table: cli.table.clone(),
            geocoder_url: cli.geocoder_url.clone(),
            geocoder_user_agent: cli.geocoder_user_agent.clone(),
            min_interval: Duration::from_millis(cli.min_interval_ms),
            fetch_timeout: Duration::from_secs(cli.fetch_timeout_secs),
            geocode_timeout: Duration::from_secs(cli.geocode_timeout_secs),
            heuristics,
            watch: cli.watch.then(|| Duration::from_secs(cli.interval_secs)),
        })
    }
}
