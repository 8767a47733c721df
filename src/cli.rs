//! Command-line interface definitions for Kitespot Scout.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every option can also be provided through an environment variable, which is
//! how the Supabase credentials are normally supplied.

use crate::geocode::NOMINATIM_SEARCH_URL;
use crate::scrapers::DEFAULT_SPLIT_PATTERN;
use clap::Parser;

/// Command-line arguments for the Kitespot Scout application.
///
/// # Examples
///
/// ```sh
/// # One discovery pass
/// SUPABASE_URL=https://xyz.supabase.co SUPABASE_KEY=... kitespot_scout
///
/// # Keep running, one pass every six hours
/// kitespot_scout --watch --interval-secs 21600
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Supabase project URL
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase API key
    #[arg(long, env = "SUPABASE_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,

    /// Destination table for discovered spots
    #[arg(long, env = "SUPABASE_TABLE", default_value = "kitespots")]
    pub table: String,

    /// Identity sent to the geocoding service
    #[arg(long, env = "GEOCODER_USER_AGENT", default_value = "kitespot_scout")]
    pub geocoder_user_agent: String,

    /// Geocoding search endpoint (Nominatim-compatible)
    #[arg(long, env = "GEOCODER_URL", default_value = NOMINATIM_SEARCH_URL)]
    pub geocoder_url: String,

    /// Minimum delay between outbound requests, in milliseconds
    #[arg(long, env = "MIN_REQUEST_INTERVAL_MS", default_value_t = 2000)]
    pub min_interval_ms: u64,

    /// Page fetch timeout, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// Geocoding request timeout, in seconds
    #[arg(long, env = "GEOCODE_TIMEOUT_SECS", default_value_t = 10)]
    pub geocode_timeout_secs: u64,

    /// Directory for the persistent log file
    #[arg(short, long, env = "LOG_DIR", default_value = "logs")]
    pub log_dir: String,

    /// Headings containing any of these words are not treated as spots
    #[arg(
        long,
        env = "SKIP_HEADING_WORDS",
        value_delimiter = ',',
        default_value = "why,how,what,when,conclusion"
    )]
    pub skip_heading_words: Vec<String>,

    /// Regex splitting a heading into `name` and `country` groups
    #[arg(long, env = "TITLE_SPLIT_PATTERN", default_value = DEFAULT_SPLIT_PATTERN)]
    pub title_split_pattern: String,

    /// Keep running, repeating the discovery pass every `--interval-secs`
    #[arg(short, long)]
    pub watch: bool,

    /// Pause between passes in watch mode, in seconds
    #[arg(long, env = "WATCH_INTERVAL_SECS", default_value_t = 3600)]
    pub interval_secs: u64,
}
