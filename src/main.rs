//! # Kitespot Scout
//!
//! Discovers kitesurfing spots on a fixed set of websites, geocodes them and
//! inserts the ones not already known into a Supabase table.
//!
//! ## Usage
//!
//! ```sh
//! SUPABASE_URL=https://xyz.supabase.co SUPABASE_KEY=... kitespot_scout
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Seeding**: Load the `name, country` keys already in the table
//! 2. **Collecting**: Fetch each source page in turn and run its parser
//! 3. **Enrichment**: Geocode, de-duplicate and insert every candidate concurrently
//!
//! All outbound requests share one rate limiter. Per-item failures are logged
//! and skipped; only invalid configuration stops the process.

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{error, info, instrument};

mod cli;
mod config;
mod dedup;
mod fetch;
mod geocode;
mod logging;
mod models;
mod pipeline;
mod scrapers;
mod store;
mod utils;

use cli::Cli;
use config::Config;
use fetch::{Fetcher, RateLimiter};
use geocode::{Geocoder, NominatimLookup};
use pipeline::Pipeline;
use scrapers::SourceRegistry;
use store::SupabaseStore;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();
    let _log_guard = logging::init_logging(std::path::Path::new(&args.log_dir))?;

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "kitespot_scout starting up");

    let config = match Config::from_cli(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration; nothing was done");
            return Err(e.into());
        }
    };
    info!(?config, "Loaded configuration");

    let limiter = Arc::new(RateLimiter::new(config.min_interval));
    let fetcher = Fetcher::new(Arc::clone(&limiter), config.fetch_timeout)?;
    let lookup = NominatimLookup::new(
        config.geocoder_url.as_str(),
        config.geocoder_user_agent.as_str(),
        config.geocode_timeout,
    )?;
    let geocoder = Geocoder::new(lookup, limiter);
    let store = SupabaseStore::new(&config.supabase_url, &config.supabase_key, &config.table)?;
    let registry = SourceRegistry::builtin(Arc::new(config.heuristics.clone()));
    info!(sources = registry.len(), "Registered sources");

    let pipeline = Pipeline::new(fetcher, geocoder, store, registry);

    match config.watch {
        None => {
            pipeline.run_once().await;
        }
        Some(interval) => loop {
            pipeline.run_once().await;
            let next_run = chrono::Duration::from_std(interval)
                .ok()
                .map(|d| (chrono::Local::now() + d).format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            info!(?interval, %next_run, "Sleeping until next pass");
            tokio::time::sleep(interval).await;
        },
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
