//! Free-text geocoding with an in-run cache.
//!
//! # Architecture
//!
//! The module uses a trait-based design:
//! - [`GeocodeLookup`]: Core trait, one query in, at most one coordinate pair out
//! - [`NominatimLookup`]: OpenStreetMap Nominatim implementation
//! - [`Geocoder`]: Decorator that adds the exact-string cache and the shared
//!   rate-limit wait to any `GeocodeLookup`
//!
//! Cache keys are the query strings exactly as given. Two spellings of the same
//! place are looked up separately.

use crate::fetch::RateLimiter;
use crate::models::Coordinates;
use reqwest::{Client, RequestBuilder};
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Default public Nominatim search endpoint.
pub const NOMINATIM_SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Trait for async geocoding backends.
pub trait GeocodeLookup {
    /// Resolve `query` to coordinates.
    ///
    /// `Ok(None)` means the service answered but found nothing.
    async fn lookup(&self, query: &str) -> Result<Option<Coordinates>, Box<dyn Error>>;
}

/// Nominatim search result; coordinates arrive as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Geocoding backend talking to a Nominatim-compatible `/search` endpoint.
#[derive(Debug, Clone)]
pub struct NominatimLookup {
    client: Client,
    search_url: String,
    user_agent: String,
}

impl NominatimLookup {
    /// Create a lookup client.
    ///
    /// # Arguments
    ///
    /// * `search_url` - Search endpoint, usually [`NOMINATIM_SEARCH_URL`]
    /// * `user_agent` - Identity string; Nominatim rejects anonymous clients
    /// * `timeout` - Per-request bound, a timeout counts as a failed lookup
    pub fn new(
        search_url: impl Into<String>,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            search_url: search_url.into(),
            user_agent: user_agent.into(),
        })
    }

    /// Search request for `query`; parameters are appended to any query string
    /// already present on the endpoint.
    fn search_request(&self, query: &str) -> RequestBuilder {
        self.client
            .get(&self.search_url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .header(USER_AGENT, &self.user_agent)
    }
}

impl GeocodeLookup for NominatimLookup {
    #[instrument(level = "debug", skip(self))]
    async fn lookup(&self, query: &str) -> Result<Option<Coordinates>, Box<dyn Error>> {
        let response = self
            .search_request(query)
            .send()
            .await?
            .error_for_status()?;
        let places: Vec<NominatimPlace> = serde_json::from_str(&response.text().await?)?;

        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };
        debug!(display_name = ?place.display_name, "Nominatim match");
        Ok(Some(Coordinates {
            latitude: place.lat.parse()?,
            longitude: place.lon.parse()?,
        }))
    }
}

/// Caching, rate-limited wrapper around a [`GeocodeLookup`].
pub struct Geocoder<L> {
    inner: L,
    limiter: Arc<RateLimiter>,
    cache: Mutex<HashMap<String, Coordinates>>,
}

impl<L> fmt::Debug for Geocoder<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Geocoder")
            .field("limiter", &self.limiter)
            .field("cached", &self.cache.lock().map(|c| c.len()).unwrap_or(0))
            .finish()
    }
}

impl<L> Geocoder<L>
where
    L: GeocodeLookup,
{
    pub fn new(inner: L, limiter: Arc<RateLimiter>) -> Self {
        Self {
            inner,
            limiter,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a query, consulting the cache first.
    ///
    /// Empty queries and cache hits return without touching the network or the
    /// rate limiter. Misses wait for a rate-limit slot, perform exactly one
    /// lookup and release the slot once it returns; failures and empty results
    /// are logged and yield `None`.
    #[instrument(level = "info", skip(self))]
    pub async fn resolve(&self, query: &str) -> Option<Coordinates> {
        if query.trim().is_empty() {
            return None;
        }
        if let Some(hit) = self.cached(query) {
            debug!("Geocode cache hit");
            return Some(hit);
        }

        let slot = self.limiter.wait().await;
        let t0 = Instant::now();
        let result = self.inner.lookup(query).await;
        drop(slot);

        match result {
            Ok(Some(coords)) => {
                info!(
                    latitude = coords.latitude,
                    longitude = coords.longitude,
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Geocoded"
                );
                if let Ok(mut cache) = self.cache.lock() {
                    cache.insert(query.to_string(), coords);
                }
                Some(coords)
            }
            Ok(None) => {
                warn!("Geocoding returned no result");
                None
            }
            Err(e) => {
                warn!(error = %e, elapsed_ms = t0.elapsed().as_millis() as u64, "Geocoding failed");
                None
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &L {
        &self.inner
    }

    fn cached(&self, query: &str) -> Option<Coordinates> {
        self.cache.lock().ok()?.get(query).copied()
    }
}
