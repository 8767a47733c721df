//! Rate-limited page fetching.
//!
//! Every outbound call (page fetches and geocoding lookups alike) goes through
//! one shared [`RateLimiter`]. A caller holds a [`RequestSlot`] for the whole
//! request; the limiter's clock is stamped when the slot is dropped, so the
//! minimum interval runs from the end of one request to the start of the next.
//!
//! Page requests carry a user agent drawn at random from [`USER_AGENTS`] plus a
//! fixed set of browser-like headers.

use rand::seq::IndexedRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, instrument, warn};

/// Identity pool for page requests.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
];

/// Pick a user agent at random from the pool.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Process-wide soft rate limiter.
///
/// [`RateLimiter::wait`] sleeps until at least `min_interval` has passed since
/// the previous request finished, then hands out a [`RequestSlot`]. The slot
/// keeps the lock until it is dropped, so callers are released one at a time.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait for the next request slot.
    ///
    /// Hold the returned slot until the request has completed, on success and
    /// failure paths alike.
    pub async fn wait(&self) -> RequestSlot<'_> {
        let last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let delay = self.min_interval - elapsed;
                debug!(?delay, "Rate limiting outbound request");
                sleep(delay).await;
            }
        }
        RequestSlot {
            granted_at: Instant::now(),
            last,
        }
    }
}

/// Exclusive right to issue one outbound request.
///
/// Dropping the slot records the drop instant as the last request time.
#[derive(Debug)]
pub struct RequestSlot<'a> {
    granted_at: Instant,
    last: MutexGuard<'a, Option<Instant>>,
}

impl RequestSlot<'_> {
    pub fn granted_at(&self) -> Instant {
        self.granted_at
    }
}

impl Drop for RequestSlot<'_> {
    fn drop(&mut self) {
        *self.last = Some(Instant::now());
    }
}

/// Anything that can turn a URL into page text.
///
/// `None` covers every failure mode; callers only care whether they got a page.
pub trait FetchPage {
    async fn fetch(&self, url: &str) -> Option<String>;
}

/// HTTP page fetcher sharing the run's [`RateLimiter`].
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    limiter: Arc<RateLimiter>,
}

impl Fetcher {
    /// Build a fetcher whose requests time out after `timeout`.
    pub fn new(limiter: Arc<RateLimiter>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(browser_headers())
            .build()?;
        Ok(Self { client, limiter })
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert("DNT", HeaderValue::from_static("1"));
    headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));
    headers
}

impl FetchPage for Fetcher {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Option<String> {
        let _slot = self.limiter.wait().await;

        let user_agent = random_user_agent();
        let response = match self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, timeout = e.is_timeout(), "Page request failed");
                return None;
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            warn!(%status, "Page request returned non-OK status");
            return None;
        }

        match response.text().await {
            Ok(body) => {
                info!(bytes = body.len(), "Fetched page");
                Some(body)
            }
            Err(e) => {
                error!(error = %e, "Failed reading page body");
                None
            }
        }
    }
}
