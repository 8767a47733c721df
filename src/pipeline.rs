//! Discovery pass orchestration.
//!
//! One pass runs in three stages:
//! 1. **Seeding**: load existing `name, country` keys from the store (must finish first)
//! 2. **Collecting**: fetch and parse each registered source, one at a time, in registry order
//! 3. **Enrichment**: geocode, duplicate-check and insert every candidate concurrently
//!
//! A source that cannot be fetched, a candidate that cannot be geocoded or a
//! row the store rejects only costs that one unit of work; the pass always
//! runs to completion and reports through the log.

use crate::dedup::DuplicateFilter;
use crate::fetch::FetchPage;
use crate::geocode::{GeocodeLookup, Geocoder};
use crate::models::{SpotCandidate, SpotRecord};
use crate::scrapers::SourceRegistry;
use crate::store::{InsertOutcome, SpotStore};
use futures::FutureExt;
use futures::future::join_all;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// What happened to one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichOutcome {
    Inserted,
    Duplicate,
    NotGeocoded,
    Failed,
}

/// Tally of a single pass, logged at the end of [`Pipeline::run_once`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub sources_fetched: usize,
    pub sources_failed: usize,
    pub candidates: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub not_geocoded: usize,
    pub failed: usize,
}

impl RunReport {
    fn record(&mut self, outcome: EnrichOutcome) {
        match outcome {
            EnrichOutcome::Inserted => self.inserted += 1,
            EnrichOutcome::Duplicate => self.duplicates += 1,
            EnrichOutcome::NotGeocoded => self.not_geocoded += 1,
            EnrichOutcome::Failed => self.failed += 1,
        }
    }
}

/// Everything a pass needs: sources, the page fetcher, the geocoder and the store.
pub struct Pipeline<F, L, S> {
    fetcher: F,
    geocoder: Geocoder<L>,
    store: S,
    registry: SourceRegistry,
}

impl<F, L, S> Pipeline<F, L, S>
where
    F: FetchPage,
    L: GeocodeLookup,
    S: SpotStore,
{
    pub fn new(fetcher: F, geocoder: Geocoder<L>, store: S, registry: SourceRegistry) -> Self {
        Self {
            fetcher,
            geocoder,
            store,
            registry,
        }
    }

    /// Run one full discovery pass.
    #[instrument(level = "info", skip_all)]
    pub async fn run_once(&self) -> RunReport {
        let t0 = Instant::now();
        let mut report = RunReport::default();

        let filter = DuplicateFilter::seed(&self.store).await;
        let candidates = self.collect_candidates(&mut report).await;
        report.candidates = candidates.len();
        info!(count = candidates.len(), "Starting enrichment");

        let outcomes = join_all(candidates.into_iter().map(|candidate| {
            let name = candidate.name.clone();
            AssertUnwindSafe(self.enrich(candidate, &filter))
                .catch_unwind()
                .map(move |result| {
                    result.unwrap_or_else(|_| {
                        error!(%name, "Enrichment panicked");
                        EnrichOutcome::Failed
                    })
                })
        }))
        .await;
        for outcome in outcomes {
            report.record(outcome);
        }

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            sources_fetched = report.sources_fetched,
            sources_failed = report.sources_failed,
            candidates = report.candidates,
            inserted = report.inserted,
            duplicates = report.duplicates,
            not_geocoded = report.not_geocoded,
            failed = report.failed,
            "Discovery pass complete"
        );
        report
    }

    /// Fetch and parse every source in order. A failed fetch skips that source.
    async fn collect_candidates(&self, report: &mut RunReport) -> Vec<SpotCandidate> {
        let mut candidates = Vec::new();
        for source in self.registry.iter() {
            match self.fetcher.fetch(source.url).await {
                Some(page) => {
                    report.sources_fetched += 1;
                    let found = source.parse(&page);
                    info!(source = source.id, count = found.len(), "Collected candidates");
                    candidates.extend(found);
                }
                None => {
                    report.sources_failed += 1;
                    error!(source = source.id, url = source.url, "Source fetch failed; moving on");
                }
            }
        }
        candidates
    }

    /// Geocode, duplicate-check and insert one candidate.
    ///
    /// Spots already known are dropped before geocoding. After geocoding the
    /// key is claimed atomically, so two tasks carrying the same spot cannot
    /// both reach the store. A claim whose insert fails is released again.
    #[instrument(level = "info", skip_all, fields(name = %candidate.name, country = %candidate.country, source = %candidate.source))]
    pub async fn enrich(
        &self,
        mut candidate: SpotCandidate,
        filter: &DuplicateFilter,
    ) -> EnrichOutcome {
        if filter.exists(&candidate.name, &candidate.country) {
            info!("Spot already known; skipping");
            return EnrichOutcome::Duplicate;
        }

        if candidate.coordinates().is_none() {
            match self.geocoder.resolve(&candidate.geocode_query()).await {
                Some(coords) => candidate.set_coordinates(coords),
                None => {
                    warn!("Could not geocode spot; dropping");
                    return EnrichOutcome::NotGeocoded;
                }
            }
        }

        if !filter.claim(&candidate.name, &candidate.country) {
            info!("Spot claimed by another task; skipping");
            return EnrichOutcome::Duplicate;
        }

        let record = match SpotRecord::from_candidate(&candidate) {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "Could not build record");
                filter.release(&candidate.name, &candidate.country);
                return EnrichOutcome::Failed;
            }
        };

        match self.store.insert(&record).await {
            Ok(InsertOutcome::Inserted) => {
                info!(
                    latitude = ?record.latitude,
                    longitude = ?record.longitude,
                    "Inserted new spot"
                );
                EnrichOutcome::Inserted
            }
            Ok(InsertOutcome::Duplicate) => {
                info!("Store already holds this spot");
                EnrichOutcome::Duplicate
            }
            Ok(InsertOutcome::Rejected(detail)) => {
                error!(%detail, "Insert rejected");
                filter.release(&candidate.name, &candidate.country);
                EnrichOutcome::Failed
            }
            Err(e) => {
                error!(error = %e, "Insert failed");
                filter.release(&candidate.name, &candidate.country);
                EnrichOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::RateLimiter;
    use crate::geocode::tests::TableLookup;
    use crate::models::ExistingSpot;
    use crate::scrapers::{Heuristics, Source, kiteforum, surfertoday};
    use crate::store::tests::MemoryStore;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    /// Serves canned pages; unknown URLs behave like failed fetches.
    #[derive(Default)]
    struct CannedFetcher {
        pages: HashMap<&'static str, &'static str>,
    }

    impl FetchPage for CannedFetcher {
        async fn fetch(&self, url: &str) -> Option<String> {
            self.pages.get(url).map(|p| p.to_string())
        }
    }

    fn registry() -> SourceRegistry {
        SourceRegistry::from_sources(vec![
            Source::new(kiteforum::URL, Box::new(kiteforum::KiteforumParser)),
            Source::new(
                surfertoday::URL,
                Box::new(surfertoday::SurfertodayParser::new(Arc::new(
                    Heuristics::default(),
                ))),
            ),
        ])
    }

    fn pipeline(
        lookup: TableLookup,
        store: MemoryStore,
        fetcher: CannedFetcher,
    ) -> Pipeline<CannedFetcher, TableLookup, MemoryStore> {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(1)));
        Pipeline::new(fetcher, Geocoder::new(lookup, limiter), store, registry())
    }

    fn candidate(name: &str, country: &str) -> SpotCandidate {
        SpotCandidate::new(name, country, "kiteforum", kiteforum::URL)
    }

    #[tokio::test]
    async fn test_seeded_duplicate_is_not_inserted() {
        let store = MemoryStore {
            existing: vec![ExistingSpot {
                name: "Cabarete".to_string(),
                country: Some("Dominican Republic".to_string()),
            }],
            ..Default::default()
        };
        let p = pipeline(
            TableLookup::with("Cabarete, Dominican Republic kitesurfing spot", 19.75, -70.41),
            store,
            CannedFetcher::default(),
        );
        let filter = DuplicateFilter::seed(&p.store).await;
        assert!(filter.exists("cabarete", "dominicanrepublic"));

        let outcome = p.enrich(candidate("Cabarete", "Dominican Republic"), &filter).await;

        assert_eq!(outcome, EnrichOutcome::Duplicate);
        assert!(p.store.inserted().is_empty());
    }

    #[tokio::test]
    async fn test_new_spot_is_geocoded_inserted_and_registered() {
        let p = pipeline(
            TableLookup::with("Tarifa, Spain kitesurfing spot", 36.0128, -5.6012),
            MemoryStore::default(),
            CannedFetcher::default(),
        );
        let filter = DuplicateFilter::seed(&p.store).await;

        let outcome = p.enrich(candidate("Tarifa", "Spain"), &filter).await;

        assert_eq!(outcome, EnrichOutcome::Inserted);
        let inserted = p.store.inserted();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].name, "Tarifa");
        assert_eq!(inserted[0].country, "Spain");
        assert_eq!(inserted[0].latitude, Some(36.0128));
        assert_eq!(inserted[0].longitude, Some(-5.6012));
        assert!(filter.exists("Tarifa", "Spain"));
    }

    #[tokio::test]
    async fn test_ungeocodable_spot_is_dropped() {
        let p = pipeline(
            TableLookup::default(),
            MemoryStore::default(),
            CannedFetcher::default(),
        );
        let filter = DuplicateFilter::new();

        let outcome = p.enrich(candidate("Atlantis", "Nowhere"), &filter).await;

        assert_eq!(outcome, EnrichOutcome::NotGeocoded);
        assert!(p.store.inserted().is_empty());
        assert!(!filter.exists("Atlantis", "Nowhere"));
    }

    #[tokio::test]
    async fn test_markup_coordinates_skip_geocoding() {
        let p = pipeline(
            TableLookup::default(),
            MemoryStore::default(),
            CannedFetcher::default(),
        );
        let filter = DuplicateFilter::new();
        let mut spot = candidate("Dakhla", "Morocco");
        spot.latitude = Some(23.7);
        spot.longitude = Some(-15.9);

        assert_eq!(p.enrich(spot, &filter).await, EnrichOutcome::Inserted);
        assert_eq!(p.geocoder.inner().calls(), 0);
    }

    #[tokio::test]
    async fn test_rejected_insert_releases_key() {
        let store = MemoryStore {
            reject_inserts: true,
            ..Default::default()
        };
        let p = pipeline(
            TableLookup::with("Tarifa, Spain kitesurfing spot", 36.0128, -5.6012),
            store,
            CannedFetcher::default(),
        );
        let filter = DuplicateFilter::new();

        assert_eq!(
            p.enrich(candidate("Tarifa", "Spain"), &filter).await,
            EnrichOutcome::Failed
        );
        assert!(!filter.exists("Tarifa", "Spain"));
    }

    #[tokio::test]
    async fn test_concurrent_same_spot_inserted_once() {
        let p = pipeline(
            TableLookup::with("Tarifa, Spain kitesurfing spot", 36.0128, -5.6012),
            MemoryStore::default(),
            CannedFetcher::default(),
        );
        let filter = DuplicateFilter::new();

        let outcomes = join_all(vec![
            p.enrich(candidate("Tarifa", "Spain"), &filter),
            p.enrich(candidate("Tarifa", "Spain"), &filter),
        ])
        .await;

        assert_eq!(p.store.inserted().len(), 1);
        assert!(outcomes.contains(&EnrichOutcome::Inserted));
        assert!(outcomes.contains(&EnrichOutcome::Duplicate));
    }

    #[tokio::test]
    async fn test_run_once_survives_failed_source_and_seed() {
        let mut fetcher = CannedFetcher::default();
        // surfertoday is absent, so its fetch fails
        fetcher.pages.insert(
            kiteforum::URL,
            r#"
            <div class="spot-item"><h3 class="spot-name">Tarifa</h3><span class="spot-country">Spain</span></div>
            <div class="spot-item" data-lat="23.7" data-lng="-15.9"><h3 class="spot-name">Dakhla</h3><span class="spot-country">Morocco</span></div>
            <div class="spot-item"><h3 class="spot-name">Atlantis</h3></div>
            <div class="spot-item"><span class="spot-country">broken</span></div>
            "#,
        );
        let store = MemoryStore {
            fail_seed: true,
            ..Default::default()
        };
        let p = pipeline(
            TableLookup::with("Tarifa, Spain kitesurfing spot", 36.0128, -5.6012),
            store,
            fetcher,
        );

        let report = p.run_once().await;

        assert_eq!(
            report,
            RunReport {
                sources_fetched: 1,
                sources_failed: 1,
                candidates: 3,
                inserted: 2,
                duplicates: 0,
                not_geocoded: 1,
                failed: 0,
            }
        );
        let mut names: Vec<_> = p.store.inserted().into_iter().map(|r| r.name).collect();
        names.sort();
        assert_eq!(names, vec!["Dakhla", "Tarifa"]);
    }
}
