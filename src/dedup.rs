//! In-memory duplicate detection keyed on normalized `name_country`.

use crate::models::ExistingSpot;
use crate::store::SpotStore;
use crate::utils::spot_key;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use tracing::{error, info, instrument};

/// Set of normalized keys for spots known to exist in the destination table.
///
/// Keys are only ever added during a run, except when a claimed insert fails
/// and the claim is handed back with [`DuplicateFilter::release`].
#[derive(Debug, Default)]
pub struct DuplicateFilter {
    keys: Mutex<HashSet<String>>,
}

impl DuplicateFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from rows already in the table.
    pub fn from_existing<'a>(rows: impl IntoIterator<Item = &'a ExistingSpot>) -> Self {
        let filter = Self::new();
        for row in rows {
            filter.register(&row.name, row.country.as_deref().unwrap_or(""));
        }
        filter
    }

    /// Read every stored spot once and build the filter from it.
    ///
    /// A store that cannot be read yields an empty filter; the run carries on
    /// and relies on the store's own uniqueness check.
    #[instrument(level = "info", skip_all)]
    pub async fn seed<S: SpotStore>(store: &S) -> Self {
        match store.existing_spots().await {
            Ok(rows) => {
                let filter = Self::from_existing(&rows);
                info!(count = filter.len(), "Loaded existing spot keys");
                filter
            }
            Err(e) => {
                error!(error = %e, "Failed to load existing spots; assuming none exist");
                Self::new()
            }
        }
    }

    pub fn exists(&self, name: &str, country: &str) -> bool {
        self.lock().contains(&spot_key(name, country))
    }

    pub fn register(&self, name: &str, country: &str) {
        self.lock().insert(spot_key(name, country));
    }

    /// Atomically check and register a key.
    ///
    /// Returns `true` when the caller now owns the key, `false` when it was
    /// already present.
    pub fn claim(&self, name: &str, country: &str) -> bool {
        self.lock().insert(spot_key(name, country))
    }

    /// Give back a key taken with [`DuplicateFilter::claim`] whose insert did not land.
    pub fn release(&self, name: &str, country: &str) {
        self.lock().remove(&spot_key(name, country));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        // The set stays consistent even if a holder panicked mid-insert.
        self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
