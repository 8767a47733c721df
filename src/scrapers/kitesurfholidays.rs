//! Kitesurf Holidays destination overview.
//!
//! The only source publishing a skill level and a season. Destinations look like:
//!
//! ```html
//! <div class="destination" data-coordinates="-2.99,-39.04">
//!   <h3 class="destination-title">Jericoacoara, Brazil</h3>
//!   <span class="destination-level">Intermediate</span>
//!   <span class="destination-season">July, August, September</span>
//!   <p class="destination-summary">...</p>
//! </div>
//! ```

use super::{CandidateError, Heuristics, SpotParser, collect_each, first_text, parse_months};
use crate::models::SpotCandidate;
use scraper::{ElementRef, Html, Selector};
use std::error::Error;
use std::sync::Arc;

pub const SOURCE_ID: &str = "kitesurfholidays";
pub const URL: &str = "https://www.kitesurfholidays.com/destinations";

#[derive(Debug)]
pub struct KitesurfHolidaysParser {
    heuristics: Arc<Heuristics>,
}

impl KitesurfHolidaysParser {
    pub fn new(heuristics: Arc<Heuristics>) -> Self {
        Self { heuristics }
    }
}

/// `data-coordinates="lat,lng"`
fn coordinates_attr(element: &ElementRef<'_>) -> Option<(f64, f64)> {
    let raw = element.value().attr("data-coordinates")?;
    let (lat, lng) = raw.split_once(',')?;
    Some((lat.trim().parse().ok()?, lng.trim().parse().ok()?))
}

impl SpotParser for KitesurfHolidaysParser {
    fn source(&self) -> &'static str {
        SOURCE_ID
    }

    fn extract(
        &self,
        document: &Html,
        source_url: &str,
    ) -> Result<Vec<SpotCandidate>, Box<dyn Error>> {
        let destination_selector = Selector::parse(".destination")?;
        let title_selector = Selector::parse(".destination-title")?;
        let level_selector = Selector::parse(".destination-level")?;
        let season_selector = Selector::parse(".destination-season, .best-time")?;
        let summary_selector = Selector::parse(".destination-summary")?;

        Ok(collect_each(SOURCE_ID, document.select(&destination_selector), |destination| {
            let title = first_text(&destination, &title_selector)
                .ok_or(CandidateError::MissingElement(".destination-title"))?;
            let (name, country) = self.heuristics.split_title(&title);
            if name.is_empty() {
                return Err(CandidateError::EmptyName);
            }

            let mut candidate = SpotCandidate::new(name, country, SOURCE_ID, source_url);
            candidate.description = first_text(&destination, &summary_selector);
            candidate.difficulty = first_text(&destination, &level_selector);
            candidate.best_months =
                first_text(&destination, &season_selector).and_then(|s| parse_months(&s));
            if let Some((lat, lng)) = coordinates_attr(&destination) {
                candidate.latitude = Some(lat);
                candidate.longitude = Some(lng);
            }
            Ok(Some(candidate))
        }))
    }
}
