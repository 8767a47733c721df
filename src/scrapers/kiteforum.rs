//! Kiteforum spot directory.
//!
//! The directory page lists every spot as a `.spot-item` element carrying its
//! coordinates as `data-lat` / `data-lng` attributes:
//!
//! ```html
//! <div class="spot-item" data-lat="36.01" data-lng="-5.60">
//!   <h3 class="spot-name">Tarifa</h3>
//!   <span class="spot-country">Spain</span>
//!   <p class="spot-description">Levante and Poniente ...</p>
//! </div>
//! ```

use super::{CandidateError, SpotParser, attr_f64, collect_each, first_text};
use crate::models::SpotCandidate;
use scraper::{Html, Selector};
use std::error::Error;

pub const SOURCE_ID: &str = "kiteforum";
pub const URL: &str = "https://www.kiteforum.com/spots";

#[derive(Debug, Default)]
pub struct KiteforumParser;

impl SpotParser for KiteforumParser {
    fn source(&self) -> &'static str {
        SOURCE_ID
    }

    fn extract(
        &self,
        document: &Html,
        source_url: &str,
    ) -> Result<Vec<SpotCandidate>, Box<dyn Error>> {
        let item_selector = Selector::parse(".spot-item, div.spot")?;
        let name_selector = Selector::parse(".spot-name")?;
        let country_selector = Selector::parse(".spot-country")?;
        let description_selector = Selector::parse(".spot-description")?;

        Ok(collect_each(SOURCE_ID, document.select(&item_selector), |item| {
            let name = first_text(&item, &name_selector)
                .ok_or(CandidateError::MissingElement(".spot-name"))?;
            let country = first_text(&item, &country_selector).unwrap_or_default();

            let mut candidate = SpotCandidate::new(name, country, SOURCE_ID, source_url);
            candidate.description = first_text(&item, &description_selector);
            candidate.latitude = attr_f64(&item, &["data-lat", "data-latitude"]);
            candidate.longitude = attr_f64(&item, &["data-lng", "data-longitude"]);
            Ok(Some(candidate))
        }))
    }
}
