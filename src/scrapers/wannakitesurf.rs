//! Wannakitesurf spot listing.
//!
//! The listing renders `.spot-card` elements. Older and regional variants of
//! the page only have plain `<h2>` headings, in which case the heading
//! heuristic takes over.

use super::{CandidateError, Heuristics, SpotParser, collect_each, first_text, heading_candidates};
use crate::models::SpotCandidate;
use scraper::{Html, Selector};
use std::error::Error;
use std::sync::Arc;
use tracing::debug;

pub const SOURCE_ID: &str = "wannakitesurf";
pub const URL: &str = "https://www.wannakitesurf.com/spots";

#[derive(Debug)]
pub struct WannakitesurfParser {
    heuristics: Arc<Heuristics>,
}

impl WannakitesurfParser {
    pub fn new(heuristics: Arc<Heuristics>) -> Self {
        Self { heuristics }
    }
}

impl SpotParser for WannakitesurfParser {
    fn source(&self) -> &'static str {
        SOURCE_ID
    }

    fn extract(
        &self,
        document: &Html,
        source_url: &str,
    ) -> Result<Vec<SpotCandidate>, Box<dyn Error>> {
        let card_selector = Selector::parse(".spot-card")?;
        let title_selector = Selector::parse(".spot-card__title")?;
        let country_selector = Selector::parse(".spot-card__country")?;
        let text_selector = Selector::parse(".spot-card__text")?;

        if document.select(&card_selector).next().is_none() {
            debug!("No spot cards; using heading fallback");
            let headings = Selector::parse("h2")?;
            return Ok(heading_candidates(
                document.select(&headings),
                &self.heuristics,
                SOURCE_ID,
                source_url,
            ));
        }

        Ok(collect_each(SOURCE_ID, document.select(&card_selector), |card| {
            let name = first_text(&card, &title_selector)
                .ok_or(CandidateError::MissingElement(".spot-card__title"))?;
            let country = first_text(&card, &country_selector).unwrap_or_default();

            let mut candidate = SpotCandidate::new(name, country, SOURCE_ID, source_url);
            candidate.description = first_text(&card, &text_selector);
            Ok(Some(candidate))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> WannakitesurfParser {
        WannakitesurfParser::new(Arc::new(Heuristics::default()))
    }

    #[test]
    fn test_cards() {
        let page = r#"
            <section>
              <div class="spot-card">
                <h3 class="spot-card__title">Cabarete</h3>
                <span class="spot-card__country">Dominican Republic</span>
                <p class="spot-card__text">Kite Beach and Encuentro.</p>
              </div>
              <div class="spot-card"><img src="ad.png"></div>
              <div class="spot-card">
                <h3 class="spot-card__title">Paracas</h3>
                <span class="spot-card__country">Peru</span>
              </div>
              <h2>What to pack</h2>
            </section>
        "#;

        let spots = parser().parse(page, URL);
        assert_eq!(spots.len(), 2);
        assert_eq!(spots[0].name, "Cabarete");
        assert_eq!(spots[0].country, "Dominican Republic");
        assert_eq!(spots[0].description.as_deref(), Some("Kite Beach and Encuentro."));
        assert_eq!(spots[1].name, "Paracas");
        assert_eq!(spots[1].description, None);
    }

    #[test]
    fn test_heading_fallback() {
        let page = r#"
            <div>
              <h2>Kite Beach in Dubai</h2>
              <p>City skyline backdrop.</p>
              <h2>When to go</h2>
              <p>November to April.</p>
            </div>
        "#;

        let spots = parser().parse(page, URL);
        assert_eq!(spots.len(), 1);
        assert_eq!(spots[0].name, "Kite Beach");
        assert_eq!(spots[0].country, "Dubai");
        assert_eq!(spots[0].description.as_deref(), Some("City skyline backdrop."));
    }
}
