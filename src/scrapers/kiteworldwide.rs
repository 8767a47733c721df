//! Kiteworldwide spot guide.
//!
//! Each spot is an `<article>` card with a title heading, an optional country
//! label and a teaser paragraph. When the label is missing the country is
//! split out of the title instead.

use super::{CandidateError, Heuristics, SpotParser, collect_each, first_text};
use crate::models::SpotCandidate;
use crate::utils::element_text;
use scraper::{Html, Selector};
use std::error::Error;
use std::sync::Arc;

pub const SOURCE_ID: &str = "kiteworldwide";
pub const URL: &str = "https://www.kiteworldwide.com/en/kitesurf-spots";

#[derive(Debug)]
pub struct KiteworldwideParser {
    heuristics: Arc<Heuristics>,
}

impl KiteworldwideParser {
    pub fn new(heuristics: Arc<Heuristics>) -> Self {
        Self { heuristics }
    }
}

impl SpotParser for KiteworldwideParser {
    fn source(&self) -> &'static str {
        SOURCE_ID
    }

    fn extract(
        &self,
        document: &Html,
        source_url: &str,
    ) -> Result<Vec<SpotCandidate>, Box<dyn Error>> {
        let article_selector = Selector::parse("article")?;
        let title_selector = Selector::parse(".entry-title, h2, h3")?;
        let country_selector = Selector::parse(".country, .spot-country")?;
        let teaser_selector = Selector::parse(".entry-summary, .excerpt, p")?;

        Ok(collect_each(SOURCE_ID, document.select(&article_selector), |article| {
            let title = article
                .select(&title_selector)
                .next()
                .map(|t| element_text(&t))
                .ok_or(CandidateError::MissingElement("article title"))?;
            if self.heuristics.is_generic_heading(&title) {
                return Ok(None);
            }

            let (name, split_country) = self.heuristics.split_title(&title);
            if name.is_empty() {
                return Err(CandidateError::EmptyName);
            }
            let country = article
                .value()
                .attr("data-country")
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .or_else(|| first_text(&article, &country_selector))
                .unwrap_or(split_country);

            let mut candidate = SpotCandidate::new(name, country, SOURCE_ID, source_url);
            candidate.description = first_text(&article, &teaser_selector);
            Ok(Some(candidate))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> KiteworldwideParser {
        KiteworldwideParser::new(Arc::new(Heuristics::default()))
    }

    #[test]
    fn test_articles_become_spots() {
        let page = r#"
            <main>
              <article data-country="Brazil">
                <h2 class="entry-title">Cumbuco</h2>
                <div class="entry-summary"><p>Steady side-onshore wind.</p></div>
              </article>
              <article>
                <h2 class="entry-title">Dakhla - Morocco</h2>
                <p>Flat water lagoon.</p>
              </article>
              <article>
                <h3>El Gouna</h3>
                <span class="country">Egypt</span>
              </article>
            </main>
        "#;

        let spots = parser().parse(page, URL);
        assert_eq!(spots.len(), 3);

        assert_eq!((spots[0].name.as_str(), spots[0].country.as_str()), ("Cumbuco", "Brazil"));
        assert_eq!(spots[0].description.as_deref(), Some("Steady side-onshore wind."));

        assert_eq!((spots[1].name.as_str(), spots[1].country.as_str()), ("Dakhla", "Morocco"));
        assert_eq!(spots[1].description.as_deref(), Some("Flat water lagoon."));

        assert_eq!((spots[2].name.as_str(), spots[2].country.as_str()), ("El Gouna", "Egypt"));
        assert_eq!(spots[2].description, None);
    }

    #[test]
    fn test_article_without_title_is_skipped() {
        let page = r#"
            <article><p>Sponsored content</p></article>
            <article><h2>Prea, Brazil</h2></article>
            <article><h2>How to pick a spot</h2></article>
        "#;

        let spots = parser().parse(page, URL);
        assert_eq!(spots.len(), 1);
        assert_eq!(spots[0].name, "Prea");
        assert_eq!(spots[0].country, "Brazil");
    }
}
