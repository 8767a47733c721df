//! Surfertoday "best kiteboarding spots" article.
//!
//! The article has no spot markup. Each spot is a numbered `<h2>`/`<h3>` such
//! as `"4. Cabarete, Dominican Republic"` followed by a paragraph about it, so
//! candidates come from the heading heuristic.

use super::{Heuristics, SpotParser, heading_candidates};
use crate::models::SpotCandidate;
use scraper::{Html, Selector};
use std::error::Error;
use std::sync::Arc;

pub const SOURCE_ID: &str = "surfertoday";
pub const URL: &str =
    "https://www.surfertoday.com/kiteboarding/the-best-kiteboarding-spots-in-the-world";

#[derive(Debug)]
pub struct SurfertodayParser {
    heuristics: Arc<Heuristics>,
}

impl SurfertodayParser {
    pub fn new(heuristics: Arc<Heuristics>) -> Self {
        Self { heuristics }
    }
}

impl SpotParser for SurfertodayParser {
    fn source(&self) -> &'static str {
        SOURCE_ID
    }

    fn extract(
        &self,
        document: &Html,
        source_url: &str,
    ) -> Result<Vec<SpotCandidate>, Box<dyn Error>> {
        let body_headings = Selector::parse("article h2, article h3, .article-body h2, .article-body h3")?;
        let any_heading = Selector::parse("h2, h3")?;

        // Pages without an article wrapper fall back to every heading.
        let selector = if document.select(&body_headings).next().is_some() {
            &body_headings
        } else {
            &any_heading
        };

        Ok(heading_candidates(
            document.select(selector),
            &self.heuristics,
            SOURCE_ID,
            source_url,
        ))
    }
}
