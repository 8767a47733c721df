//! Site parsers for the fixed set of kitesurfing spot sources.
//!
//! Each source has one hand-written parser tied to that site's markup. All of
//! them implement [`SpotParser`] and are looked up through the
//! [`SourceRegistry`], which also fixes the order sources are visited in.
//!
//! # Supported Sources
//!
//! | Source | Module | Strategy | Extras |
//! |--------|--------|----------|--------|
//! | Kiteforum | [`kiteforum`] | `.spot-item` listing elements | Coordinates from `data-lat`/`data-lng` |
//! | Surfertoday | [`surfertoday`] | Heading heuristic over the article body | Sibling paragraph as description |
//! | Kiteworldwide | [`kiteworldwide`] | `<article>` cards | Country label overrides the title split |
//! | Wannakitesurf | [`wannakitesurf`] | `.spot-card` listing, heading fallback | |
//! | Kitesurf Holidays | [`kitesurfholidays`] | `.destination` blocks | Difficulty, best months, coordinates |
//!
//! # Failure Handling
//!
//! A candidate element that cannot be turned into a spot is logged and
//! skipped; the rest of the page is still processed. A page that cannot be
//! processed at all yields an empty list.

pub mod kiteforum;
pub mod kitesurfholidays;
pub mod kiteworldwide;
pub mod surfertoday;
pub mod wannakitesurf;

use crate::models::SpotCandidate;
use crate::utils::{collapse_whitespace, element_text};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::error::Error;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Words marking a heading as a section header rather than a spot.
pub const DEFAULT_SKIP_WORDS: &[&str] = &["why", "how", "what", "when", "conclusion"];

/// Splits `"Name - Country"`, `"Name, Country"` and `"Name in Country"`,
/// tolerating a leading list number such as `"3."` or `"#3"`.
pub const DEFAULT_SPLIT_PATTERN: &str =
    r"^\s*(?:#?\d+[.)]?\s+)?(?P<name>.+?)(?:\s+[-–—]\s+|\s*,\s*|\s+in\s+)(?P<country>.+?)\s*$";

static LIST_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*#?\d+[.)]?\s+").expect("static regex"));

static MONTH_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(?:,|/|&|;|[-–—]|\band\b)\s*").expect("static regex"));

/// Why a single candidate element was skipped.
#[derive(Debug, Error)]
pub enum CandidateError {
    #[error("missing required element `{0}`")]
    MissingElement(&'static str),
    #[error("empty spot name")]
    EmptyName,
}

/// Tunable text heuristics shared by the heading-based parsers.
///
/// Both heuristics are lossy: a skip word matches anywhere in the heading,
/// and the split takes the first separator it finds.
#[derive(Debug, Clone)]
pub struct Heuristics {
    skip_words: Vec<String>,
    split: Regex,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            skip_words: DEFAULT_SKIP_WORDS.iter().map(|w| w.to_string()).collect(),
            split: Regex::new(DEFAULT_SPLIT_PATTERN).expect("default split pattern"),
        }
    }
}

impl Heuristics {
    /// Build heuristics from a skip-word list and a split pattern.
    ///
    /// The pattern must define `name` and `country` capture groups.
    pub fn new(skip_words: Vec<String>, split_pattern: &str) -> Result<Self, Box<dyn Error>> {
        let split = Regex::new(split_pattern)?;
        let groups: Vec<&str> = split.capture_names().flatten().collect();
        if !groups.contains(&"name") || !groups.contains(&"country") {
            return Err("split pattern needs `name` and `country` groups".into());
        }
        Ok(Self {
            skip_words: skip_words
                .into_iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
            split,
        })
    }

    /// True for headings like "Why kitesurf in Brazil?" or "Conclusion".
    pub fn is_generic_heading(&self, text: &str) -> bool {
        let lower = text.trim().to_lowercase();
        self.skip_words
            .iter()
            .any(|w| lower.starts_with(w.as_str()) || lower.contains(w.as_str()))
    }

    /// Split a heading into `(name, country)`; country is empty when no separator matches.
    pub fn split_title(&self, text: &str) -> (String, String) {
        let text = collapse_whitespace(text);
        let group = |caps: &regex::Captures<'_>, name: &str| {
            caps.name(name).map(|m| m.as_str().trim().to_string()).unwrap_or_default()
        };
        match self.split.captures(&text) {
            Some(caps) => (group(&caps, "name"), group(&caps, "country")),
            None => (LIST_NUMBER.replace(&text, "").trim().to_string(), String::new()),
        }
    }
}

/// One capability, several site-specific variants.
pub trait SpotParser {
    /// Identifier stored in each candidate's `source` field.
    fn source(&self) -> &'static str;

    /// Site-specific extraction over an already parsed document.
    fn extract(
        &self,
        document: &Html,
        source_url: &str,
    ) -> Result<Vec<SpotCandidate>, Box<dyn Error>>;

    /// Parse raw page content into candidates. Never fails; problems are logged.
    fn parse(&self, page: &str, source_url: &str) -> Vec<SpotCandidate> {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let document = Html::parse_document(page);
            self.extract(&document, source_url)
        }));

        match outcome {
            Ok(Ok(candidates)) => {
                info!(source = self.source(), count = candidates.len(), "Parsed page");
                candidates
            }
            Ok(Err(e)) => {
                error!(source = self.source(), error = %e, "Page could not be parsed");
                Vec::new()
            }
            Err(_) => {
                error!(source = self.source(), "Parser panicked; dropping page");
                Vec::new()
            }
        }
    }
}

/// Run `extract` over every element, keeping the successes.
///
/// `Ok(None)` is a deliberate skip (e.g. a generic heading); `Err` is logged.
pub fn collect_each<'a, I, F>(source: &str, elements: I, mut extract: F) -> Vec<SpotCandidate>
where
    I: IntoIterator<Item = ElementRef<'a>>,
    F: FnMut(ElementRef<'a>) -> Result<Option<SpotCandidate>, CandidateError>,
{
    let mut candidates = Vec::new();
    for (index, element) in elements.into_iter().enumerate() {
        match extract(element) {
            Ok(Some(candidate)) => {
                debug!(source, index, name = %candidate.name, "Extracted candidate");
                candidates.push(candidate);
            }
            Ok(None) => debug!(source, index, "Skipped element"),
            Err(e) => warn!(source, index, error = %e, "Skipping malformed candidate"),
        }
    }
    candidates
}

/// Candidates from heading elements: generic headings are dropped, the text is
/// split into name and country, and the next paragraph becomes the description.
pub fn heading_candidates<'a>(
    headings: impl IntoIterator<Item = ElementRef<'a>>,
    heuristics: &Heuristics,
    source: &str,
    source_url: &str,
) -> Vec<SpotCandidate> {
    collect_each(source, headings, |heading| {
        let text = element_text(&heading);
        if text.is_empty() || heuristics.is_generic_heading(&text) {
            return Ok(None);
        }
        let (name, country) = heuristics.split_title(&text);
        if name.is_empty() {
            return Err(CandidateError::EmptyName);
        }
        let mut candidate = SpotCandidate::new(name, country, source, source_url);
        candidate.description = next_paragraph(heading);
        Ok(Some(candidate))
    })
}

/// First non-empty `<p>` after `element` among its siblings, stopping at the next heading.
pub fn next_paragraph(element: ElementRef<'_>) -> Option<String> {
    for sibling in element.next_siblings().filter_map(ElementRef::wrap) {
        match sibling.value().name() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => return None,
            "p" => {
                let text = element_text(&sibling);
                if !text.is_empty() {
                    return Some(text);
                }
            }
            _ => {}
        }
    }
    None
}

/// Text of the first descendant matching `selector`, if non-empty.
pub fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .map(|e| element_text(&e))
        .find(|t| !t.is_empty())
}

/// First attribute among `names` that parses as a number.
pub fn attr_f64(element: &ElementRef<'_>, names: &[&str]) -> Option<f64> {
    names
        .iter()
        .filter_map(|n| element.value().attr(n))
        .find_map(|v| v.trim().parse().ok())
}

/// Split free text such as `"June, July & August"` into month tokens.
pub fn parse_months(text: &str) -> Option<Vec<String>> {
    let months: Vec<String> = MONTH_SEPARATORS
        .split(text.trim())
        .map(|t| t.trim().trim_end_matches('.').to_string())
        .filter(|t| !t.is_empty())
        .collect();
    (!months.is_empty()).then_some(months)
}

/// A fixed source: identifier, page URL and the parser for that page.
pub struct Source {
    pub id: &'static str,
    pub url: &'static str,
    parser: Box<dyn SpotParser>,
}

impl Source {
    pub fn new(url: &'static str, parser: Box<dyn SpotParser>) -> Self {
        Self {
            id: parser.source(),
            url,
            parser,
        }
    }

    /// Parse a page fetched from this source's URL.
    pub fn parse(&self, page: &str) -> Vec<SpotCandidate> {
        self.parser.parse(page, self.url)
    }
}

/// Ordered registry of every known source.
pub struct SourceRegistry {
    sources: Vec<Source>,
}

impl SourceRegistry {
    /// The five built-in sources in their fixed visiting order.
    pub fn builtin(heuristics: Arc<Heuristics>) -> Self {
        Self::from_sources(vec![
            Source::new(kiteforum::URL, Box::new(kiteforum::KiteforumParser)),
            Source::new(
                surfertoday::URL,
                Box::new(surfertoday::SurfertodayParser::new(Arc::clone(&heuristics))),
            ),
            Source::new(
                kiteworldwide::URL,
                Box::new(kiteworldwide::KiteworldwideParser::new(Arc::clone(&heuristics))),
            ),
            Source::new(
                wannakitesurf::URL,
                Box::new(wannakitesurf::WannakitesurfParser::new(Arc::clone(&heuristics))),
            ),
            Source::new(
                kitesurfholidays::URL,
                Box::new(kitesurfholidays::KitesurfHolidaysParser::new(heuristics)),
            ),
        ])
    }

    pub fn from_sources(sources: Vec<Source>) -> Self {
        Self { sources }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }
}
