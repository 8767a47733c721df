//! Utility functions for key normalization and text cleanup.
//!
//! This module provides helper functions used throughout the application:
//! - Normalized `name_country` keys for duplicate detection
//! - Whitespace collapsing for text pulled out of HTML
//! - String truncation for logging

use scraper::ElementRef;

/// Lowercase a string and drop every non-alphanumeric character.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize("Dom. Rep."), "domrep");
/// assert_eq!(normalize("Cabarete!"), "cabarete");
/// ```
pub fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Build the duplicate-detection key for a spot: `normalize(name) + "_" + normalize(country)`.
pub fn spot_key(name: &str, country: &str) -> String {
    format!("{}_{}", normalize(name), normalize(country))
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All text under an element, whitespace-collapsed.
pub fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_case_and_punctuation() {
        assert_eq!(normalize("Cabarete!"), "cabarete");
        assert_eq!(normalize("Dom. Rep."), "domrep");
        assert_eq!(normalize("Dom. Rep."), normalize("domrep"));
        assert_eq!(normalize("  Le-Morne  "), "lemorne");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for s in ["Cabarete!", "Dominican Republic", "Cumbuco (Ceará)", ""] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_spot_key() {
        assert_eq!(
            spot_key("Cabarete", "Dominican Republic"),
            "cabarete_dominicanrepublic"
        );
        assert_eq!(spot_key("Tarifa", ""), "tarifa_");
        assert_eq!(
            spot_key("Cabarete!", "Dom. Rep."),
            spot_key("cabarete", "domrep")
        );
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Kite \n\t Beach  "), "Kite Beach");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let result = truncate_for_log("Ceará Ceará", 4);
        assert_eq!(result, "Cear…(+9 bytes)");
    }
}
