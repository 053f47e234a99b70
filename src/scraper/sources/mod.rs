//! Rating sources: per-site URL conventions and HTML extraction.

pub mod metacritic;
pub mod rotten_tomatoes;

use std::sync::LazyLock;

use html_scraper::{ElementRef, Html, Node};
use regex::Regex;
use url::Url;

use crate::error::ScraperError;
use crate::ratings::RatingRecord;

pub use metacritic::Metacritic;
pub use rotten_tomatoes::RottenTomatoes;

/// Parse a page into a [`RatingRecord`].
///
/// Pure and infallible: a field whose markup is missing or malformed is left
/// `None` and does not affect the other fields.
pub trait RatingsExtractor {
    fn extract(&self, html: &str) -> RatingRecord;
}

/// Site conventions the reconciliation loop needs besides extraction.
pub trait RatingsSource: RatingsExtractor + Send + Sync {
    /// Display name used in logs.
    const NAME: &'static str;
    /// Word separator used in this site's slugs.
    const SEPARATOR: char;

    fn base_url(&self) -> &Url;

    /// Path of a series page relative to [`base_url`](Self::base_url).
    fn page_path(&self, slug: &str) -> String;

    /// Whether a page without a detectable year is reported as a year mismatch
    /// (warning) rather than a quiet miss (debug). Both outcomes retry.
    fn missing_year_is_mismatch(&self) -> bool {
        false
    }
}

/// Parse a base URL, ensuring a trailing slash so relative joins keep the full path.
pub fn parse_base_url(raw: &str) -> Result<Url, ScraperError> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&with_slash).map_err(|source| ScraperError::InvalidBaseUrl {
        url: raw.to_string(),
        source,
    })
}

/// A year in 1900..=2099 not embedded in a longer run of digits. Letters may
/// touch it (`2011Drama`, `2011年`).
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)((?:19|20)\d{2})(?:\D|$)").unwrap());

static FIRST_INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Text content of an element with whitespace runs collapsed.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First element under `scope` matching a selector, as collapsed text.
fn select_text(scope: ElementRef<'_>, selector: &html_scraper::Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// Parse a score like `"8.5"` or `"93%"`. Non-finite values count as unparsable.
fn parse_score(text: &str) -> Option<f64> {
    text.trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite())
}

/// Parse a count, ignoring thousands separators (`"1,234"` -> 1234).
fn parse_count(text: &str) -> Option<u32> {
    text.trim().replace(',', "").parse().ok()
}

/// First run of digits in `text`.
fn first_integer(text: &str) -> Option<u32> {
    FIRST_INT_RE.find(text).and_then(|m| m.as_str().parse().ok())
}

/// First year token (1900-2099) in `text`.
fn find_year(text: &str) -> Option<i32> {
    YEAR_RE.captures(text).and_then(|caps| caps[1].parse().ok())
}

/// Document text outside `<script>`, `<style>`, `<noscript>` and `<template>`.
fn visible_text(html: &Html) -> String {
    let mut out = String::new();
    for node in html.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value().as_element().is_some_and(|e| {
                matches!(e.name(), "script" | "style" | "noscript" | "template")
            })
        });
        if hidden {
            continue;
        }
        let text: &str = text;
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(trimmed);
        }
    }
    out
}
