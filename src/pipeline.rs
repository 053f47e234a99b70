//! Series enrichment: run each scraper over a batch of series and validate
//! whatever comes back.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ratings::{CheckedRatings, validate_ratings};
use crate::scraper::Scraper;
use crate::scraper::sources::RatingsSource;
use crate::scraper::transport::FetchTransport;

/// A series to look up, as supplied by the upstream metadata ingestor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    pub title: String,
    pub year: i32,
}

impl FromStr for Series {
    type Err = String;

    /// Parse `Title=Year`. The last `=` separates the year, so titles may contain `=`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (title, year) = s
            .rsplit_once('=')
            .ok_or_else(|| format!("expected TITLE=YEAR, got {s:?}"))?;
        let year = year
            .trim()
            .parse()
            .map_err(|_| format!("invalid year {:?}", year.trim()))?;
        Ok(Self {
            title: title.trim().to_string(),
            year,
        })
    }
}

/// Ratings gathered for one series across all sources.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesReport {
    pub title: String,
    pub year: i32,
    pub metacritic: Option<CheckedRatings>,
    pub rotten_tomatoes: Option<CheckedRatings>,
}

impl From<&Series> for SeriesReport {
    fn from(series: &Series) -> Self {
        Self {
            title: series.title.clone(),
            year: series.year,
            metacritic: None,
            rotten_tomatoes: None,
        }
    }
}

/// Scrape every series in order, one at a time, validating each hit.
///
/// The result is index-aligned with `series`; misses are `None`.
pub async fn enrich<S, T>(scraper: &Scraper<S, T>, series: &[Series]) -> Vec<Option<CheckedRatings>>
where
    S: RatingsSource,
    T: FetchTransport,
{
    info!(source = S::NAME, count = series.len(), "Scraping series");
    let mut results = Vec::with_capacity(series.len());

    for item in series {
        info!(source = S::NAME, title = %item.title, year = item.year, "Scraping");
        let checked = match scraper.get_ratings(&item.title, item.year).await {
            Some(record) => Some(validate_ratings(&item.title, item.year, record)),
            None => {
                warn!(source = S::NAME, title = %item.title, "Failed to get ratings");
                None
            }
        };
        results.push(checked);
    }

    let found = results.iter().filter(|r| r.is_some()).count();
    info!(source = S::NAME, found, total = series.len(), "Finished scraping");
    results
}
