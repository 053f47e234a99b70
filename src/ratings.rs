//! Rating records and the downstream record validator.

use chrono::Datelike;
use serde::Serialize;
use tracing::error;

use crate::error::ValidationError;

/// Earliest year a television series can plausibly date from.
pub const FIRST_TV_YEAR: i32 = 1928;

/// Raw ratings scraped from one source page.
///
/// Every field is optional: a field whose markup is missing or malformed is
/// left `None`, never defaulted to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RatingRecord {
    pub critic_score: Option<f64>,
    pub critic_count: Option<u32>,
    pub user_score: Option<f64>,
    pub user_count: Option<u32>,
    pub year: Option<i32>,
}

/// A record that passed validation, tagged with the series it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ratings {
    pub title: String,
    pub year: i32,
    pub critic_score: Option<f64>,
    pub critic_count: Option<u32>,
    pub user_score: Option<f64>,
    pub user_count: Option<u32>,
}

/// Outcome of [`validate_ratings`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "ratings", rename_all = "lowercase")]
pub enum CheckedRatings {
    Valid(Ratings),
    /// Validation failed; the original record is passed through unchanged.
    Unvalidated(RatingRecord),
}

impl CheckedRatings {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Validate a scraped record against the current calendar year.
///
/// Fail-open: a violation is logged and the record is returned as
/// [`CheckedRatings::Unvalidated`]. Never fails.
pub fn validate_ratings(title: &str, year: i32, record: RatingRecord) -> CheckedRatings {
    validate_ratings_at(title, year, record, chrono::Utc::now().year())
}

/// [`validate_ratings`] with an explicit upper year bound.
///
/// The record's own year takes precedence over `year` when present.
pub fn validate_ratings_at(
    title: &str,
    year: i32,
    record: RatingRecord,
    current_year: i32,
) -> CheckedRatings {
    match check(year, &record, current_year) {
        Ok(year) => CheckedRatings::Valid(Ratings {
            title: title.to_string(),
            year,
            critic_score: record.critic_score,
            critic_count: record.critic_count,
            user_score: record.user_score,
            user_count: record.user_count,
        }),
        Err(e) => {
            error!(title, error = %e, "Ratings validation error");
            CheckedRatings::Unvalidated(record)
        }
    }
}

fn check(year: i32, record: &RatingRecord, current_year: i32) -> Result<i32, ValidationError> {
    let year = record.year.unwrap_or(year);
    if !(FIRST_TV_YEAR..=current_year).contains(&year) {
        return Err(ValidationError::YearOutOfRange {
            year,
            min: FIRST_TV_YEAR,
            max: current_year,
        });
    }

    for (field, score) in [
        ("critic_score", record.critic_score),
        ("user_score", record.user_score),
    ] {
        if score.is_some_and(|s| !s.is_finite()) {
            return Err(ValidationError::NonFiniteScore { field });
        }
    }

    Ok(year)
}
