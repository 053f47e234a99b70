//! Metacritic TV series pages (static HTML).

use std::sync::LazyLock;

use html_scraper::{ElementRef, Html, Selector};
use regex::Regex;
use tracing::debug;
use url::Url;

use super::{RatingsExtractor, RatingsSource, first_integer, parse_count, parse_score, select_text};
use crate::error::ScraperError;
use crate::ratings::RatingRecord;

pub const BASE_URL: &str = "https://www.metacritic.com/";

static HERO_METADATA: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[data-testid="hero-metadata"] li"#).unwrap());
static SPAN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());
static CRITIC_INFO: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[data-testid="critic-score-info"]"#).unwrap());
static USER_INFO: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[data-testid="user-score-info"]"#).unwrap());
static SCORE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.c-siteReviewScore span").unwrap());
static CRITIC_PATH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[data-testid="critic-path"]"#).unwrap());
static USER_PATH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[data-testid="user-path"]"#).unwrap());

static USER_RATINGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Based on ([\d,]+) User Ratings").unwrap());

/// Metacritic series pages live at `tv/<slug>` with hyphenated slugs.
#[derive(Debug, Clone)]
pub struct Metacritic {
    base_url: Url,
}

impl Default for Metacritic {
    fn default() -> Self {
        Self {
            base_url: Url::parse(BASE_URL).expect("valid Metacritic base URL"),
        }
    }
}

impl Metacritic {
    pub fn new(base_url: &str) -> Result<Self, ScraperError> {
        Ok(Self {
            base_url: super::parse_base_url(base_url)?,
        })
    }

    /// Release year from the first hero metadata item.
    fn parse_year(doc: &Html) -> Option<i32> {
        let item = doc.select(&HERO_METADATA).next()?;
        select_text(item, &SPAN)?.parse().ok()
    }

    /// Score inside a `critic-score-info`/`user-score-info` block.
    fn parse_block_score(block: ElementRef<'_>) -> Option<f64> {
        parse_score(&select_text(block, &SCORE)?)
    }

    /// Critic review count from the "Based on N Critic Reviews" link.
    fn parse_critic_count(block: ElementRef<'_>) -> Option<u32> {
        first_integer(&select_text(block, &CRITIC_PATH)?)
    }

    /// User rating count from the "Based on N User Ratings" link.
    fn parse_user_count(block: ElementRef<'_>) -> Option<u32> {
        let text = select_text(block, &USER_PATH)?;
        let caps = USER_RATINGS_RE.captures(&text)?;
        parse_count(&caps[1])
    }
}

impl RatingsExtractor for Metacritic {
    fn extract(&self, html: &str) -> RatingRecord {
        let doc = Html::parse_document(html);
        let mut ratings = RatingRecord {
            year: Self::parse_year(&doc),
            ..Default::default()
        };

        if ratings.year.is_none() {
            debug!(
                head = html.chars().take(500).collect::<String>(),
                "Could not extract year"
            );
        }

        if let Some(critic) = doc.select(&CRITIC_INFO).next() {
            ratings.critic_score = Self::parse_block_score(critic);
            ratings.critic_count = Self::parse_critic_count(critic);
        }

        if let Some(user) = doc.select(&USER_INFO).next() {
            ratings.user_score = Self::parse_block_score(user);
            ratings.user_count = Self::parse_user_count(user);
        }

        ratings
    }
}

impl RatingsSource for Metacritic {
    const NAME: &'static str = "Metacritic";
    const SEPARATOR: char = '-';

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn page_path(&self, slug: &str) -> String {
        format!("tv/{slug}")
    }

    fn missing_year_is_mismatch(&self) -> bool {
        true
    }
}
