//! Rotten Tomatoes TV series pages (web-component markup, rendered in a browser).
//!
//! Scores live in `<rt-text slot="...">` children of `<media-scorecard>` and
//! `<media-scorecard-overlay>`. The release year has no single reliable home,
//! so it is resolved through [`YEAR_FALLBACKS`], tried strictly in order.

use std::sync::LazyLock;

use html_scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use super::{RatingsExtractor, RatingsSource, find_year, parse_count, parse_score, select_text, visible_text};
use crate::error::ScraperError;
use crate::ratings::RatingRecord;

pub const BASE_URL: &str = "https://www.rottentomatoes.com/";

/// Element whose presence means the scorecard has rendered.
pub const CONTENT_MARKER: &str = "media-scorecard";

static METADATA_PROP: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"rt-text[slot="metadataProp"]"#).unwrap());
static YEAR_SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"span[slot="year"]"#).unwrap());
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static SCORECARD: LazyLock<Selector> = LazyLock::new(|| Selector::parse(CONTENT_MARKER).unwrap());
static CRITICS_SCORE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"rt-text[slot="criticsScore"]"#).unwrap());
static AUDIENCE_SCORE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"rt-text[slot="audienceScore"]"#).unwrap());
static OVERLAY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("media-scorecard-overlay").unwrap());
static FRESH_COUNT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"rt-text[slot="criticsFreshCount"]"#).unwrap());
static ROTTEN_COUNT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"rt-text[slot="criticsRottenCount"]"#).unwrap());

/// One step of the release-year fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearSource {
    /// First `rt-text[slot=metadataProp]` containing a year token
    MetadataProp,
    /// `span[slot=year]`, parsed whole
    YearSlot,
    /// Year token in `<title>`
    DocumentTitle,
    /// First year token anywhere in the visible text
    VisibleText,
}

/// Release-year strategies in priority order. The first to yield a value wins.
pub const YEAR_FALLBACKS: [YearSource; 4] = [
    YearSource::MetadataProp,
    YearSource::YearSlot,
    YearSource::DocumentTitle,
    YearSource::VisibleText,
];

impl YearSource {
    fn resolve(self, doc: &Html) -> Option<i32> {
        match self {
            Self::MetadataProp => doc
                .select(&METADATA_PROP)
                .find_map(|prop| find_year(&prop.text().collect::<String>())),
            Self::YearSlot => select_text(doc.root_element(), &YEAR_SPAN)?.parse().ok(),
            Self::DocumentTitle => find_year(&select_text(doc.root_element(), &TITLE)?),
            Self::VisibleText => find_year(&visible_text(doc)),
        }
    }
}

/// Resolve the release year, returning which fallback step produced it.
pub fn resolve_year(doc: &Html) -> Option<(YearSource, i32)> {
    YEAR_FALLBACKS
        .iter()
        .find_map(|step| step.resolve(doc).map(|year| (*step, year)))
}

/// Rotten Tomatoes series pages live at `tv/<slug>/` with underscore slugs.
#[derive(Debug, Clone)]
pub struct RottenTomatoes {
    base_url: Url,
}

impl Default for RottenTomatoes {
    fn default() -> Self {
        Self {
            base_url: Url::parse(BASE_URL).expect("valid Rotten Tomatoes base URL"),
        }
    }
}

impl RottenTomatoes {
    pub fn new(base_url: &str) -> Result<Self, ScraperError> {
        Ok(Self {
            base_url: super::parse_base_url(base_url)?,
        })
    }

    /// Fresh plus rotten review counts. A missing or unparsable counter counts as 0.
    fn parse_critic_count(doc: &Html) -> Option<u32> {
        let overlay = doc.select(&OVERLAY).next()?;
        let counter = |selector: &Selector| {
            select_text(overlay, selector)
                .and_then(|t| parse_count(&t))
                .unwrap_or(0)
        };
        counter(&FRESH_COUNT).checked_add(counter(&ROTTEN_COUNT))
    }
}

impl RatingsExtractor for RottenTomatoes {
    fn extract(&self, html: &str) -> RatingRecord {
        let doc = Html::parse_document(html);
        let mut ratings = RatingRecord::default();

        match resolve_year(&doc) {
            Some((step, year)) => {
                debug!(?step, year, "Resolved release year");
                ratings.year = Some(year);
            }
            None => debug!(
                head = html.chars().take(500).collect::<String>(),
                "Could not extract year"
            ),
        }

        if let Some(card) = doc.select(&SCORECARD).next() {
            ratings.critic_score = select_text(card, &CRITICS_SCORE).and_then(|t| parse_score(&t));
            ratings.user_score = select_text(card, &AUDIENCE_SCORE).and_then(|t| parse_score(&t));
        }

        ratings.critic_count = Self::parse_critic_count(&doc);
        ratings
    }
}

impl RatingsSource for RottenTomatoes {
    const NAME: &'static str = "Rotten Tomatoes";
    const SEPARATOR: char = '_';

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn page_path(&self, slug: &str) -> String {
        format!("tv/{slug}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
<html><head><title>Game of Thrones | Rotten Tomatoes</title></head>
<body>
  <media-scorecard>
    <rt-text slot="criticsScore">89%</rt-text>
    <rt-text slot="audienceScore">93%</rt-text>
    <rt-text slot="metadataProp">TV-MA</rt-text>
    <rt-text slot="metadataProp">2011</rt-text>
  </media-scorecard>
  <media-scorecard-overlay>
    <rt-text slot="criticsFreshCount">178</rt-text>
    <rt-text slot="criticsRottenCount">22</rt-text>
  </media-scorecard-overlay>
</body></html>
"#;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn test_extract_fixture() {
        let record = RottenTomatoes::default().extract(FIXTURE);
        assert_eq!(
            record,
            RatingRecord {
                critic_score: Some(89.0),
                critic_count: Some(200),
                user_score: Some(93.0),
                user_count: None,
                year: Some(2011),
            }
        );
    }

    // --- year fallback chain ---

    #[test]
    fn test_year_from_metadata_prop_wins() {
        let html = r#"<title>Show (1999)</title>
            <span slot="year">2005</span>
            <rt-text slot="metadataProp">Drama, 2011</rt-text>"#;
        assert_eq!(resolve_year(&doc(html)), Some((YearSource::MetadataProp, 2011)));
    }

    #[test]
    fn test_year_from_year_slot() {
        let html = r#"<title>Show (1999)</title>
            <rt-text slot="metadataProp">TV-14</rt-text>
            <span slot="year"> 2005 </span>"#;
        assert_eq!(resolve_year(&doc(html)), Some((YearSource::YearSlot, 2005)));
    }

    #[test]
    fn test_year_from_title() {
        let html = r#"<html><head><title>Show (1999) - Rotten Tomatoes</title></head>
            <body><span slot="year">n/a</span><p>2004</p></body></html>"#;
        assert_eq!(resolve_year(&doc(html)), Some((YearSource::DocumentTitle, 1999)));
    }

    #[test]
    fn test_year_from_visible_text() {
        let html = r#"<html><head><title>Show</title><script>var x = 1987;</script></head>
            <body><p>First aired in 2004 on HBO</p></body></html>"#;
        assert_eq!(resolve_year(&doc(html)), Some((YearSource::VisibleText, 2004)));
    }

    #[test]
    fn test_year_absent_everywhere() {
        let html = r#"<html><head><title>Show</title></head><body><p>No dates</p></body></html>"#;
        assert_eq!(resolve_year(&doc(html)), None);
        assert_eq!(RottenTomatoes::default().extract(html).year, None);
    }

    // --- critic count ---

    #[test]
    fn test_missing_counter_counts_as_zero() {
        let html = r#"<media-scorecard-overlay>
            <rt-text slot="criticsFreshCount">41</rt-text>
        </media-scorecard-overlay>"#;
        assert_eq!(RottenTomatoes::default().extract(html).critic_count, Some(41));
    }

    #[test]
    fn test_unparsable_counter_counts_as_zero() {
        let html = r#"<media-scorecard-overlay>
            <rt-text slot="criticsFreshCount">--</rt-text>
            <rt-text slot="criticsRottenCount">1,002</rt-text>
        </media-scorecard-overlay>"#;
        assert_eq!(RottenTomatoes::default().extract(html).critic_count, Some(1002));
    }

    #[test]
    fn test_overflowing_counters_leave_count_absent() {
        let html = format!(
            r#"<media-scorecard-overlay>
            <rt-text slot="criticsFreshCount">{max}</rt-text>
            <rt-text slot="criticsRottenCount">1</rt-text>
        </media-scorecard-overlay>"#,
            max = u32::MAX
        );
        assert_eq!(RottenTomatoes::default().extract(&html).critic_count, None);
    }

    #[test]
    fn test_no_overlay_means_no_count() {
        let html = r#"<media-scorecard><rt-text slot="criticsScore">75%</rt-text></media-scorecard>"#;
        let record = RottenTomatoes::default().extract(html);
        assert_eq!(record.critic_score, Some(75.0));
        assert_eq!(record.user_score, None);
        assert_eq!(record.critic_count, None);
    }

    #[test]
    fn test_scores_outside_scorecard_ignored() {
        let html = r#"<rt-text slot="criticsScore">75%</rt-text>"#;
        assert_eq!(RottenTomatoes::default().extract(html).critic_score, None);
    }

    #[test]
    fn test_page_path_has_trailing_slash() {
        let source = RottenTomatoes::default();
        assert_eq!(
            source.base_url().join(&source.page_path("the_boys")).unwrap().as_str(),
            "https://www.rottentomatoes.com/tv/the_boys/"
        );
    }
}
