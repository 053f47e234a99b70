//! Ratings scraping: title normalization, crawl policy, fetch, extract and
//! year reconciliation.
//!
//! A [`Scraper`] pairs one [`RatingsSource`] with one [`FetchTransport`]. Each
//! `get_ratings` call walks a small state machine: try the plain title slug,
//! and if the page is missing or belongs to a different year, try once more
//! with the expected year appended to the slug.

pub mod policy;
pub mod slug;
pub mod sources;
pub mod transport;

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::ScraperError;
use crate::ratings::RatingRecord;
use policy::AccessPolicy;
use slug::slugify;
use sources::{Metacritic, RatingsSource, RottenTomatoes};
use transport::{BrowserOptions, BrowserTransport, FetchTransport, HttpTransport};

/// Reconciliation states for a single `get_ratings` call.
#[derive(Debug, Clone, PartialEq)]
enum State {
    Start,
    TryPrimary(String),
    TryRetry(String),
    Success(RatingRecord),
    Failed,
}

/// Result of one policy-check/fetch/extract/compare pass.
#[derive(Debug, Clone, PartialEq)]
enum Attempt {
    Matched(RatingRecord),
    /// Crawl policy forbids the path; terminal, never retried
    Denied,
    /// Transport returned nothing
    NotFetched,
    YearMismatch,
    YearMissing,
}

/// Slug for the retry attempt: the primary slug with the expected year appended.
pub fn retry_slug(primary: &str, sep: char, year: i32) -> String {
    format!("{primary}{sep}{year}")
}

/// Scraper for one rating site.
pub struct Scraper<S, T> {
    source: S,
    transport: T,
    policy: AccessPolicy,
}

/// Metacritic over plain HTTP.
pub type MetacriticScraper = Scraper<Metacritic, HttpTransport>;

/// Rotten Tomatoes over a shared browser session.
pub type RottenTomatoesScraper = Scraper<RottenTomatoes, Arc<BrowserTransport>>;

impl<S: RatingsSource, T: FetchTransport> Scraper<S, T> {
    pub fn new(source: S, transport: T, policy: AccessPolicy) -> Self {
        Self {
            source,
            transport,
            policy,
        }
    }

    /// Build a scraper, loading the site's crawl policy with `client`.
    pub async fn connect(source: S, transport: T, client: &reqwest::Client) -> Self {
        let policy = AccessPolicy::load(client, source.base_url()).await;
        Self::new(source, transport, policy)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch ratings for `title`, accepting only a page whose release year is `year`.
    ///
    /// Returns `None` for an empty title, a policy denial, or when neither the
    /// primary nor the year-suffixed slug yields a page for `year`.
    pub async fn get_ratings(&self, title: &str, year: i32) -> Option<RatingRecord> {
        let mut state = State::Start;
        loop {
            state = match state {
                State::Start => {
                    let title = title.trim();
                    if title.is_empty() {
                        error!(source = S::NAME, "Series title cannot be empty");
                        State::Failed
                    } else {
                        let primary = slugify(title, S::SEPARATOR);
                        if primary.is_empty() {
                            warn!(source = S::NAME, title, "Title has no URL-safe characters");
                            State::Failed
                        } else {
                            State::TryPrimary(primary)
                        }
                    }
                }
                State::TryPrimary(primary) => match self.attempt(&primary, year).await {
                    Attempt::Matched(record) => State::Success(record),
                    Attempt::Denied => State::Failed,
                    _ => {
                        let retry = retry_slug(&primary, S::SEPARATOR, year);
                        info!(source = S::NAME, slug = %retry, "Retrying with year-suffixed slug");
                        State::TryRetry(retry)
                    }
                },
                State::TryRetry(retry) => match self.attempt(&retry, year).await {
                    Attempt::Matched(record) => State::Success(record),
                    _ => State::Failed,
                },
                State::Success(record) => return Some(record),
                State::Failed => return None,
            };
        }
    }

    async fn attempt(&self, slug: &str, year: i32) -> Attempt {
        let url = match self.page_url(slug) {
            Ok(url) => url,
            Err(e) => {
                warn!(source = S::NAME, slug, error = %e, "Cannot build page URL");
                return Attempt::NotFetched;
            }
        };

        if !self.policy.is_allowed(self.transport.user_agent(), url.path()) {
            warn!(source = S::NAME, url = %url, "Scraping disallowed by robots.txt");
            return Attempt::Denied;
        }

        let Some(html) = self.transport.fetch(&url).await else {
            return Attempt::NotFetched;
        };

        let record = self.source.extract(&html);
        match record.year {
            Some(found) if found == year => Attempt::Matched(record),
            Some(found) => {
                warn!(source = S::NAME, slug, expected = year, found, "Year mismatch");
                Attempt::YearMismatch
            }
            None => {
                if self.source.missing_year_is_mismatch() {
                    warn!(source = S::NAME, slug, expected = year, "Year mismatch: no year on page");
                } else {
                    debug!(source = S::NAME, slug, expected = year, "No year on page");
                }
                Attempt::YearMissing
            }
        }
    }

    fn page_url(&self, slug: &str) -> Result<Url, url::ParseError> {
        self.source.base_url().join(&self.source.page_path(slug))
    }
}

impl MetacriticScraper {
    /// Metacritic scraper with an HTTP transport configured from `config`.
    ///
    /// The request delay is raised to the site's `Crawl-delay` when that is longer.
    pub async fn from_config(config: &Config) -> Result<Self, ScraperError> {
        let source = Metacritic::new(&config.metacritic_base_url)?;
        let transport = HttpTransport::new(
            &config.user_agent,
            config.request_delay,
            config.http_timeout,
        )?;
        let policy = AccessPolicy::load(transport.client(), source.base_url()).await;
        let transport = match policy.crawl_delay(&config.user_agent) {
            Some(delay) => transport.with_min_delay(delay),
            None => transport,
        };
        Ok(Self::new(source, transport, policy))
    }
}

impl RottenTomatoesScraper {
    /// Rotten Tomatoes scraper on an existing browser session.
    ///
    /// The crawl policy is fetched over plain HTTP.
    pub async fn from_config(
        config: &Config,
        browser: Arc<BrowserTransport>,
    ) -> Result<Self, ScraperError> {
        let source = RottenTomatoes::new(&config.rotten_tomatoes_base_url)?;
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.http_timeout)
            .build()
            .map_err(ScraperError::HttpClient)?;
        Ok(Self::connect(source, browser, &client).await)
    }
}

/// Browser options for Rotten Tomatoes built from `config`.
pub fn rotten_tomatoes_browser(config: &Config) -> BrowserOptions {
    BrowserOptions {
        executable: config.chrome_driver.clone(),
        profile_dir: config.selenium_profile_dir.clone(),
        user_agent: config.user_agent.clone(),
        ready_selector: sources::rotten_tomatoes::CONTENT_MARKER.to_string(),
        content_timeout: config.content_timeout,
    }
}
