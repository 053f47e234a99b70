//! Stateless HTTP transport for static pages.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};
use url::Url;

use super::FetchTransport;
use crate::error::{FetchError, ScraperError};
use crate::utils::{fmt_duration, log_if_slow};

/// Default pause after each successful fetch.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(1);

/// Default per-request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on how far a site's `Crawl-delay` may raise the request delay.
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(60);

const SLOW_FETCH: Duration = Duration::from_secs(5);

/// One GET per call with a fixed user agent.
///
/// After a successful fetch the transport sleeps for its politeness delay
/// before returning, so sequential callers never hit the host faster than
/// one page per delay.
pub struct HttpTransport {
    http: reqwest::Client,
    user_agent: String,
    delay: Duration,
}

impl HttpTransport {
    pub fn new(user_agent: &str, delay: Duration, timeout: Duration) -> Result<Self, ScraperError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(ScraperError::HttpClient)?;

        Ok(Self {
            http,
            user_agent: user_agent.to_string(),
            delay,
        })
    }

    /// The underlying client, shared with robots.txt loading.
    pub fn client(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Raise the politeness delay to at least `minimum` (e.g. a site's `Crawl-delay`).
    ///
    /// Never lowers the delay. `minimum` is clamped to [`MAX_CRAWL_DELAY`].
    pub fn with_min_delay(mut self, minimum: Duration) -> Self {
        if minimum > MAX_CRAWL_DELAY {
            warn!(
                requested = fmt_duration(minimum),
                max = fmt_duration(MAX_CRAWL_DELAY),
                "Crawl-delay too long; capping"
            );
        }
        let minimum = minimum.min(MAX_CRAWL_DELAY);
        if minimum > self.delay {
            info!(
                from = fmt_duration(self.delay),
                to = fmt_duration(minimum),
                "Raising request delay to honour Crawl-delay"
            );
            self.delay = minimum;
        }
        self
    }

    async fn try_fetch(&self, url: &Url) -> Result<String, FetchError> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl FetchTransport for HttpTransport {
    async fn fetch(&self, url: &Url) -> Option<String> {
        info!(url = %url, "Fetching");
        let start = Instant::now();

        match self.try_fetch(url).await {
            Ok(body) => {
                log_if_slow(start, SLOW_FETCH, url.as_str());
                debug!(url = %url, bytes = body.len(), "Fetched page");
                tokio::time::sleep(self.delay).await;
                Some(body)
            }
            Err(e) => {
                error!(url = %url, error = ?e, "Error fetching page");
                None
            }
        }
    }

    fn user_agent(&self) -> &str {
        &self.user_agent
    }
}
