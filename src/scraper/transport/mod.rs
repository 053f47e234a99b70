//! Page fetching transports.
//!
//! Both transports share one contract: `fetch` returns the page HTML or `None`.
//! Network errors, bad statuses, timeouts and driver faults are logged inside
//! the transport and never reach the reconciliation layer.

pub mod browser;
pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

pub use browser::{BrowserOptions, BrowserTransport};
pub use http::HttpTransport;

/// Default user agent sent by both transports.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[async_trait]
pub trait FetchTransport: Send + Sync {
    /// Fetch `url` and return its HTML, or `None` on any failure.
    async fn fetch(&self, url: &Url) -> Option<String>;

    /// User agent this transport identifies as, for crawl-policy checks.
    fn user_agent(&self) -> &str;
}

#[async_trait]
impl<T: FetchTransport + ?Sized> FetchTransport for Arc<T> {
    async fn fetch(&self, url: &Url) -> Option<String> {
        (**self).fetch(url).await
    }

    fn user_agent(&self) -> &str {
        (**self).user_agent()
    }
}
