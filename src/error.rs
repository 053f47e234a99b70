//! Error types for scraper construction, page fetching and record validation.

use std::path::PathBuf;

/// Construction-time failures. These abort building a scraper and are never retried.
#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("browser executable not found at {}", .0.display())]
    DriverNotFound(PathBuf),
    #[error("no browser executable configured; set CHROME_DRIVER or pass a path explicitly")]
    DriverNotConfigured,
    #[error("invalid base URL {url:?}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid browser configuration: {0}")]
    BrowserConfig(String),
    #[error("failed to launch browser session")]
    BrowserLaunch(#[source] chromiumoxide::error::CdpError),
    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

/// A single fetch attempt failed.
///
/// Transports log these and hand `None` to the caller; they never cross the
/// [`FetchTransport`](crate::scraper::transport::FetchTransport) boundary.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("content marker {selector:?} did not appear within {timeout_secs:.1}s")]
    Timeout { selector: String, timeout_secs: f64 },
    #[error("browser driver fault")]
    Driver(#[from] chromiumoxide::error::CdpError),
}

/// A raw rating record violated the downstream record contract.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("year {year} outside [{min}, {max}]")]
    YearOutOfRange { year: i32, min: i32, max: i32 },
    #[error("{field} is not a finite number")]
    NonFiniteScore { field: &'static str },
}
