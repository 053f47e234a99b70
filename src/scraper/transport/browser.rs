//! Headless-browser transport for pages that render their ratings client-side.
//!
//! Owns one long-lived browser session. Each fetch navigates the session's
//! page, then polls for a source-specific marker element until it appears or
//! the content timeout elapses. Navigations are serialized through a mutex.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::{FutureExt, StreamExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

use super::{DEFAULT_USER_AGENT, FetchTransport};
use crate::error::{FetchError, ScraperError};

/// Default wait for the content-ready marker.
pub const DEFAULT_CONTENT_TIMEOUT: Duration = Duration::from_secs(8);

const MARKER_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Rendering flags for a non-interactive profile: no GPU, WebGL or 3D paths.
const RENDER_ARGS: &[&str] = &[
    "--disable-gpu",
    "--disable-software-rasterizer",
    "--disable-3d-apis",
    "--disable-webgl",
    "--disable-webgl2",
    "--use-gl=swiftshader",
];

/// Settings for launching a [`BrowserTransport`].
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Browser executable. Required; construction fails without it.
    pub executable: Option<PathBuf>,
    /// Persistent profile directory. When absent the session runs incognito.
    pub profile_dir: Option<PathBuf>,
    pub user_agent: String,
    /// CSS selector whose presence marks the page as rendered.
    pub ready_selector: String,
    pub content_timeout: Duration,
}

impl BrowserOptions {
    pub fn new(executable: Option<PathBuf>, ready_selector: &str) -> Self {
        Self {
            executable,
            profile_dir: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            ready_selector: ready_selector.to_string(),
            content_timeout: DEFAULT_CONTENT_TIMEOUT,
        }
    }

    /// Resolve and check the executable path.
    fn executable(&self) -> Result<PathBuf, ScraperError> {
        let path = self
            .executable
            .clone()
            .ok_or(ScraperError::DriverNotConfigured)?;
        if !path.exists() {
            return Err(ScraperError::DriverNotFound(path));
        }
        Ok(path)
    }

    fn to_config(&self, executable: PathBuf) -> Result<BrowserConfig, ScraperError> {
        let builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .no_sandbox()
            .args(RENDER_ARGS.iter().copied())
            .arg(format!("--user-agent={}", self.user_agent));

        let builder = match &self.profile_dir {
            Some(dir) => {
                info!(profile_dir = %dir.display(), "Using browser profile directory");
                builder.user_data_dir(dir)
            }
            None => {
                info!("Using incognito browser session (no profile)");
                builder.incognito()
            }
        };

        builder.build().map_err(ScraperError::BrowserConfig)
    }
}

/// The live browser process plus its event-loop task.
///
/// Released at most once; dropping an unreleased handle aborts the event loop
/// and lets the browser process be killed.
struct SessionHandle {
    browser: Browser,
    events: JoinHandle<()>,
    released: bool,
}

impl SessionHandle {
    async fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if let Err(e) = self.browser.close().await {
            warn!(error = ?e, "Failed to close browser cleanly");
        }
        if let Err(e) = self.browser.wait().await {
            warn!(error = ?e, "Failed to wait for browser exit");
        }
        self.events.abort();
        info!("Browser session released");
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if !self.released {
            warn!("Browser session dropped without release; killing browser");
        }
        self.events.abort();
    }
}

/// A session and the single page every fetch navigates.
struct Session {
    handle: SessionHandle,
    page: Page,
}

/// Stateful transport backed by one headless browser session.
pub struct BrowserTransport {
    session: Mutex<Session>,
    user_agent: String,
    ready_selector: String,
    content_timeout: Duration,
}

impl BrowserTransport {
    /// Launch the browser and open the page used for every fetch.
    ///
    /// Fails with a configuration error when the executable is missing.
    pub async fn launch(options: BrowserOptions) -> Result<Self, ScraperError> {
        let executable = options.executable()?;
        info!(executable = %executable.display(), "Starting headless browser");
        let config = options.to_config(executable)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(ScraperError::BrowserLaunch)?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = ?e, "Browser event loop stopped");
                    break;
                }
            }
        });

        let mut handle = SessionHandle {
            browser,
            events,
            released: false,
        };

        let page = match handle.browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handle.release().await;
                return Err(ScraperError::BrowserLaunch(e));
            }
        };

        Ok(Self {
            session: Mutex::new(Session { handle, page }),
            user_agent: options.user_agent,
            ready_selector: options.ready_selector,
            content_timeout: options.content_timeout,
        })
    }

    /// Run `f` against a freshly launched transport and release the session
    /// afterwards, whether `f` returns or panics.
    ///
    /// Clones of the handle that outlive `f` see a released session and fetch nothing.
    pub async fn scoped<T, F, Fut>(options: BrowserOptions, f: F) -> Result<T, ScraperError>
    where
        F: FnOnce(Arc<BrowserTransport>) -> Fut,
        Fut: Future<Output = T>,
    {
        let transport = Arc::new(Self::launch(options).await?);
        let outcome = AssertUnwindSafe(f(Arc::clone(&transport)))
            .catch_unwind()
            .await;
        transport.release().await;

        match outcome {
            Ok(value) => Ok(value),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Shut the browser down. Later calls are no-ops and later fetches return `None`.
    pub async fn release(&self) {
        self.session.lock().await.handle.release().await;
    }

    async fn wait_for_marker(&self, page: &Page) -> Result<(), FetchError> {
        let poll = async {
            loop {
                if page.find_element(self.ready_selector.as_str()).await.is_ok() {
                    return;
                }
                tokio::time::sleep(MARKER_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(self.content_timeout, poll)
            .await
            .map_err(|_| FetchError::Timeout {
                selector: self.ready_selector.clone(),
                timeout_secs: self.content_timeout.as_secs_f64(),
            })
    }

    async fn try_fetch(&self, page: &Page, url: &Url) -> Result<String, FetchError> {
        page.goto(url.as_str()).await?;
        self.wait_for_marker(page).await?;
        Ok(page.content().await?)
    }
}

#[async_trait]
impl FetchTransport for BrowserTransport {
    async fn fetch(&self, url: &Url) -> Option<String> {
        let session = self.session.lock().await;
        if session.handle.released {
            error!(url = %url, "Fetch attempted on a released browser session");
            return None;
        }

        info!(url = %url, "Fetching with browser");
        match self.try_fetch(&session.page, url).await {
            Ok(html) => Some(html),
            Err(e) => {
                error!(url = %url, error = ?e, "Error fetching page with browser");
                None
            }
        }
    }

    fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_launch_without_executable_is_config_error() {
        let options = BrowserOptions::new(None, "media-scorecard");
        let err = BrowserTransport::launch(options).await.err();
        assert!(matches!(err, Some(ScraperError::DriverNotConfigured)));
    }

    #[tokio::test]
    async fn test_launch_with_missing_executable_is_config_error() {
        let path = PathBuf::from("/definitely/not/a/real/chromedriver");
        let options = BrowserOptions::new(Some(path.clone()), "media-scorecard");
        match BrowserTransport::launch(options).await {
            Err(ScraperError::DriverNotFound(p)) => assert_eq!(p, path),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("launch should fail"),
        }
    }

    #[tokio::test]
    async fn test_scoped_never_runs_body_on_config_error() {
        let options = BrowserOptions::new(None, "media-scorecard");
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let result =
            BrowserTransport::scoped(options, |_t| async move { flag.store(true, Ordering::SeqCst) })
                .await;
        assert!(result.is_err());
        assert!(!ran.load(Ordering::SeqCst));
    }
}
