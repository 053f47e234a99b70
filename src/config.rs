//! Runtime configuration, read from `tvratings.toml` and the environment.

use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use fundu::DurationParser;
use serde::{Deserialize, Deserializer};

use crate::scraper::sources::{metacritic, rotten_tomatoes};
use crate::scraper::transport::browser::DEFAULT_CONTENT_TIMEOUT;
use crate::scraper::transport::http::{DEFAULT_HTTP_TIMEOUT, DEFAULT_REQUEST_DELAY};
use crate::scraper::transport::DEFAULT_USER_AGENT;

/// Optional config file in the working directory.
pub const CONFIG_FILE: &str = "tvratings.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Level for this crate's logs; `RUST_LOG` overrides it entirely
    pub log_level: String,
    pub user_agent: String,
    /// Pause after each successful HTTP fetch
    #[serde(deserialize_with = "deserialize_duration")]
    pub request_delay: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub http_timeout: Duration,
    /// Wait for the browser content marker
    #[serde(deserialize_with = "deserialize_duration")]
    pub content_timeout: Duration,
    /// Browser executable for the headless transport
    pub chrome_driver: Option<PathBuf>,
    /// Browser profile directory; incognito when unset
    pub selenium_profile_dir: Option<PathBuf>,
    pub metacritic_base_url: String,
    pub rotten_tomatoes_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_delay: DEFAULT_REQUEST_DELAY,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            content_timeout: DEFAULT_CONTENT_TIMEOUT,
            chrome_driver: None,
            selenium_profile_dir: None,
            metacritic_base_url: metacritic::BASE_URL.to_string(),
            rotten_tomatoes_base_url: rotten_tomatoes::BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Layer the config file under raw environment variables.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::raw())
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }
}

static DURATION_PARSER: LazyLock<DurationParser<'static>> =
    LazyLock::new(DurationParser::with_all_time_units);

/// Accept durations as bare seconds (`8`, `0.5`) or human strings (`1500ms`, `2s`).
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        FractionalSecs(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
        Raw::FractionalSecs(secs) => {
            Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
        }
        Raw::Text(text) => {
            let parsed = DURATION_PARSER
                .parse(text.trim())
                .map_err(serde::de::Error::custom)?;
            Duration::try_from(parsed).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(pairs: &[(&str, &str)]) -> Config {
        let mut figment = Figment::new();
        for (key, value) in pairs {
            figment = figment.merge((*key, *value));
        }
        figment.extract().unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = extract(&[]);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.request_delay, Duration::from_secs(1));
        assert_eq!(config.content_timeout, Duration::from_secs(8));
        assert!(config.chrome_driver.is_none());
        assert_eq!(config.metacritic_base_url, "https://www.metacritic.com/");
    }

    #[test]
    fn test_human_durations() {
        let config = extract(&[("request_delay", "1500ms"), ("content_timeout", "12s")]);
        assert_eq!(config.request_delay, Duration::from_millis(1500));
        assert_eq!(config.content_timeout, Duration::from_secs(12));
    }

    #[test]
    fn test_paths() {
        let config = extract(&[
            ("chrome_driver", "/usr/bin/chromium"),
            ("selenium_profile_dir", "/tmp/profile"),
        ]);
        assert_eq!(config.chrome_driver, Some(PathBuf::from("/usr/bin/chromium")));
        assert_eq!(config.selenium_profile_dir, Some(PathBuf::from("/tmp/profile")));
    }

    #[test]
    fn test_bad_duration_rejected() {
        let result: Result<Config, _> = Figment::new().merge(("request_delay", "soon")).extract();
        assert!(result.is_err());
    }
}
