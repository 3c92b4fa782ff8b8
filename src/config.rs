//! Run configuration, read once from the environment at startup.
//!
//! | Variable                 | Default                           |
//! |--------------------------|-----------------------------------|
//! | `CYCLE_STATION_NAME`     | `Westminster Pier, Westminster`   |
//! | `EMPTY_DOCK_THRESHOLD`   | `5` (also used when unparsable)   |
//! | `RECIPIENT_EMAIL`        | unset; notifications fail         |
//! | `FEED_URL`               | TfL live cycle hire feed          |
//! | `FEED_TIMEOUT_SECS`      | `30`                              |
//! | `GMAIL_TOKEN_PATH`       | `token.json`                      |
//! | `GMAIL_CREDENTIALS_PATH` | `credentials.json`                |

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::fetch::{DEFAULT_FEED_URL, DEFAULT_TIMEOUT};

pub const DEFAULT_STATION_NAME: &str = "Westminster Pier, Westminster";
pub const DEFAULT_THRESHOLD: i64 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub station_name: String,
    /// Alert when empty docks are at or below this.
    pub threshold: i64,
    pub recipient: Option<String>,
    /// Feed URL or path to a saved feed document.
    pub feed_source: String,
    pub feed_timeout: Duration,
    pub token_path: PathBuf,
    pub credentials_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            station_name: DEFAULT_STATION_NAME.to_string(),
            threshold: DEFAULT_THRESHOLD,
            recipient: None,
            feed_source: DEFAULT_FEED_URL.to_string(),
            feed_timeout: DEFAULT_TIMEOUT,
            token_path: PathBuf::from("token.json"),
            credentials_path: PathBuf::from("credentials.json"),
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a `.env` file.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Unset and blank
    /// variables both fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let threshold = match var("EMPTY_DOCK_THRESHOLD") {
            None => DEFAULT_THRESHOLD,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(value = %raw, default = DEFAULT_THRESHOLD, "Invalid EMPTY_DOCK_THRESHOLD, using default");
                DEFAULT_THRESHOLD
            }),
        };

        let feed_timeout = match var("FEED_TIMEOUT_SECS") {
            None => defaults.feed_timeout,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!(value = %raw, "Invalid FEED_TIMEOUT_SECS, using default");
                    defaults.feed_timeout
                }
            },
        };

        Self {
            station_name: var("CYCLE_STATION_NAME").unwrap_or(defaults.station_name),
            threshold,
            recipient: var("RECIPIENT_EMAIL"),
            feed_source: var("FEED_URL").unwrap_or(defaults.feed_source),
            feed_timeout,
            token_path: var("GMAIL_TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.token_path),
            credentials_path: var("GMAIL_CREDENTIALS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.credentials_path),
        }
    }
}
