//! Runtime configuration read from the environment

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://itunes.apple.com";
pub const DOWNLOADS_DIR_NAME: &str = "Downloads";
pub const AUDIO_FILE_EXTENSION: &str = "m4a";
pub const HISTORY_LIMIT: usize = 50;
pub const RECENTLY_PLAYED_LIMIT: usize = 20;
pub const SEARCH_ALBUM_DISPLAY_LIMIT: usize = 5;
pub const TRACK_SEARCH_LIMIT: u32 = 50;
pub const ALBUM_SEARCH_LIMIT: u32 = 20;

const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 500;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Root for persisted stores and the download cache.
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub api_base_url: String,
    pub search_debounce: Duration,
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_dir = env::var("HEARO_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());
        let log_dir = env::var("HEARO_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("logs"));

        Self {
            log_dir,
            api_base_url: env::var("HEARO_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            search_debounce: Duration::from_millis(parse_or(
                env::var("HEARO_SEARCH_DEBOUNCE_MS").ok(),
                DEFAULT_SEARCH_DEBOUNCE_MS,
            )),
            http_timeout: Duration::from_secs(parse_or(
                env::var("HEARO_HTTP_TIMEOUT_SECS").ok(),
                DEFAULT_HTTP_TIMEOUT_SECS,
            )),
            data_dir,
        }
    }

    /// Configuration rooted at an explicit directory, everything else default.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            log_dir: data_dir.join("logs"),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            search_debounce: Duration::from_millis(DEFAULT_SEARCH_DEBOUNCE_MS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            data_dir,
        }
    }

    pub fn stores_dir(&self) -> PathBuf {
        self.data_dir.join("stores")
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.data_dir.join(DOWNLOADS_DIR_NAME)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hearo")
}

fn parse_or(value: Option<String>, default: u64) -> u64 {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        assert_eq!(parse_or(Some("abc".into()), 7), 7);
        assert_eq!(parse_or(None, 7), 7);
        assert_eq!(parse_or(Some(" 250 ".into()), 7), 250);
    }

    #[test]
    fn paths_are_derived_from_data_dir() {
        let config = AppConfig::with_data_dir("/tmp/hearo-test");
        assert_eq!(config.downloads_dir(), PathBuf::from("/tmp/hearo-test/Downloads"));
        assert_eq!(config.stores_dir(), PathBuf::from("/tmp/hearo-test/stores"));
        assert_eq!(config.log_dir, PathBuf::from("/tmp/hearo-test/logs"));
    }
}
