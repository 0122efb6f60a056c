//! `~/.storyfeed/config.toml` and environment overrides.
//!
//! ```toml
//! [api]
//! base_url = "https://story-api.dicoding.dev/v1"
//! timeout_secs = 60
//!
//! [feed]
//! page_size = 20
//! max_pages = 1000
//! with_location = false
//!
//! [media]
//! max_upload_bytes = 1048576
//! ```
//!
//! Every key is optional. A missing file is the same as an empty one.

use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV: &str = "STORYFEED_CONFIG";
pub const API_URL_ENV: &str = "STORYFEED_API_URL";

const DATA_DIR_NAME: &str = ".storyfeed";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
pub struct StoryfeedConfig {
    pub api: Option<ApiSection>,
    pub feed: Option<FeedSection>,
    pub media: Option<MediaSection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiSection {
    pub base_url: Option<String>,
    /// Whole-request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedSection {
    /// Items per page. Unset leaves the server default.
    pub page_size: Option<u32>,
    pub max_pages: Option<u32>,
    /// Only fetch stories that carry coordinates.
    #[serde(default)]
    pub with_location: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct MediaSection {
    pub max_upload_bytes: Option<u64>,
}

impl StoryfeedConfig {
    /// Load from `$STORYFEED_CONFIG` or the default location.
    ///
    /// `Ok(None)` when there is no file to read.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|source| {
            tracing::warn!("Failed to read config at {}: {source}", path.display());
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        toml::from_str(&content).map(Some).map_err(|source| {
            tracing::warn!("Failed to parse config at {}: {source}", path.display());
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Apply overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| env::var(key).ok())
    }

    /// Apply overrides from `lookup` (environment-shaped key/value source).
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api.get_or_insert_with(ApiSection::default).base_url = Some(url.trim().to_string());
        }
        self
    }

    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.api.as_ref()?.base_url.as_deref()
    }

    #[must_use]
    pub fn timeout_secs(&self) -> Option<u64> {
        self.api.as_ref()?.timeout_secs
    }

    #[must_use]
    pub fn page_size(&self) -> Option<u32> {
        self.feed.as_ref()?.page_size
    }

    #[must_use]
    pub fn max_pages(&self) -> Option<u32> {
        self.feed.as_ref()?.max_pages
    }

    #[must_use]
    pub fn with_location(&self) -> bool {
        self.feed.as_ref().is_some_and(|feed| feed.with_location)
    }

    #[must_use]
    pub fn max_upload_bytes(&self) -> Option<u64> {
        self.media.as_ref()?.max_upload_bytes
    }
}

/// `~/.storyfeed`, or `./.storyfeed` when there is no home directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    dirs::home_dir().map_or_else(|| PathBuf::from(DATA_DIR_NAME), |home| home.join(DATA_DIR_NAME))
}

/// `$STORYFEED_CONFIG` when set, else `~/.storyfeed/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(DATA_DIR_NAME).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> StoryfeedConfig {
        toml::from_str(content).expect("valid toml")
    }

    #[test]
    fn parse_empty_config() {
        let config = parse("");
        assert!(config.api.is_none());
        assert_eq!(config.base_url(), None);
        assert_eq!(config.page_size(), None);
        assert!(!config.with_location());
    }

    #[test]
    fn parse_all_sections() {
        let config = parse(
            r#"
[api]
base_url = "http://localhost:3000/v1"
timeout_secs = 15

[feed]
page_size = 25
max_pages = 40
with_location = true

[media]
max_upload_bytes = 500000
"#,
        );
        assert_eq!(config.base_url(), Some("http://localhost:3000/v1"));
        assert_eq!(config.timeout_secs(), Some(15));
        assert_eq!(config.page_size(), Some(25));
        assert_eq!(config.max_pages(), Some(40));
        assert!(config.with_location());
        assert_eq!(config.max_upload_bytes(), Some(500_000));
    }

    #[test]
    fn partial_feed_section_defaults_location_off() {
        let config = parse("[feed]\npage_size = 5\n");
        assert_eq!(config.page_size(), Some(5));
        assert!(!config.with_location());
    }

    #[test]
    fn env_url_overrides_file() {
        let config = parse("[api]\nbase_url = \"http://file\"\ntimeout_secs = 9\n")
            .with_overrides_from(|key| (key == API_URL_ENV).then(|| " http://env ".to_string()));
        assert_eq!(config.base_url(), Some("http://env"));
        assert_eq!(config.timeout_secs(), Some(9));
    }

    #[test]
    fn env_url_creates_api_section() {
        let config = StoryfeedConfig::default()
            .with_overrides_from(|key| (key == API_URL_ENV).then(|| "http://env".to_string()));
        assert_eq!(config.base_url(), Some("http://env"));
    }

    #[test]
    fn blank_env_url_is_ignored() {
        let config = parse("[api]\nbase_url = \"http://file\"\n")
            .with_overrides_from(|_| Some("   ".to_string()));
        assert_eq!(config.base_url(), Some("http://file"));
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = StoryfeedConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[feed]\nmax_pages = 3\n").unwrap();

        let loaded = StoryfeedConfig::load_from(&path).unwrap().unwrap();
        assert_eq!(loaded.max_pages(), Some(3));
    }

    #[test]
    fn invalid_toml_is_parse_error_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[feed\npage_size = ").unwrap();

        let err = StoryfeedConfig::load_from(&path).unwrap_err();
        assert!(matches!(&err, ConfigError::Parse { path: p, .. } if *p == path));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn wrong_type_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[feed]\npage_size = \"lots\"\n").unwrap();

        assert!(matches!(
            StoryfeedConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
