//! Configuration management for almanac.
//!
//! Configuration is read from `~/.config/almanac/config.toml` unless a path
//! is given. If the file doesn't exist, a default configuration with
//! comments is created. Secrets can be supplied through the environment
//! instead of the file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::daemon::DaemonConfig;
use crate::fetcher::feed_client::DEFAULT_FEED_URL_TEMPLATE;
use crate::fetcher::{FeedUrlTemplate, RetryPolicy};
use crate::formatter::MessageConfig;
use crate::normalizer::FeedSection;
use crate::pipeline::PipelineConfig;
use crate::publisher::{MediaConfig, PublisherConfig};
use crate::store::SelectionMode;

pub const BEARER_TOKEN_ENV: &str = "ALMANAC_BEARER_TOKEN";

/// Upstream feed settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// URL with `{section}`, `{MM}`, `{DD}`, `{month}`, `{day}` placeholders
    pub url_template: String,
    /// Which list of the response to post from (default: selected)
    pub section: FeedSection,
    /// Sent with every request; Wikimedia asks for a contact address here
    pub user_agent: Option<String>,
    /// Per-request timeout in seconds (default: 10)
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_FEED_URL_TEMPLATE.to_string(),
            section: FeedSection::default(),
            user_agent: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `exhaust` never repeats an item within a batch, `repeat` may
    pub mode: SelectionMode,
}

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub retry: RetryPolicy,
    pub message: MessageConfig,
    pub store: StoreConfig,
    pub publisher: PublisherConfig,
    pub media: MediaConfig,
    pub pipeline: PipelineConfig,
    pub daemon: DaemonConfig,
}

impl Config {
    /// Load configuration from `path`, or from the default path.
    ///
    /// If the default config file doesn't exist, creates one with comments.
    /// An explicitly given path must exist. Missing fields use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let p = Self::default_config_path()?;
                if !p.exists() {
                    Self::create_default_config(&p)?;
                }
                p
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let mut config = Self::from_toml(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get the default config file path: `~/.config/almanac/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("almanac").join("config.toml"))
    }

    /// Environment values win over the file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(BEARER_TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
            self.publisher.bearer_token = Some(token);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry
            .validate()
            .map_err(|msg| ConfigError::Invalid(format!("[retry] {}", msg)))?;

        FeedUrlTemplate::new(self.feed.url_template.clone())
            .map_err(|e| ConfigError::Invalid(format!("[feed] url_template: {}", e)))?;

        self.publisher
            .retry_policy()
            .validate()
            .map_err(|msg| ConfigError::Invalid(format!("[publisher] duplicate retry: {}", msg)))?;

        if self.message.max_length == 0 {
            return Err(ConfigError::Invalid(
                "[message] max_length must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "[pipeline] timeout_secs must be greater than 0".to_string(),
            ));
        }

        DaemonConfig::parse_interval(&self.daemon.interval)
            .map_err(|msg| ConfigError::Invalid(format!("[daemon] interval: {}", msg)))?;

        Ok(())
    }

    pub fn has_credentials(&self) -> bool {
        self.publisher
            .bearer_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> &'static str {
        r##"# almanac configuration
#
# Every value below is the built-in default; delete what you don't change.

[feed]
# Placeholders: {section}, {MM}, {DD} (zero-padded), {month}, {day}
url_template = "https://api.wikimedia.org/feed/v1/wikipedia/en/onthisday/{section}/{MM}/{DD}"
# One of: selected, events, births, deaths, holidays
section = "selected"
# Wikimedia asks clients to identify themselves, e.g. "almanac (you@example.com)"
# user_agent = "almanac (you@example.com)"
timeout_secs = 10

[retry]
# Feed fetch retries after the first attempt, with exponential backoff
max_retries = 3
initial_delay_ms = 1000
backoff_multiplier = 2.0

[message]
max_length = 280
heading = "On This Day"
hashtag = "#OnThisDay"
link_label = "For more information visit: "

[store]
# "exhaust": never repeat an item until the batch is used up
# "repeat": any item of today's batch may be picked again
mode = "exhaust"

[publisher]
api_base = "https://api.x.com"
# Prefer the ALMANAC_BEARER_TOKEN environment variable over this
# bearer_token = ""
# Resubmission after a duplicate rejection; same schedule rules as [retry]
duplicate_retry_delay_ms = 3000
max_duplicate_retries = 10
duplicate_backoff_multiplier = 1.0

[media]
# Attach the Wikipedia thumbnail of the linked page, if there is one
enabled = false
lookup_base = "https://en.wikipedia.org/api/rest_v1"

[pipeline]
# Upper bound for a whole run, retries included
timeout_secs = 600

[daemon]
# How often to post: "30m", "6h", "1d", ...
interval = "1d"
run_on_start = true
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config_deserializes() {
        let config = Config::from_toml(Config::default_config_content())
            .expect("Default config should be valid TOML");

        assert_eq!(config, Config::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[retry]
max_retries = 5

[store]
mode = "repeat"
"##;
        let config = Config::from_toml(content).expect("Partial config should work");

        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_delay_ms, 1000);
        assert_eq!(config.store.mode, SelectionMode::Repeat);
        assert_eq!(config.message.max_length, 280);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::from_toml("").expect("Empty config should work");
        assert_eq!(config.feed.section, FeedSection::Selected);
        assert_eq!(config.store.mode, SelectionMode::Exhaust);
        assert_eq!(
            config.publisher.duplicate_retry_delay(),
            Duration::from_millis(3000)
        );
        assert!(!config.has_credentials());
    }

    #[test]
    fn test_env_overrides_token() {
        let mut config = Config::from_toml("[publisher]\nbearer_token = \"from-file\"").unwrap();
        config.apply_env(|key| (key == BEARER_TOKEN_ENV).then(|| "from-env".to_string()));
        assert_eq!(config.publisher.bearer_token.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_blank_env_token_ignored() {
        let mut config = Config::from_toml("[publisher]\nbearer_token = \"from-file\"").unwrap();
        config.apply_env(|_| Some("  ".to_string()));
        assert_eq!(config.publisher.bearer_token.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_retry = Config::from_toml("[retry]\nbackoff_multiplier = 0.5").unwrap();
        assert!(matches!(bad_retry.validate(), Err(ConfigError::Invalid(_))));

        let bad_template = Config::from_toml("[feed]\nurl_template = \"not a url\"").unwrap();
        assert!(bad_template.validate().is_err());

        let bad_interval = Config::from_toml("[daemon]\ninterval = \"soon\"").unwrap();
        assert!(bad_interval.validate().is_err());

        let huge_interval =
            Config::from_toml("[daemon]\ninterval = \"999999999999999d\"").unwrap();
        assert!(huge_interval.validate().is_err());

        let bad_duplicate = Config::from_toml("[publisher]\nduplicate_retry_delay_ms = 0").unwrap();
        assert!(bad_duplicate.validate().is_err());

        let zero_length = Config::from_toml("[message]\nmax_length = 0").unwrap();
        assert!(zero_length.validate().is_err());
    }

    #[test]
    fn test_unknown_section_value_is_parse_error() {
        assert!(Config::from_toml("[feed]\nsection = \"weather\"").is_err());
    }

    #[test]
    fn test_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("almanac.toml");
        fs::write(&path, "[message]\nhashtag = \"#TIL\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.message.hashtag, "#TIL");
    }

    #[test]
    fn test_load_missing_explicit_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_create_default_config_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::create_default_config(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(Config::from_toml(&written).unwrap(), Config::default());
    }
}
