//! Engine configuration.
//!
//! Configuration is loaded from a TOML file (default: `social-sync.toml`).
//! Every key is optional; missing keys take the defaults below.
//!
//! ```toml
//! base_url = "https://social.example.com"
//! feed_page_size = 10
//! message_page_size = 30
//! utc_offset_minutes = 120
//! ```

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file name.
pub const DEFAULT_CONFIG_FILE: &str = "social-sync.toml";

/// Tunables for the sync engine and the REST gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Backend root URL, without the `/api` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Posts per feed page (default: 10).
    #[serde(default = "default_feed_page_size")]
    pub feed_page_size: u64,
    /// Comments per page (default: 20).
    #[serde(default = "default_comment_page_size")]
    pub comment_page_size: u64,
    /// Dialogs fetched by the conversation list (default: 50).
    #[serde(default = "default_dialog_page_size")]
    pub dialog_page_size: u64,
    /// Messages per timeline page (default: 30).
    #[serde(default = "default_message_page_size")]
    pub message_page_size: u64,
    /// Page size for each relationship source fetch (default: 100).
    #[serde(default = "default_relationship_page_size")]
    pub relationship_page_size: u64,
    /// Upper bound on pages walked per relationship source (default: 10).
    #[serde(default = "default_relationship_max_pages")]
    pub relationship_max_pages: u32,
    /// Per-request timeout for the REST gateway (default: 30).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Offset from UTC used to place date boundaries in a timeline
    /// (default: 0).
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_feed_page_size() -> u64 {
    10
}

fn default_comment_page_size() -> u64 {
    20
}

fn default_dialog_page_size() -> u64 {
    50
}

fn default_message_page_size() -> u64 {
    30
}

fn default_relationship_page_size() -> u64 {
    100
}

fn default_relationship_max_pages() -> u32 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            feed_page_size: default_feed_page_size(),
            comment_page_size: default_comment_page_size(),
            dialog_page_size: default_dialog_page_size(),
            message_page_size: default_message_page_size(),
            relationship_page_size: default_relationship_page_size(),
            relationship_max_pages: default_relationship_max_pages(),
            request_timeout_secs: default_request_timeout_secs(),
            utc_offset_minutes: 0,
        }
    }
}

impl EngineConfig {
    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let page_sizes = [
            ("feed_page_size", self.feed_page_size),
            ("comment_page_size", self.comment_page_size),
            ("dialog_page_size", self.dialog_page_size),
            ("message_page_size", self.message_page_size),
            ("relationship_page_size", self.relationship_page_size),
        ];
        if let Some((key, _)) = page_sizes.iter().find(|(_, size)| *size == 0) {
            return Err(ConfigError::Invalid(format!("{} must be at least 1", key)));
        }
        if self.relationship_max_pages == 0 {
            return Err(ConfigError::Invalid(
                "relationship_max_pages must be at least 1".into(),
            ));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url is empty".into()));
        }
        self.utc_offset()?;
        Ok(())
    }

    /// The configured display offset.
    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "utc_offset_minutes out of range: {}",
                    self.utc_offset_minutes
                ))
            })
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Set the backend URL.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_uses_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.feed_page_size, 10);
        assert_eq!(config.message_page_size, 30);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_file_overrides_some_keys() {
        let config: EngineConfig = toml::from_str(
            r#"
            base_url = "https://social.example.com"
            message_page_size = 50
            utc_offset_minutes = -300
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://social.example.com");
        assert_eq!(config.message_page_size, 50);
        assert_eq!(config.comment_page_size, 20);
        assert_eq!(
            config.utc_offset().unwrap(),
            FixedOffset::west_opt(5 * 3600).unwrap()
        );
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let config = EngineConfig {
            dialog_page_size: 0,
            ..EngineConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("dialog_page_size"));
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        let config = EngineConfig {
            utc_offset_minutes: 24 * 60,
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn huge_offset_is_rejected_without_overflow() {
        let config: EngineConfig = toml::from_str("utc_offset_minutes = 2147483647").unwrap();
        assert!(matches!(config.utc_offset(), Err(ConfigError::Invalid(_))));

        let config = EngineConfig {
            utc_offset_minutes: i32::MIN,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "feed_page_size = 25").unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.feed_page_size, 25);
    }

    #[test]
    fn load_missing_file_fails() {
        let err = EngineConfig::load(Path::new("/nonexistent/social-sync.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn load_malformed_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "feed_page_size = \"many\"").unwrap();

        let err = EngineConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
