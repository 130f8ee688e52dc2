//! Configuration file parser for `nyusu.toml`.
//!
//! The config file is optional. A missing or empty file yields
//! `Config::default()`. Unknown keys are accepted by serde but logged as
//! warnings so typos do not go unnoticed.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides `database_path`.
pub const DATABASE_PATH_ENV: &str = "NYUSU_DATABASE_PATH";

/// User-Agent sent with every feed request.
pub const DEFAULT_USER_AGENT: &str =
    concat!("nyusu/", env!("CARGO_PKG_VERSION"), " (feed fetcher)");

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level service configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file, or `:memory:`.
    pub database_path: String,

    /// Seconds between scheduler ticks.
    pub tick_interval_secs: u64,

    /// Maximum number of feeds fetched per tick.
    pub batch_size: usize,

    /// Per-request timeout in seconds, covering connect and body download.
    pub request_timeout_secs: u64,

    /// Maximum accepted feed document size in bytes.
    pub max_feed_bytes: usize,

    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "nyusu.db".to_string(),
            tick_interval_secs: 20,
            batch_size: 5,
            request_timeout_secs: 30,
            max_feed_bytes: 10 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// HTTP settings handed to the fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Config::default().fetch_config()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 6] = [
        "database_path",
        "tick_interval_secs",
        "batch_size",
        "request_timeout_secs",
        "max_feed_bytes",
        "user_agent",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - Zero intervals or limits → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            database = %config.database_path,
            tick_interval_secs = config.tick_interval_secs,
            batch_size = config.batch_size,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Apply the database path overrides: the environment value replaces the
    /// file value and the CLI value replaces both. Blank values are ignored.
    pub fn with_database_override(mut self, env: Option<String>, cli: Option<String>) -> Self {
        for value in [env, cli].into_iter().flatten() {
            if !value.trim().is_empty() {
                self.database_path = value;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero = [
            ("tick_interval_secs", self.tick_interval_secs == 0),
            ("batch_size", self.batch_size == 0),
            ("request_timeout_secs", self.request_timeout_secs == 0),
            ("max_feed_bytes", self.max_feed_bytes == 0),
        ];
        if let Some((key, _)) = zero.iter().find(|(_, is_zero)| *is_zero) {
            return Err(ConfigError::Invalid(format!("{} must be greater than 0", key)));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("user_agent must not be empty".into()));
        }
        if self.database_path.trim().is_empty() {
            return Err(ConfigError::Invalid("database_path must not be empty".into()));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            user_agent: self.user_agent.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_body_bytes: self.max_feed_bytes,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
