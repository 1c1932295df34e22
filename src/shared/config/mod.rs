//! Session configuration module
//!
//! Provides the configuration for the session core: timing constants, store
//! keys, the data directory and the remote endpoint used by the HTTP writer.
//!
//! Values come from three layers, later layers winning:
//!
//! 1. Built-in defaults
//! 2. An optional TOML file (`SessionConfig::load`)
//! 3. Environment variables (`LIFTLOG_SERVER_URL`, `LIFTLOG_DATA_DIR`, `LIFTLOG_TOKEN`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default server URL
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Default store key for the timer checkpoint
pub const DEFAULT_TIMER_KEY: &str = "session-timer-checkpoint";

/// Default store key for the offline queue
pub const DEFAULT_QUEUE_KEY: &str = "workout-offline-queue";

/// Session core configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Base URL of the remote workout API
    pub server_url: String,
    /// Bearer token attached to remote writes
    pub token: Option<String>,
    /// Directory holding the file-backed store
    pub data_dir: PathBuf,
    /// Period between timer checkpoints while running
    pub checkpoint_interval: Duration,
    /// How long `just_reconnected` stays set after coming online
    pub reconnect_window: Duration,
    /// Repaint hint cadence for the timer frame loop
    pub frame_interval: Duration,
    /// Background retry period while online with queued workouts
    pub retry_interval: Duration,
    /// Timeout for a single remote write
    pub request_timeout: Duration,
    /// Store key owned by the timer
    pub timer_key: String,
    /// Store key owned by the queue
    pub queue_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            token: None,
            data_dir: default_data_dir(),
            checkpoint_interval: Duration::from_secs(5),
            reconnect_window: Duration::from_secs(3),
            frame_interval: Duration::from_millis(250),
            retry_interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(15),
            timer_key: DEFAULT_TIMER_KEY.to_string(),
            queue_key: DEFAULT_QUEUE_KEY.to_string(),
        }
    }
}

/// Platform data directory for the file store
///
/// Falls back to the temp directory when the platform has no data dir.
fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
    path.push("liftlog");
    path
}

impl SessionConfig {
    /// Create a new SessionConfigBuilder
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Load a TOML file and apply environment overrides
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)?.with_env_overrides()
    }

    /// Parse a TOML document; absent fields keep their defaults
    pub fn from_toml_str(content: &str) -> Result<SessionConfigBuilder, ConfigError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(SessionConfigBuilder::from(file))
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> Result<Self, ConfigError> {
        SessionConfigBuilder::default().with_env_overrides()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(self.server_url.clone()));
        }
        for (name, value) in [
            ("checkpoint_interval", self.checkpoint_interval),
            ("reconnect_window", self.reconnect_window),
            ("frame_interval", self.frame_interval),
            ("retry_interval", self.retry_interval),
            ("request_timeout", self.request_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: name,
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        if self.timer_key.is_empty() {
            return Err(ConfigError::MissingValue("timer_key"));
        }
        if self.queue_key.is_empty() {
            return Err(ConfigError::MissingValue("queue_key"));
        }
        if self.timer_key == self.queue_key {
            return Err(ConfigError::InvalidValue {
                field: "queue_key",
                message: "must differ from timer_key".to_string(),
            });
        }
        Ok(())
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), path)
    }
}

/// On-disk TOML layout
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    server_url: Option<String>,
    token: Option<String>,
    data_dir: Option<PathBuf>,
    checkpoint_interval_secs: Option<u64>,
    reconnect_window_secs: Option<u64>,
    frame_interval_ms: Option<u64>,
    retry_interval_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    timer_key: Option<String>,
    queue_key: Option<String>,
}

/// Builder for SessionConfig
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    server_url: Option<String>,
    token: Option<String>,
    data_dir: Option<PathBuf>,
    checkpoint_interval: Option<Duration>,
    reconnect_window: Option<Duration>,
    frame_interval: Option<Duration>,
    retry_interval: Option<Duration>,
    request_timeout: Option<Duration>,
    timer_key: Option<String>,
    queue_key: Option<String>,
}

impl From<ConfigFile> for SessionConfigBuilder {
    fn from(file: ConfigFile) -> Self {
        Self {
            server_url: file.server_url,
            token: file.token,
            data_dir: file.data_dir,
            checkpoint_interval: file.checkpoint_interval_secs.map(Duration::from_secs),
            reconnect_window: file.reconnect_window_secs.map(Duration::from_secs),
            frame_interval: file.frame_interval_ms.map(Duration::from_millis),
            retry_interval: file.retry_interval_secs.map(Duration::from_secs),
            request_timeout: file.request_timeout_secs.map(Duration::from_secs),
            timer_key: file.timer_key,
            queue_key: file.queue_key,
        }
    }
}

impl SessionConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Set the bearer token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the store directory
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn checkpoint_interval(mut self, interval: Duration) -> Self {
        self.checkpoint_interval = Some(interval);
        self
    }

    pub fn reconnect_window(mut self, window: Duration) -> Self {
        self.reconnect_window = Some(window);
        self
    }

    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = Some(interval);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn timer_key(mut self, key: impl Into<String>) -> Self {
        self.timer_key = Some(key.into());
        self
    }

    pub fn queue_key(mut self, key: impl Into<String>) -> Self {
        self.queue_key = Some(key.into());
        self
    }

    /// Apply `LIFTLOG_*` environment variables, then build
    pub fn with_env_overrides(mut self) -> Result<SessionConfig, ConfigError> {
        if let Ok(url) = std::env::var("LIFTLOG_SERVER_URL") {
            self.server_url = Some(url);
        }
        if let Ok(dir) = std::env::var("LIFTLOG_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Ok(token) = std::env::var("LIFTLOG_TOKEN") {
            self.token = Some(token);
        }
        self.build()
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<SessionConfig, ConfigError> {
        let defaults = SessionConfig::default();
        let config = SessionConfig {
            server_url: self.server_url.unwrap_or(defaults.server_url),
            token: self.token.filter(|t| !t.is_empty()),
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            checkpoint_interval: self.checkpoint_interval.unwrap_or(defaults.checkpoint_interval),
            reconnect_window: self.reconnect_window.unwrap_or(defaults.reconnect_window),
            frame_interval: self.frame_interval.unwrap_or(defaults.frame_interval),
            retry_interval: self.retry_interval.unwrap_or(defaults.retry_interval),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            timer_key: self.timer_key.unwrap_or(defaults.timer_key),
            queue_key: self.queue_key.unwrap_or(defaults.queue_key),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
