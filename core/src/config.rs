//! TOML Configuration File Support
//!
//! Configuration for the Gigi client, loaded from a TOML file at
//! `~/.config/gigi/config.toml` and the environment.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. Environment variables
//! 2. TOML configuration file
//! 3. Default values
//!
//! # Environment Variables
//!
//! | Variable                  | Field                |
//! |---------------------------|----------------------|
//! | `GIGI_WS_URL`             | `stream_endpoint`    |
//! | `GIGI_CONVERSATION_URL`   | `history_endpoint` (empty disables) |
//! | `GIGI_RECONNECT_DELAY_MS` | `reconnect_delay_ms` |
//! | `GIGI_CONNECT_TIMEOUT_MS` | `connect_timeout_ms` |
//! | `GIGI_HISTORY_TIMEOUT_MS` | `history_timeout_ms` |
//!
//! # Example Configuration
//!
//! ```toml
//! [stream]
//! endpoint = "wss://api.gigi-the-robot.com"
//! reconnect_delay_ms = 2000
//! connect_timeout_ms = 10000
//! event_buffer = 256
//!
//! [history]
//! endpoint = "https://api.gigi-the-robot.com/conversation"
//! timeout_ms = 10000
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::session::{SessionSettings, DEFAULT_EVENT_BUFFER};
use crate::transport::{validate_endpoint, WebSocketConnector};

/// Default assistant stream endpoint
pub const DEFAULT_STREAM_ENDPOINT: &str = "wss://api.gigi-the-robot.com";

/// Default conversation history endpoint
pub const DEFAULT_HISTORY_ENDPOINT: &str = "https://api.gigi-the-robot.com/conversation";

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Stream section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamToml {
    /// WebSocket endpoint of the assistant
    pub endpoint: Option<String>,

    /// Delay before reconnecting in milliseconds
    pub reconnect_delay_ms: Option<u64>,

    /// Handshake timeout in milliseconds (0 = no timeout)
    pub connect_timeout_ms: Option<u64>,

    /// Capacity of the session event channel
    pub event_buffer: Option<usize>,
}

/// History section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryToml {
    /// Conversation history endpoint (empty string disables the fetch)
    pub endpoint: Option<String>,

    /// Request timeout in milliseconds
    pub timeout_ms: Option<u64>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GigiToml {
    /// Stream configuration section
    pub stream: StreamToml,

    /// History configuration section
    pub history: HistoryToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved client configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GigiConfig {
    /// WebSocket endpoint of the assistant
    pub stream_endpoint: String,

    /// History endpoint; `None` skips the fetch
    pub history_endpoint: Option<String>,

    /// Fixed delay before reconnecting
    pub reconnect_delay_ms: u64,

    /// Handshake timeout (0 = none)
    pub connect_timeout_ms: u64,

    /// History request timeout
    pub history_timeout_ms: u64,

    /// Capacity of the session event channel
    pub event_buffer: usize,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for GigiConfig {
    fn default() -> Self {
        Self {
            stream_endpoint: DEFAULT_STREAM_ENDPOINT.to_string(),
            history_endpoint: Some(DEFAULT_HISTORY_ENDPOINT.to_string()),
            reconnect_delay_ms: 2000,
            connect_timeout_ms: 10_000,
            history_timeout_ms: 10_000,
            event_buffer: DEFAULT_EVENT_BUFFER,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl GigiConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Settings for a [`crate::session::StreamingSession`]
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
            event_buffer: self.event_buffer,
        }
    }

    /// WebSocket connector with the configured handshake timeout
    #[must_use]
    pub fn connector(&self) -> WebSocketConnector {
        WebSocketConnector::new().with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
    }

    /// History request timeout
    #[must_use]
    pub fn history_timeout(&self) -> Duration {
        Duration::from_millis(self.history_timeout_ms)
    }

    /// Check the resolved values
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` for an empty or non-WebSocket
    /// stream endpoint or a zero event buffer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream_endpoint.trim().is_empty() {
            return Err(ConfigError::Validation(
                "stream endpoint must not be empty".to_string(),
            ));
        }
        validate_endpoint(&self.stream_endpoint)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        if self.event_buffer == 0 {
            return Err(ConfigError::Validation(
                "event_buffer must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/gigi/config.toml` or
/// `~/.config/gigi/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("gigi").join("config.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the resolved values are invalid. A missing config file is not an error.
pub fn load_config() -> Result<GigiConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path, then the process environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or if the resolved values are invalid.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<GigiConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with an explicit environment lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<GigiConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = GigiConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::Read {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: GigiToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);

    config.validate()?;
    Ok(config)
}

fn endpoint_or_disabled(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut GigiConfig, toml: &GigiToml) {
    if let Some(ref endpoint) = toml.stream.endpoint {
        config.stream_endpoint = endpoint.trim().to_string();
    }
    if let Some(delay) = toml.stream.reconnect_delay_ms {
        config.reconnect_delay_ms = delay;
    }
    if let Some(timeout) = toml.stream.connect_timeout_ms {
        config.connect_timeout_ms = timeout;
    }
    if let Some(buffer) = toml.stream.event_buffer {
        config.event_buffer = buffer;
    }

    if let Some(ref endpoint) = toml.history.endpoint {
        config.history_endpoint = endpoint_or_disabled(endpoint);
    }
    if let Some(timeout) = toml.history.timeout_ms {
        config.history_timeout_ms = timeout;
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config<F>(config: &mut GigiConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env("GIGI_WS_URL") {
        config.stream_endpoint = url.trim().to_string();
        config.source = ConfigSource::Env;
    }
    if let Some(url) = env("GIGI_CONVERSATION_URL") {
        config.history_endpoint = endpoint_or_disabled(&url);
        config.source = ConfigSource::Env;
    }

    let millis = |key: &str| env(key).and_then(|v| v.trim().parse::<u64>().ok());

    if let Some(ms) = millis("GIGI_RECONNECT_DELAY_MS") {
        config.reconnect_delay_ms = ms;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = millis("GIGI_CONNECT_TIMEOUT_MS") {
        config.connect_timeout_ms = ms;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = millis("GIGI_HISTORY_TIMEOUT_MS") {
        config.history_timeout_ms = ms;
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write_toml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    // =========================================================================
    // Default Configuration Tests
    // =========================================================================

    #[test]
    fn test_default_config() {
        let config = GigiConfig::default();

        assert_eq!(config.stream_endpoint, "wss://api.gigi-the-robot.com");
        assert_eq!(
            config.history_endpoint.as_deref(),
            Some("https://api.gigi-the-robot.com/conversation")
        );
        assert_eq!(config.reconnect_delay_ms, 2000);
        assert_eq!(config.connect_timeout_ms, 10_000);
        assert_eq!(config.event_buffer, 256);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.ends_with("gigi/config.toml"));
        }
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let config = load_config_with_env(Some(path), no_env).unwrap();
        assert_eq!(config, GigiConfig::default());
    }

    // =========================================================================
    // TOML Parsing Tests
    // =========================================================================

    #[test]
    fn test_parse_valid_toml() {
        let file = write_toml(
            r#"
[stream]
endpoint = "ws://127.0.0.1:8765"
reconnect_delay_ms = 500
connect_timeout_ms = 0
event_buffer = 16

[history]
endpoint = "http://127.0.0.1:8080/conversation"
timeout_ms = 3000
"#,
        );

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();

        assert_eq!(config.stream_endpoint, "ws://127.0.0.1:8765");
        assert_eq!(config.reconnect_delay_ms, 500);
        assert_eq!(config.connect_timeout_ms, 0);
        assert_eq!(config.event_buffer, 16);
        assert_eq!(
            config.history_endpoint.as_deref(),
            Some("http://127.0.0.1:8080/conversation")
        );
        assert_eq!(config.history_timeout(), Duration::from_secs(3));
        assert_eq!(config.source(), ConfigSource::File);
        assert!(config.connector().connect_timeout().is_none());
    }

    #[test]
    fn test_empty_history_endpoint_disables_fetch() {
        let file = write_toml("[history]\nendpoint = \"\"\n");
        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert_eq!(config.history_endpoint, None);
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let file = write_toml("[stream\nendpoint = ");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_event_buffer_rejected() {
        let file = write_toml("[stream]\nevent_buffer = 0\n");
        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // Environment Override Tests
    // =========================================================================

    #[test]
    fn test_env_beats_file() {
        let file = write_toml("[stream]\nendpoint = \"ws://from-file\"\nreconnect_delay_ms = 500\n");
        let env = env_from(&[
            ("GIGI_WS_URL", "wss://from-env"),
            ("GIGI_CONVERSATION_URL", ""),
        ]);

        let config = load_config_with_env(Some(file.path().to_path_buf()), env).unwrap();

        assert_eq!(config.stream_endpoint, "wss://from-env");
        assert_eq!(config.history_endpoint, None);
        // Untouched by env, so the file value stands
        assert_eq!(config.reconnect_delay_ms, 500);
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_env_numbers() {
        let env = env_from(&[
            ("GIGI_RECONNECT_DELAY_MS", "250"),
            ("GIGI_CONNECT_TIMEOUT_MS", "not a number"),
            ("GIGI_HISTORY_TIMEOUT_MS", " 1500 "),
        ]);

        let config = load_config_with_env(None, env).unwrap();

        assert_eq!(config.reconnect_delay_ms, 250);
        assert_eq!(config.connect_timeout_ms, 10_000);
        assert_eq!(config.history_timeout_ms, 1500);
        assert_eq!(
            config.session_settings().reconnect_delay,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_empty_stream_endpoint_rejected() {
        let env = env_from(&[("GIGI_WS_URL", "  ")]);
        let result = load_config_with_env(None, env);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_http_stream_endpoint_rejected() {
        let env = env_from(&[("GIGI_WS_URL", "https://api.gigi-the-robot.com")]);
        let result = load_config_with_env(None, env);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
