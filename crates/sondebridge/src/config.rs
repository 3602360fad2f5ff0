//! Configuration management for sondebridge.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifier::MAX_IDENTIFIERS;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "sondebridge";

/// Default identifier state file name.
const STATE_FILE_NAME: &str = "icaos.json";

/// Default UDP port for Horus payload summaries.
pub const DEFAULT_LISTEN_PORT: u16 = 55673;

/// Default BaseStation output port.
pub const DEFAULT_SINK_PORT: u16 = 30000;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SONDEBRIDGE_`, sections split on `__`)
/// 2. TOML config file at `~/.config/sondebridge/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Inbound UDP listener configuration.
    pub listener: ListenerConfig,
    /// Outbound BaseStation sink configuration.
    pub sink: SinkConfig,
    /// Identifier cache configuration.
    pub cache: CacheConfig,
}

/// Inbound UDP listener configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Address to bind the UDP socket to.
    pub bind_address: String,
    /// UDP port to listen on. Zero picks an ephemeral port.
    pub port: u16,
    /// Largest datagram accepted; longer packets are truncated and fail to parse.
    pub max_datagram_bytes: usize,
    /// Number of decoded records buffered between the listener and the bridge.
    pub queue_capacity: usize,
    /// Share the port with other Horus clients on this host
    /// (`SO_REUSEADDR`, plus `SO_REUSEPORT` on unix).
    pub reuse_port: bool,
}

/// Outbound BaseStation sink configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Host running the BaseStation consumer (e.g. Virtual Radar Server).
    pub host: String,
    /// TCP port of the BaseStation consumer.
    pub port: u16,
    /// Connection attempts at startup before giving up.
    /// Set to 0 to retry forever.
    pub connect_attempts: u32,
    /// Delay between startup connection attempts in seconds.
    pub connect_retry_secs: u64,
    /// Timeout for a single connect or write in seconds.
    pub write_timeout_secs: u64,
}

/// Identifier cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Path to the identifier state file.
    /// Defaults to `~/.local/share/sondebridge/icaos.json`
    pub path: Option<PathBuf>,
    /// Maximum number of callsigns holding an identifier at once.
    pub capacity: usize,
    /// Two hex digits prepended to every assigned identifier.
    pub identifier_prefix: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_LISTEN_PORT,
            max_datagram_bytes: 2048,
            queue_capacity: 256,
            reuse_port: true,
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_SINK_PORT,
            connect_attempts: 0,
            connect_retry_secs: 5,
            write_timeout_secs: 5,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: None, // Resolved to the data dir at runtime
            capacity: 100,
            identifier_prefix: "BD".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("SONDEBRIDGE_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.cache.capacity == 0 {
            return Err(Error::ConfigValidation {
                message: "cache capacity must be greater than 0".to_string(),
            });
        }

        if self.cache.capacity > MAX_IDENTIFIERS {
            return Err(Error::ConfigValidation {
                message: format!(
                    "cache capacity ({}) cannot exceed the identifier namespace ({MAX_IDENTIFIERS})",
                    self.cache.capacity
                ),
            });
        }

        let prefix = &self.cache.identifier_prefix;
        if prefix.len() != 2 || !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::ConfigValidation {
                message: format!("identifier_prefix must be two hex digits, got '{prefix}'"),
            });
        }

        if self.sink.host.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "sink host must not be empty".to_string(),
            });
        }

        if self.sink.port == 0 {
            return Err(Error::ConfigValidation {
                message: "sink port must be greater than 0".to_string(),
            });
        }

        if self.sink.write_timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "write_timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.listener.queue_capacity == 0 {
            return Err(Error::ConfigValidation {
                message: "queue_capacity must be greater than 0".to_string(),
            });
        }

        if self.listener.max_datagram_bytes == 0 {
            return Err(Error::ConfigValidation {
                message: "max_datagram_bytes must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the identifier state file path, resolving defaults if not set.
    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        self.cache
            .path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(STATE_FILE_NAME))
    }

    /// Get the UDP bind address as `host:port`.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listener.bind_address, self.listener.port)
    }

    /// Get the sink address as `host:port`.
    #[must_use]
    pub fn sink_addr(&self) -> String {
        format!("{}:{}", self.sink.host, self.sink.port)
    }

    /// Get the startup reconnect delay as a Duration.
    #[must_use]
    pub fn connect_retry_interval(&self) -> Duration {
        Duration::from_secs(self.sink.connect_retry_secs)
    }

    /// Get the per-operation sink timeout as a Duration.
    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.sink.write_timeout_secs)
    }

    /// Get the number of startup connection attempts, `None` meaning unlimited.
    #[must_use]
    pub fn connect_attempts(&self) -> Option<u32> {
        if self.sink.connect_attempts == 0 {
            None
        } else {
            Some(self.sink.connect_attempts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.listener.port, 55673);
        assert_eq!(config.sink.port, 30000);
        assert_eq!(config.cache.capacity, 100);
        assert_eq!(config.cache.identifier_prefix, "BD");
    }

    #[test]
    fn test_default_listener_config() {
        let listener = ListenerConfig::default();

        assert_eq!(listener.bind_address, "0.0.0.0");
        assert_eq!(listener.max_datagram_bytes, 2048);
        assert_eq!(listener.queue_capacity, 256);
        assert!(listener.reuse_port);
    }

    #[test]
    fn test_default_sink_config() {
        let sink = SinkConfig::default();

        assert_eq!(sink.host, "127.0.0.1");
        assert_eq!(sink.connect_attempts, 0);
        assert_eq!(sink.connect_retry_secs, 5);
        assert_eq!(sink.write_timeout_secs, 5);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_capacity() {
        let mut config = Config::default();
        config.cache.capacity = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("capacity"));
    }

    #[test]
    fn test_validate_capacity_beyond_namespace() {
        let mut config = Config::default();
        config.cache.capacity = MAX_IDENTIFIERS + 1;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("namespace"));
    }

    #[test]
    fn test_validate_capacity_at_namespace_limit() {
        let mut config = Config::default();
        config.cache.capacity = MAX_IDENTIFIERS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_prefix() {
        let mut config = Config::default();
        config.cache.identifier_prefix = "XZ".to_string();
        assert!(config.validate().is_err());

        config.cache.identifier_prefix = "BDA".to_string();
        assert!(config.validate().is_err());

        config.cache.identifier_prefix = "a1".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_sink_port() {
        let mut config = Config::default();
        config.sink.port = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("sink port"));
    }

    #[test]
    fn test_validate_empty_sink_host() {
        let mut config = Config::default();
        config.sink.host = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_queue_capacity() {
        let mut config = Config::default();
        config.listener.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cache_path_default() {
        let config = Config::default();
        let path = config.cache_path();

        assert!(path.to_string_lossy().contains("sondebridge"));
        assert!(path.to_string_lossy().ends_with("icaos.json"));
    }

    #[test]
    fn test_cache_path_custom() {
        let mut config = Config::default();
        config.cache.path = Some(PathBuf::from("/srv/horus/icaos.json"));

        assert_eq!(config.cache_path(), PathBuf::from("/srv/horus/icaos.json"));
    }

    #[test]
    fn test_addresses() {
        let config = Config::default();
        assert_eq!(config.listen_addr(), "0.0.0.0:55673");
        assert_eq!(config.sink_addr(), "127.0.0.1:30000");
    }

    #[test]
    fn test_durations() {
        let config = Config::default();
        assert_eq!(config.connect_retry_interval(), Duration::from_secs(5));
        assert_eq!(config.write_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_connect_attempts_unlimited_when_zero() {
        let mut config = Config::default();
        assert!(config.connect_attempts().is_none());

        config.sink.connect_attempts = 3;
        assert_eq!(config.connect_attempts(), Some(3));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("sondebridge"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        // A missing config file falls back to defaults.
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[sink]\nhost = \"192.168.1.100\"\n\n[cache]\ncapacity = 25\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.sink.host, "192.168.1.100");
        assert_eq!(config.cache.capacity, 25);
        assert_eq!(config.listener.port, DEFAULT_LISTEN_PORT);
    }

    #[test]
    fn test_load_reuse_port_toggle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[listener]\nreuse_port = false\n").unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert!(!config.listener.reuse_port);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\ncapacity = 0\n").unwrap();

        let result = Config::load_from(Some(path));
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }

    #[test]
    fn test_cache_config_deserialize() {
        let json = r#"{"capacity": 50, "identifier_prefix": "AB"}"#;
        let cache: CacheConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cache.capacity, 50);
        assert_eq!(cache.identifier_prefix, "AB");
        assert!(cache.path.is_none());
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("queue_capacity"));
        assert!(json.contains("identifier_prefix"));
    }
}
