//! Configuration loading and typed config structures for the Ludo server.
//!
//! Configuration lives in an optional `ludo-config.yaml`. Every field has
//! a default, so a missing file or a partial file is fine. A few values
//! can be overridden from the environment because hosting platforms set
//! them there (`PORT` in particular).

use std::path::Path;

use serde::Deserialize;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "ludo-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held an unusable value.
    #[error("invalid value for {name}: {value}")]
    Env {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Listener and CORS settings.
    #[serde(default)]
    pub server: HttpConfig,

    /// Room limits and connection tuning.
    #[serde(default)]
    pub rooms: RoomsConfig,
}

impl ServerConfig {
    /// Load configuration from `path` if it exists, otherwise defaults,
    /// then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file exists but cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Env`] if an override is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::parse(&std::fs::read_to_string(path)?)?
        } else {
            tracing::info!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.rooms.clamp();
        Ok(config)
    }

    /// Apply `HOST` and `PORT` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if `PORT` is not a valid port number.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("PORT") {
            self.server.port = val.parse().map_err(|e| ConfigError::Env {
                name: "PORT",
                value: format!("{val:?} ({e})"),
            })?;
        }
        Ok(())
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by CORS. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: Vec::new(),
        }
    }
}

/// Room limits and per-connection tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoomsConfig {
    /// Seats per room (2-4).
    #[serde(default = "default_max_players")]
    pub max_players: usize,

    /// Length of generated room codes (4-16).
    #[serde(default = "default_code_length")]
    pub code_length: usize,

    /// Longest accepted player name, in characters.
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,

    /// Outbound messages queued per connection before it counts as dead.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,

    /// Upper bound on a single socket send, in milliseconds.
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    /// Idle rooms are evicted after this many seconds (0 = never).
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// How often the idle sweeper runs, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl RoomsConfig {
    /// Pull out-of-range values back into their supported ranges.
    fn clamp(&mut self) {
        self.max_players = self.max_players.clamp(2, 4);
        self.code_length = self.code_length.clamp(4, ludo_types::MAX_ROOM_CODE_LENGTH);
        self.max_name_length = self.max_name_length.max(1);
        self.outbound_buffer = self.outbound_buffer.max(1);
        self.sweep_interval_secs = self.sweep_interval_secs.max(1);
    }
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            max_players: default_max_players(),
            code_length: default_code_length(),
            max_name_length: default_max_name_length(),
            outbound_buffer: default_outbound_buffer(),
            send_timeout_ms: default_send_timeout_ms(),
            idle_timeout_secs: default_idle_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8000
}

const fn default_max_players() -> usize {
    4
}

const fn default_code_length() -> usize {
    8
}

const fn default_max_name_length() -> usize {
    32
}

const fn default_outbound_buffer() -> usize {
    64
}

const fn default_send_timeout_ms() -> u64 {
    5000
}

const fn default_idle_timeout_secs() -> u64 {
    3600
}

const fn default_sweep_interval_secs() -> u64 {
    60
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert!(config.server.allowed_origins.is_empty());
        assert_eq!(config.rooms.max_players, 4);
        assert_eq!(config.rooms.code_length, 8);
        assert_eq!(config.rooms.idle_timeout_secs, 3600);
    }

    #[test]
    fn parse_partial_yaml() {
        let yaml = r#"
server:
  port: 9100
  allowed_origins:
    - "https://example.github.io"
rooms:
  outbound_buffer: 8
"#;
        let config = ServerConfig::parse(yaml).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.allowed_origins, vec!["https://example.github.io"]);
        assert_eq!(config.rooms.outbound_buffer, 8);
        assert_eq!(config.rooms.max_players, 4);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let yaml = "rooms:\n  max_players: 9\n  code_length: 40\n  outbound_buffer: 0\n";
        let config = ServerConfig::parse(yaml).unwrap();
        assert_eq!(config.rooms.max_players, 4);
        assert_eq!(config.rooms.code_length, 16);
        assert_eq!(config.rooms.outbound_buffer, 1);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = ServerConfig::parse("{}").unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let result = ServerConfig::parse("server: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = ServerConfig::load(Path::new("/nonexistent/ludo-config.yaml")).unwrap();
        assert_eq!(config.rooms, RoomsConfig::default());
    }
}
