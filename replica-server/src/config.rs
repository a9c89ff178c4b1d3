//! Configuration loading for replica-server.
//!
//! Configuration is loaded from a TOML file (default: `server.toml`).

use replica_core::InclusionPolicy;
use replica_types::{Value, DEFAULT_MAX_MESSAGE_SIZE};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for replica-server.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Listener configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Protocol configuration.
    #[serde(default)]
    pub protocol: ProtocolConfig,
    /// Entries loaded into the store at startup.
    #[serde(default)]
    pub entries: Vec<SeedEntry>,
}

/// An entry preloaded from the configuration file.
///
/// ```toml
/// [[entries]]
/// key = "motd"
/// version = 1
/// value = "hello"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    /// Key to store under.
    pub key: String,
    /// Version to store (default: 1).
    #[serde(default = "default_seed_version")]
    pub version: i64,
    /// Value, converted from its TOML form.
    pub value: toml::Value,
}

impl SeedEntry {
    /// The entry's value as a replication [`Value`].
    pub fn to_value(&self) -> Value {
        from_toml(&self.value)
    }
}

fn from_toml(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::from(s.as_str()),
        toml::Value::Integer(i) => Value::from(*i),
        toml::Value::Float(f) => Value::from(*f),
        toml::Value::Boolean(b) => Value::from(*b),
        toml::Value::Datetime(dt) => Value::from(dt.to_string()),
        toml::Value::Array(items) => Value::List(items.iter().map(from_toml).collect()),
        toml::Value::Table(table) => Value::Map(
            table
                .iter()
                .map(|(k, v)| (k.clone(), from_toml(v)))
                .collect(),
        ),
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the TCP listener (default: 127.0.0.1:8086).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Seconds a client has to send its request (default: 3, 0 disables).
    /// Connections that stay silent longer are dropped.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Seconds allowed for writing the response (default: 3, 0 disables).
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,
}

/// Protocol configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolConfig {
    /// Whether an equal version counts as newer (default: strictly-newer).
    #[serde(default)]
    pub inclusion: InclusionPolicy,
    /// Maximum request/response frame in bytes (default: 16MB).
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

// Default value functions
fn default_bind_address() -> String {
    "127.0.0.1:8086".to_string()
}

fn default_read_timeout_secs() -> u64 {
    3
}

fn default_write_timeout_secs() -> u64 {
    3
}

fn default_max_message_size() -> usize {
    DEFAULT_MAX_MESSAGE_SIZE
}

fn default_seed_version() -> i64 {
    1
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            read_timeout_secs: default_read_timeout_secs(),
            write_timeout_secs: default_write_timeout_secs(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            inclusion: InclusionPolicy::default(),
            max_message_size: default_max_message_size(),
        }
    }
}

impl ServerConfig {
    /// Read deadline, or `None` when `read_timeout_secs` is 0.
    pub fn read_timeout(&self) -> Option<Duration> {
        deadline(self.read_timeout_secs)
    }

    /// Write deadline, or `None` when `write_timeout_secs` is 0.
    pub fn write_timeout(&self) -> Option<Duration> {
        deadline(self.write_timeout_secs)
    }
}

fn deadline(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Config {
    /// Configuration listening on `bind_address` with all other defaults.
    pub fn with_bind_address(bind_address: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.server.bind_address = bind_address.into();
        config
    }

    /// Set the inclusion policy.
    pub fn with_inclusion(mut self, inclusion: InclusionPolicy) -> Self {
        self.protocol.inclusion = inclusion;
        self
    }

    /// Set the read deadline in seconds.
    pub fn with_read_timeout_secs(mut self, secs: u64) -> Self {
        self.server.read_timeout_secs = secs;
        self
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
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
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.server.bind_address, "127.0.0.1:8086");
        assert_eq!(config.server.read_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(config.protocol.inclusion, InclusionPolicy::StrictlyNewer);
        assert_eq!(config.protocol.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[server]
bind_address = "0.0.0.0:9000"
read_timeout_secs = 10

[protocol]
inclusion = "newer-or-equal"
max_message_size = 1048576
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:9000");
        assert_eq!(config.server.read_timeout_secs, 10);
        assert_eq!(config.server.write_timeout_secs, 3);
        assert_eq!(config.protocol.inclusion, InclusionPolicy::NewerOrEqual);
        assert_eq!(config.protocol.max_message_size, 1024 * 1024);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:8086");
        assert_eq!(config.protocol.inclusion, InclusionPolicy::StrictlyNewer);
    }

    #[test]
    fn unknown_inclusion_is_rejected() {
        let toml = r#"
[protocol]
inclusion = "sometimes"
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn from_file_reads_and_reports_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind_address = \"127.0.0.1:0\"").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:0");

        let missing = Config::from_file(std::path::Path::new("/nonexistent/server.toml"));
        assert!(matches!(missing, Err(ConfigError::ReadError { .. })));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "[server\nbind_address = ").unwrap();
        assert!(matches!(
            Config::from_file(bad.path()),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn seed_entries_convert_to_values() {
        let toml = r#"
[[entries]]
key = "motd"
value = "hello"

[[entries]]
key = "limits"
version = 4
value = { max = 10, ratio = 0.5, tags = ["a", "b"], on = true }
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.entries.len(), 2);

        let motd = &config.entries[0];
        assert_eq!(motd.version, 1);
        assert_eq!(motd.to_value(), Value::from("hello"));

        let limits = &config.entries[1];
        assert_eq!(limits.version, 4);
        let map = limits.to_value();
        let map = map.as_map().unwrap();
        assert_eq!(map["max"], Value::from(10));
        assert_eq!(map["ratio"], Value::from(0.5));
        assert_eq!(map["on"], Value::from(true));
        assert_eq!(
            map["tags"],
            Value::List(vec![Value::from("a"), Value::from("b")])
        );
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        let toml = r#"
[server]
read_timeout_secs = 0
write_timeout_secs = 0
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.read_timeout(), None);
        assert_eq!(config.server.write_timeout(), None);

        let config = Config::default().with_read_timeout_secs(2);
        assert_eq!(config.server.read_timeout(), Some(Duration::from_secs(2)));
        assert_eq!(config.server.write_timeout(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn builder_overrides() {
        let config = Config::with_bind_address("127.0.0.1:0")
            .with_inclusion(InclusionPolicy::NewerOrEqual)
            .with_read_timeout_secs(1);
        assert_eq!(config.server.bind_address, "127.0.0.1:0");
        assert_eq!(config.protocol.inclusion, InclusionPolicy::NewerOrEqual);
        assert_eq!(config.server.read_timeout_secs, 1);
    }
}
