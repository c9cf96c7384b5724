//! Application configuration management.
//!
//! Configuration is layered with the `config` crate:
//!
//! 1. built-in defaults
//! 2. an optional TOML file (see [`default_config_path`])
//! 3. environment variables such as `GEOTRACK__PREFERENCES__MONITORING=quiet`
//!
//! The `[preferences]` section is the snapshot the engine reads on every
//! event; the other sections configure the engine's collaborators and the
//! HTTP host.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::MonitoringMode;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "GEOTRACK";

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "GEOTRACK_CONFIG";

static TRACKER_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{1,2}$").expect("tracker id pattern is valid"));

/// Errors from loading, saving or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Layering or deserialization failed.
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    /// The file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    WriteError {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration could not be serialized to TOML.
    #[error("failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A single field is invalid.
    #[error("invalid {field}: {message}")]
    ValidationError {
        /// Dotted field name.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields are invalid.
    #[error("{} configuration errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Whether `tid` is a valid tracker id (one or two alphanumerics).
#[must_use]
pub fn is_valid_tracker_id(tid: &str) -> bool {
    TRACKER_ID_RE.is_match(tid)
}

/// User preferences read by the engine on every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Preferences {
    /// Samples with accuracy at or above this many metres are ignored.
    /// `0` disables the check.
    #[schema(example = 0)]
    pub accuracy_threshold: u32,

    /// Derive waypoint transitions from raw location samples.
    #[schema(example = true)]
    pub fused_region_detection: bool,

    /// Which report types may produce location messages.
    pub monitoring: MonitoringMode,

    /// Embed battery, connectivity and Wi-Fi data in location messages.
    #[schema(example = true)]
    pub extended_data: bool,

    /// Short id identifying this device in messages.
    #[schema(example = "gt")]
    pub tracker_id: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            accuracy_threshold: 0,
            fused_region_detection: true,
            monitoring: MonitoringMode::Significant,
            extended_data: true,
            tracker_id: "gt".to_string(),
        }
    }
}

/// Engine tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Timeout for each store or queue call, in milliseconds.
    pub collaborator_timeout_ms: u64,

    /// Capacity of the outbound message channel.
    pub outbound_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            collaborator_timeout_ms: 5_000,
            outbound_queue_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Collaborator timeout as a [`Duration`].
    #[must_use]
    pub const fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }
}

/// HTTP host settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind_address: String,

    /// How many recent outbound messages the outbox keeps.
    pub outbox_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            outbox_capacity: 500,
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the waypoint database. Platform default if unset.
    pub data_dir: Option<PathBuf>,
}

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine preferences.
    pub preferences: Preferences,
    /// Engine tuning.
    pub engine: EngineConfig,
    /// HTTP host.
    pub server: ServerConfig,
    /// Persistence.
    pub storage: StorageConfig,
}

/// Default configuration file location.
///
/// `GEOTRACK_CONFIG` wins if set. Otherwise `/etc/geotrack/config.toml` on
/// Linux and the platform config directory elsewhere.
#[must_use]
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/etc/geotrack/config.toml")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "geotrack").map_or_else(
            || PathBuf::from("config.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }
}

impl Config {
    /// Load from `path` layered over defaults and under the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unparseable, or the result
    /// fails validation.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Self::build(Some(path))
    }

    /// Like [`Config::load`], but a missing file falls back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file is unparseable or the result
    /// fails validation.
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        Self::build(path.exists().then_some(path))
    }

    fn build(path: Option<&Path>) -> ConfigResult<Self> {
        let mut builder =
            ::config::Config::builder().add_source(::config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::from(path).format(::config::FileFormat::Toml),
            );
        }

        let config: Self = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Save to `path` as TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::WriteError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check every field, collecting all problems.
    ///
    /// # Errors
    ///
    /// Returns the single error, or [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if !is_valid_tracker_id(&self.preferences.tracker_id) {
            errors.push(invalid(
                "preferences.tracker_id",
                format!(
                    "'{}' must be one or two letters or digits",
                    self.preferences.tracker_id
                ),
            ));
        }
        if self.engine.collaborator_timeout_ms == 0 {
            errors.push(invalid("engine.collaborator_timeout_ms", "must be greater than zero"));
        }
        if self.engine.outbound_queue_capacity == 0 {
            errors.push(invalid("engine.outbound_queue_capacity", "must be greater than zero"));
        }
        if self.server.outbox_capacity == 0 {
            errors.push(invalid("server.outbox_capacity", "must be greater than zero"));
        }
        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(invalid(
                "server.bind_address",
                format!("'{}' is not a socket address", self.server.bind_address),
            ));
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.preferences.monitoring, MonitoringMode::Significant);
        assert_eq!(config.engine.collaborator_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_tracker_id_validation() {
        assert!(is_valid_tracker_id("a"));
        assert!(is_valid_tracker_id("Z9"));
        assert!(!is_valid_tracker_id(""));
        assert!(!is_valid_tracker_id("abc"));
        assert!(!is_valid_tracker_id("a-"));
    }

    #[test]
    fn test_multiple_validation_errors_are_collected() {
        let mut config = Config::default();
        config.preferences.tracker_id = "toolong".into();
        config.engine.collaborator_timeout_ms = 0;
        config.server.bind_address = "nowhere".into();

        match config.validate() {
            Err(ConfigError::MultipleValidationErrors(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.preferences.tracker_id, "gt");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[preferences]
accuracy_threshold = 50
monitoring = "manual"
tracker_id = "xy"

[engine]
collaborator_timeout_ms = 250
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.preferences.accuracy_threshold, 50);
        assert_eq!(config.preferences.monitoring, MonitoringMode::Manual);
        assert_eq!(config.preferences.tracker_id, "xy");
        assert!(config.preferences.fused_region_detection);
        assert_eq!(config.engine.collaborator_timeout_ms, 250);
        assert_eq!(config.engine.outbound_queue_capacity, 256);
    }

    #[test]
    fn test_invalid_file_values_fail_validation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[preferences]\ntracker_id = \"abc\"\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.preferences.monitoring = MonitoringMode::Quiet;
        config.preferences.extended_data = false;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.preferences, config.preferences);
    }
}
