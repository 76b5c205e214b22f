//! Application configuration management.
//!
//! Configuration is layered, later layers winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`ROLLCALL_CONFIG`, or the platform config path)
//! 3. Environment variables of the form `ROLLCALL__SECTION__KEY`
//!
//! Covers the geofence radius, the timezone that splits calendar days, the
//! storage backend, the HTTP listener, and student enrollment defaults.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::admission::AdmissionPolicy;
use crate::calendar::CalendarPolicy;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "ROLLCALL_CONFIG";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "ROLLCALL";

static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)+$")
        .expect("valid domain regex")
});

/// Errors from loading, saving, or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    /// The configuration file could not be read.
    #[error("Failed to read {path}: {source}")]
    ReadError {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be written.
    #[error("Failed to write {path}: {source}")]
    WriteError {
        /// File path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A source could not be parsed into configuration.
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),

    /// Configuration could not be serialized to TOML.
    #[error("Failed to serialize configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// One field holds an invalid value.
    #[error("Invalid {field}: {message}")]
    ValidationError {
        /// Dotted field path.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Several fields hold invalid values.
    #[error("{} configuration errors", .0.len())]
    MultipleValidationErrors(Vec<ConfigError>),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Geofence settings.
    pub geofence: GeofenceConfig,

    /// Calendar-day settings.
    pub calendar: CalendarConfig,

    /// Where documents are kept.
    pub storage: StorageConfig,

    /// HTTP listener settings.
    pub server: ServerConfig,

    /// Student enrollment defaults.
    pub enrollment: EnrollmentConfig,
}

/// Geofence settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofenceConfig {
    /// How far from the classroom anchor a scan may be, in meters.
    pub radius_m: f64,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self { radius_m: 50.0 }
    }
}

/// Calendar-day settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// IANA timezone whose midnight starts a new attendance day.
    #[serde(with = "timezone_serde")]
    pub timezone: Tz,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::UTC,
        }
    }
}

/// Which store backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Keep everything in memory; lost on restart.
    #[default]
    Memory,
    /// One JSON file per document under `data_dir`.
    Json,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend to use.
    pub backend: StorageBackend,

    /// Data directory for the JSON backend. Defaults to the platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// The configured data directory, or the platform default.
    ///
    /// # Errors
    ///
    /// Returns an error if no default data directory can be determined.
    pub fn resolved_data_dir(&self) -> ConfigResult<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,

    /// Port to bind.
    pub port: u16,

    /// JSON file logging instead of pretty stdout logging.
    pub production: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            production: false,
        }
    }
}

/// Student enrollment defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollmentConfig {
    /// Domain of generated student email addresses.
    pub email_domain: String,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            email_domain: "uni.edu".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from the default file location plus environment.
    ///
    /// A missing file is not an error; defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or validation fails.
    pub fn load() -> ConfigResult<Self> {
        let path = Self::config_path()?;
        Self::load_from(Some(&path))
    }

    /// Loads configuration from `path` (if given and present) plus environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or validation fails.
    pub fn load_from(path: Option<&Path>) -> ConfigResult<Self> {
        Self::build(path, None)
    }

    /// Loads configuration, taking environment overrides from `env` instead
    /// of the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or validation fails.
    pub fn load_with_env(path: Option<&Path>, env: HashMap<String, String>) -> ConfigResult<Self> {
        Self::build(path, Some(env))
    }

    fn build(path: Option<&Path>, env: Option<HashMap<String, String>>) -> ConfigResult<Self> {
        let mut builder = config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let loaded: Self = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Writes the configuration to `path` as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::WriteError {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::WriteError {
            path: path.display().to_string(),
            source,
        })
    }

    /// Checks every field, reporting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for a single problem or
    /// `MultipleValidationErrors` for several.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        let radius = self.geofence.radius_m;
        if !radius.is_finite() || radius <= 0.0 {
            errors.push(ConfigError::ValidationError {
                field: "geofence.radius_m".into(),
                message: format!("must be a positive number of meters (got {radius})"),
            });
        }

        if self.server.host.trim().is_empty() {
            errors.push(ConfigError::ValidationError {
                field: "server.host".into(),
                message: "must not be empty".into(),
            });
        }

        if !DOMAIN_RE.is_match(&self.enrollment.email_domain) {
            errors.push(ConfigError::ValidationError {
                field: "enrollment.email_domain".into(),
                message: format!("'{}' is not a domain name", self.enrollment.email_domain),
            });
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }

    /// The admission policy this configuration describes.
    #[must_use]
    pub const fn admission_policy(&self) -> AdmissionPolicy {
        AdmissionPolicy {
            radius_m: self.geofence.radius_m,
        }
    }

    /// The calendar policy this configuration describes.
    #[must_use]
    pub const fn calendar_policy(&self) -> CalendarPolicy {
        CalendarPolicy::new(self.calendar.timezone)
    }

    /// The configuration file path.
    ///
    /// `ROLLCALL_CONFIG` wins when set. Otherwise `/etc/rollcall/config.toml`
    /// on Linux and the platform config directory elsewhere.
    ///
    /// # Errors
    ///
    /// Returns an error if no config directory can be determined.
    pub fn config_path() -> ConfigResult<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        #[cfg(target_os = "linux")]
        {
            Ok(PathBuf::from("/etc/rollcall/config.toml"))
        }
        #[cfg(not(target_os = "linux"))]
        {
            let dirs = directories::ProjectDirs::from("", "", "rollcall")
                .ok_or_else(|| ConfigError::NotFound("config directory".into()))?;
            Ok(dirs.config_dir().join("config.toml"))
        }
    }
}

/// The default data directory for the JSON store.
///
/// `/var/lib/rollcall` on Linux, the platform data directory elsewhere.
///
/// # Errors
///
/// Returns an error if no data directory can be determined.
pub fn default_data_dir() -> ConfigResult<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        Ok(PathBuf::from("/var/lib/rollcall"))
    }
    #[cfg(not(target_os = "linux"))]
    {
        let dirs = directories::ProjectDirs::from("", "", "rollcall")
            .ok_or_else(|| ConfigError::NotFound("data directory".into()))?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// Whether `name` is a known IANA timezone.
#[must_use]
pub fn is_valid_timezone(name: &str) -> bool {
    name.parse::<Tz>().is_ok()
}

mod timezone_serde {
    use chrono_tz::Tz;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(tz: &Tz, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(tz.name())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Tz, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
