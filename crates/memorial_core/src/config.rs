//! Application configuration loaded from TOML.
//!
//! # Invariants
//! - Every section and key has a default; an empty file is a valid config.
//! - Discovery order: `$MEMORIAL_CONFIG`, then `./config/memorial.toml`,
//!   then built-in defaults.

use serde::Deserialize;
use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "MEMORIAL_CONFIG";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// Current directory could not be resolved during discovery.
    WorkingDir(std::io::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::WorkingDir(source) => {
                write!(f, "failed to resolve working directory: {source}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::WorkingDir(source) => Some(source),
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub memorial: MemorialConfig,
    pub import: ImportConfig,
}

impl AppConfig {
    /// Loads an explicit config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Finds the config file, falling back to defaults when none exists.
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map_err(ConfigError::WorkingDir)?
            .join("config")
            .join("memorial.toml");
        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`.
    pub level: String,
    /// Absolute directory for rolling log files; file logging is off when
    /// unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("memorial.sqlite3"),
        }
    }
}

/// Wording and rounding used by the boundary narrative.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MemorialConfig {
    pub datum: String,
    pub central_meridian: String,
    /// Print DMS the old way, without carrying `60.00"` into minutes.
    pub legacy_dms_rounding: bool,
}

impl Default for MemorialConfig {
    fn default() -> Self {
        Self {
            datum: "SIRGAS2000".to_string(),
            central_meridian: "51º WGr".to_string(),
            legacy_dms_rounding: false,
        }
    }
}

/// Default create/update policy for vertex imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub create_missing: bool,
    pub update_existing: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            create_missing: true,
            update_existing: true,
        }
    }
}
