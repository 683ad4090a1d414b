use std::path::PathBuf;

use thiserror::Error;

use crate::validation::ConfigGuardRailError;

/// Reasons configuration loading can fail.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// An explicitly requested config file does not exist.
    #[error("configuration file missing: {path}")]
    MissingConfig {
        /// Requested path.
        path: PathBuf,
    },
    /// The config file could not be read.
    #[error("failed to read configuration {path}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The config file is not valid TOML for [`FileConfig`](crate::models::sources::FileConfig).
    #[error("failed to parse configuration {path}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },
    /// The database URL does not parse.
    #[error("invalid database URL")]
    InvalidDatabaseUrl {
        /// Underlying error.
        #[source]
        source: url::ParseError,
    },
    /// A duration setting is not a `humantime` duration.
    #[error("invalid duration '{value}' for {field}")]
    InvalidDuration {
        /// Setting name.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Underlying error.
        #[source]
        source: humantime::DurationError,
    },
    /// An environment variable is set to a value of the wrong type.
    #[error("invalid value '{value}' for {name}; expected {expected}")]
    InvalidEnvValue {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
        /// Description of what would have been accepted.
        expected: &'static str,
    },
    /// The composed configuration violates a guard rail.
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    /// The `.env` file exists but could not be parsed.
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}
