//! Configuration library for the packet scanner job.
//!
//! Settings are composed from an optional `packet-scanner.toml`, a `.env`
//! file and process environment variables (environment wins). The composed
//! [`Config`] is checked against guard rails before it is handed out, and
//! soft problems are collected as [`ConfigWarnings`] for the caller to log.

/// Defaults and well-known variable names.
pub mod constants;
/// File discovery, `.env` loading and composition.
pub mod loader;
/// Composed configuration types.
pub mod models;
/// Environment parsing helpers.
pub mod util;
/// Guard rails and warnings.
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, error::ConfigLoadError};
pub use models::{
    Config, ConfigMetadata, DatabaseConfig, DispatchSettings, DurableConfig,
    ScannerConfig, ScheduleConfig, StagingConfig,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
