use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::PathBuf};

use crate::{
    loader::error::ConfigLoadError,
    util::{parse_bool_var, parsed_var, path_var, string_var},
};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    /// `[database]` table.
    #[serde(default)]
    pub database: FileDatabaseConfig,
    /// `[staging]` table.
    #[serde(default)]
    pub staging: FileStagingConfig,
    /// `[scanner]` table.
    #[serde(default)]
    pub scanner: FileScannerConfig,
    /// `[durable]` table.
    #[serde(default)]
    pub durable: FileDurableConfig,
    /// `[dispatch]` table.
    #[serde(default)]
    pub dispatch: FileDispatchConfig,
    /// `[schedule]` table.
    #[serde(default)]
    pub schedule: FileScheduleConfig,
}

/// `[database]` as written in the file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    /// Postgres URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Pool size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

/// `[staging]` as written in the file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileStagingConfig {
    /// Packet file suffix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Name of the area to scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_area: Option<String>,
    /// Name of the quarantine area.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_area: Option<String>,
    /// Logical area name to directory.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub areas: BTreeMap<String, PathBuf>,
}

/// `[scanner]` as written in the file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileScannerConfig {
    /// `clamd` host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// `clamd` port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Bytes per stream chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
}

/// `[durable]` as written in the file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDurableConfig {
    /// Durable store root directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

/// `[dispatch]` as written in the file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDispatchConfig {
    /// Packets in flight per cycle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    /// Human readable duration, e.g. `"45s"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_timeout: Option<String>,
    /// `updated_by` value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

/// `[schedule]` as written in the file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileScheduleConfig {
    /// Human readable interval, e.g. `"5m"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    /// Exit non-zero on a failed batch fetch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_on_fetch_error: Option<bool>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    /// `PACKET_SCANNER_CONFIG`
    pub config_path: Option<PathBuf>,
    /// `DATABASE_URL`
    pub database_url: Option<String>,
    /// `PACKET_EXTENSION`
    pub packet_extension: Option<String>,
    /// `VIRUS_SCAN`
    pub virus_scan_dir: Option<PathBuf>,
    /// `VIRUS_SCAN_RETRY`
    pub virus_scan_retry_dir: Option<PathBuf>,
    /// `CLAMD_HOST`
    pub clamd_host: Option<String>,
    /// `CLAMD_PORT`
    pub clamd_port: Option<u16>,
    /// `DURABLE_STORE_ROOT`
    pub durable_root: Option<PathBuf>,
    /// `SCAN_MAX_CONCURRENCY`
    pub max_concurrency: Option<usize>,
    /// `SCAN_CALL_TIMEOUT`
    pub call_timeout: Option<String>,
    /// `SCAN_INTERVAL`
    pub schedule_interval: Option<String>,
    /// `SCAN_FAIL_ON_FETCH_ERROR`
    pub fail_on_fetch_error: Option<bool>,
}

impl EnvConfig {
    /// Read every supported variable from the process environment.
    ///
    /// Numeric and boolean variables that are set but malformed are errors.
    pub fn gather() -> Result<Self, ConfigLoadError> {
        Ok(Self {
            config_path: path_var(crate::constants::CONFIG_PATH_ENV),
            database_url: string_var("DATABASE_URL"),
            packet_extension: string_var("PACKET_EXTENSION"),
            virus_scan_dir: path_var("VIRUS_SCAN"),
            virus_scan_retry_dir: path_var("VIRUS_SCAN_RETRY"),
            clamd_host: string_var("CLAMD_HOST"),
            clamd_port: parsed_var("CLAMD_PORT")?,
            durable_root: path_var("DURABLE_STORE_ROOT"),
            max_concurrency: parsed_var("SCAN_MAX_CONCURRENCY")?,
            call_timeout: string_var("SCAN_CALL_TIMEOUT"),
            schedule_interval: string_var("SCAN_INTERVAL"),
            fail_on_fetch_error: parse_bool_var("SCAN_FAIL_ON_FETCH_ERROR")?,
        })
    }
}
