/// Raw file and environment inputs.
pub mod sources;

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use packet_scanner_core::{domain::StagingArea, orchestration::DispatchConfig};

/// Fully composed and validated job configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Status store connection.
    pub database: DatabaseConfig,
    /// Staging areas and packet file naming.
    pub staging: StagingConfig,
    /// ClamAV daemon.
    pub scanner: ScannerConfig,
    /// Durable store location.
    pub durable: DurableConfig,
    /// Per-cycle parallelism and timeouts.
    pub dispatch: DispatchSettings,
    /// Interval mode and exit behaviour.
    pub schedule: ScheduleConfig,
    /// Where the settings came from.
    pub metadata: ConfigMetadata,
}

impl Config {
    /// Orchestrator settings derived from the staging and dispatch sections.
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            scan_area: self.staging.scan_area.clone(),
            retry_area: self.staging.retry_area.clone(),
            packet_extension: self.staging.extension.clone(),
            max_concurrency: self.dispatch.max_concurrency,
            call_timeout_ms: u64::try_from(self.dispatch.call_timeout.as_millis())
                .unwrap_or(u64::MAX),
            actor: self.dispatch.actor.clone(),
        }
    }
}

/// `[database]` section.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Postgres URL of the status table. Guard rails require it.
    pub primary_url: Option<String>,
    /// Pool size.
    pub max_connections: u32,
}

/// `[staging]` section.
#[derive(Debug, Clone)]
pub struct StagingConfig {
    /// Suffix appended to a packet identifier, always with a leading dot.
    pub extension: String,
    /// Area scanned each cycle.
    pub scan_area: StagingArea,
    /// Area infected packets are copied to.
    pub retry_area: StagingArea,
    /// Directory backing each logical area.
    pub areas: BTreeMap<StagingArea, PathBuf>,
}

impl StagingConfig {
    /// Directory mapped to `area`.
    pub fn directory(&self, area: &StagingArea) -> Option<&Path> {
        self.areas.get(area).map(PathBuf::as_path)
    }
}

/// `[scanner]` section.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// `clamd` host.
    pub host: String,
    /// `clamd` TCP port.
    pub port: u16,
    /// Bytes per `INSTREAM` chunk.
    pub chunk_size: usize,
}

/// `[durable]` section.
#[derive(Debug, Clone)]
pub struct DurableConfig {
    /// Root directory of the durable store.
    pub root: PathBuf,
}

/// `[dispatch]` section.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Packets processed in parallel within a cycle.
    pub max_concurrency: usize,
    /// Bound on every external call.
    pub call_timeout: Duration,
    /// Written into `updated_by`.
    pub actor: String,
}

/// `[schedule]` section.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Pause between cycle starts in `schedule` mode.
    pub interval: Duration,
    /// Exit non-zero when the batch fetch of a cycle failed.
    pub fail_on_fetch_error: bool,
}

/// Provenance of the loaded settings.
#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    /// Config file that was read, if any.
    pub config_path: Option<PathBuf>,
    /// Whether a `.env` file was applied.
    pub env_file_loaded: bool,
}
