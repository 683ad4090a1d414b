use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::StagingArea;

/// Staging file suffix used when none is configured.
pub const DEFAULT_PACKET_EXTENSION: &str = ".zip";
/// Default `updated_by` value.
pub const DEFAULT_ACTOR: &str = "PACKET_SCANNER_JOB";

/// Knobs consumed by [`ScanDispatchOrchestrator`](super::ScanDispatchOrchestrator).
///
/// All fields carry defaults so a deployment only has to name what differs
/// from the standard `VIRUS_SCAN` / `VIRUS_SCAN_RETRY` layout.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Area holding packets that wait for a scan.
    pub scan_area: StagingArea,
    /// Area receiving infected packets until an external job requeues them.
    pub retry_area: StagingArea,
    /// Suffix appended to the packet identifier to find its staging file.
    pub packet_extension: String,
    /// Packets processed in parallel within one cycle.
    pub max_concurrency: usize,
    /// Upper bound for every single external call (milliseconds). A call
    /// that runs longer fails with the failure kind of that collaborator.
    pub call_timeout_ms: u64,
    /// Written into `updated_by` on every status change.
    pub actor: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            scan_area: StagingArea::virus_scan(),
            retry_area: StagingArea::virus_scan_retry(),
            packet_extension: DEFAULT_PACKET_EXTENSION.to_string(),
            max_concurrency: 4,
            call_timeout_ms: 60_000,
            actor: DEFAULT_ACTOR.to_string(),
        }
    }
}

impl DispatchConfig {
    /// Per-call timeout as a [`Duration`].
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Effective parallelism; never below one.
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}
