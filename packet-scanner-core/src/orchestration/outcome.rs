//! Per-packet outcomes and the cycle summary.
//!
//! A packet leaves a cycle in exactly one of three shapes:
//!
//! | scan | side effect | status update | outcome | status afterwards |
//! |---|---|---|---|---|
//! | failed | - | - | `Deferred { Scan }` | AWAITING_SCAN |
//! | clean | store failed | - | `Deferred { DurableWrite }` | AWAITING_SCAN |
//! | clean | stored | failed | `Deferred { StatusUpdate }` | AWAITING_SCAN |
//! | clean | stored | ok | `Uploaded` | UPLOADED |
//! | infected | copy failed | - | `Deferred { RetryCopy }` | AWAITING_SCAN |
//! | infected | copied | failed | `Deferred { StatusUpdate }` | AWAITING_SCAN |
//! | infected | copied | ok | `Quarantined { cleanup }` | SCAN_RETRY |
//!
//! Cleanup runs only after the quarantine status committed; its failure is
//! reported as [`CleanupOutcome::Orphaned`] and never reverts the status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{PacketId, PacketStatus};
use crate::error::FailureKind;
use crate::ports::ScanVerdict;

/// Route chosen for a packet from its scan verdict.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Transition {
    /// Clean: write to the durable store.
    Upload,
    /// Infected: move to the retry area.
    Quarantine,
}

impl Transition {
    /// Route for `verdict`.
    pub fn decide(verdict: &ScanVerdict) -> Self {
        match verdict {
            ScanVerdict::Clean => Transition::Upload,
            ScanVerdict::Infected { .. } => Transition::Quarantine,
        }
    }
}

/// External step during which a packet was deferred to the next cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Locating or scanning the staging file.
    Scan,
    /// Writing the clean packet to the durable store.
    DurableWrite,
    /// Copying the infected packet to the retry area.
    RetryCopy,
    /// Committing the new status.
    StatusUpdate,
}

/// What happened to the scan-area copy of a quarantined packet.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "result", content = "kind")]
pub enum CleanupOutcome {
    /// The source copy was removed.
    Removed,
    /// The source copy is still in the scan area.
    Orphaned(FailureKind),
}

/// How one packet left the cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum PacketOutcome {
    /// Stored durably and marked uploaded.
    Uploaded,
    /// Copied to the retry area and marked for retry.
    Quarantined {
        /// Retry count after the increment.
        retry_count: u32,
        /// Result of removing the scan-area copy.
        cleanup: CleanupOutcome,
    },
    /// Left awaiting scan; the next cycle picks it up again.
    Deferred {
        /// Step that failed.
        stage: Stage,
        /// Failure kind of that step.
        kind: FailureKind,
    },
}

impl PacketOutcome {
    /// Status the store holds for the packet after this outcome, assuming no
    /// other writer touched the record.
    pub fn resulting_status(&self) -> PacketStatus {
        match self {
            PacketOutcome::Uploaded => PacketStatus::Uploaded,
            PacketOutcome::Quarantined { .. } => PacketStatus::ScanRetry,
            PacketOutcome::Deferred { .. } => PacketStatus::AwaitingScan,
        }
    }

    /// True for [`PacketOutcome::Deferred`].
    pub fn is_deferred(&self) -> bool {
        matches!(self, PacketOutcome::Deferred { .. })
    }
}

/// Outcome of one packet, with the error text when there was one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PacketReport {
    /// Packet the report is about.
    pub id: PacketId,
    /// Outcome of the packet.
    #[serde(flatten)]
    pub outcome: PacketOutcome,
    /// Error message of the failed step, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PacketReport {
    /// Report without an error message.
    pub fn new(id: PacketId, outcome: PacketOutcome) -> Self {
        Self {
            id,
            outcome,
            error: None,
        }
    }

    /// Attach the error message.
    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// Result of one [`run_cycle`](super::ScanDispatchOrchestrator::run_cycle).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CycleResult {
    /// When the cycle began.
    pub started_at: DateTime<Utc>,
    /// When the last packet finished.
    pub finished_at: DateTime<Utc>,
    /// Records returned by the batch fetch.
    pub fetched: usize,
    /// One report per fetched packet, in completion order.
    pub reports: Vec<PacketReport>,
    /// Set when the batch fetch failed; the cycle then processed nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_fetch_error: Option<String>,
}

impl CycleResult {
    pub(crate) fn fetch_failed(
        started_at: DateTime<Utc>,
        error: impl ToString,
    ) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            fetched: 0,
            reports: Vec::new(),
            batch_fetch_error: Some(error.to_string()),
        }
    }

    /// Packets that produced a report.
    pub fn processed(&self) -> usize {
        self.reports.len()
    }

    /// Packets sent to the durable store.
    pub fn uploaded(&self) -> usize {
        self.count(|outcome| matches!(outcome, PacketOutcome::Uploaded))
    }

    /// Packets moved to the retry area.
    pub fn quarantined(&self) -> usize {
        self.count(|outcome| matches!(outcome, PacketOutcome::Quarantined { .. }))
    }

    /// Packets left for the next cycle.
    pub fn deferred(&self) -> usize {
        self.count(PacketOutcome::is_deferred)
    }

    /// Quarantined packets whose source copy could not be removed.
    pub fn orphaned(&self) -> usize {
        self.count(|outcome| {
            matches!(
                outcome,
                PacketOutcome::Quarantined {
                    cleanup: CleanupOutcome::Orphaned(_),
                    ..
                }
            )
        })
    }

    /// True when the batch could not be fetched.
    pub fn is_fetch_failure(&self) -> bool {
        self.batch_fetch_error.is_some()
    }

    /// Report of a single packet.
    pub fn report_for(&self, id: &PacketId) -> Option<&PacketReport> {
        self.reports.iter().find(|report| &report.id == id)
    }

    fn count(&self, predicate: impl Fn(&PacketOutcome) -> bool) -> usize {
        self.reports
            .iter()
            .filter(|report| predicate(&report.outcome))
            .count()
    }
}
