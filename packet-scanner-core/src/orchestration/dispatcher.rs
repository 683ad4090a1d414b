use std::{fmt, future::Future, path::Path, sync::Arc};

use chrono::Utc;
use futures::{StreamExt, stream};
use tracing::{Instrument, debug, debug_span, error, info, warn};

use crate::{
    domain::{PacketStatus, PacketStatusRecord, PendingPacket},
    error::{FailureKind, PacketError, Result},
    ports::{DurableStore, StagingFileManager, StatusStore, VirusScanner},
};

use super::{
    config::DispatchConfig,
    outcome::{
        CleanupOutcome, CycleResult, PacketOutcome, PacketReport, Stage,
        Transition,
    },
};

/// External collaborators driven by the orchestrator.
#[derive(Clone)]
pub struct DispatchPorts {
    /// Source of the batch and target of status updates.
    pub status_store: Arc<dyn StatusStore>,
    /// Malware scanner.
    pub scanner: Arc<dyn VirusScanner>,
    /// Staging area file operations.
    pub staging: Arc<dyn StagingFileManager>,
    /// Destination of clean packets.
    pub durable: Arc<dyn DurableStore>,
}

impl DispatchPorts {
    /// Bundle the four collaborators.
    pub fn new(
        status_store: Arc<dyn StatusStore>,
        scanner: Arc<dyn VirusScanner>,
        staging: Arc<dyn StagingFileManager>,
        durable: Arc<dyn DurableStore>,
    ) -> Self {
        Self {
            status_store,
            scanner,
            staging,
            durable,
        }
    }
}

impl fmt::Debug for DispatchPorts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchPorts")
            .field("status_store", &"StatusStore")
            .field("scanner", &"VirusScanner")
            .field("staging", &"StagingFileManager")
            .field("durable", &"DurableStore")
            .finish()
    }
}

/// Scans every packet awaiting a scan and routes it to the durable store or
/// the retry area.
///
/// The orchestrator keeps no state between cycles. Each cycle re-reads the
/// AWAITING_SCAN batch from the status store, so any packet whose branch did
/// not fully commit is simply picked up again next time. Side effects are
/// therefore at-least-once.
#[derive(Debug)]
pub struct ScanDispatchOrchestrator {
    ports: DispatchPorts,
    config: DispatchConfig,
}

impl ScanDispatchOrchestrator {
    /// Build an orchestrator over `ports`.
    pub fn new(ports: DispatchPorts, config: DispatchConfig) -> Self {
        Self { ports, config }
    }

    /// Settings in effect.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Process the current AWAITING_SCAN batch.
    ///
    /// Never fails. A batch fetch failure ends the cycle with zero packets
    /// processed and is recorded in [`CycleResult::batch_fetch_error`].
    pub async fn run_cycle(&self) -> CycleResult {
        let started_at = Utc::now();

        let records = match self
            .bounded(
                FailureKind::StoreUnavailable,
                "status listing",
                self.ports
                    .status_store
                    .list_by_status(PacketStatus::AwaitingScan),
            )
            .await
        {
            Ok(records) => records,
            Err(err) => {
                error!(
                    target: "scan::cycle",
                    error = %err,
                    "packet status table is not accessible; ending cycle"
                );
                return CycleResult::fetch_failed(started_at, err);
            }
        };

        let fetched = records.len();
        debug!(
            target: "scan::cycle",
            fetched,
            concurrency = self.config.concurrency(),
            "starting scan cycle"
        );

        let reports: Vec<PacketReport> = stream::iter(records)
            .map(|record| self.process(record))
            .buffer_unordered(self.config.concurrency())
            .collect()
            .await;

        let result = CycleResult {
            started_at,
            finished_at: Utc::now(),
            fetched,
            reports,
            batch_fetch_error: None,
        };

        info!(
            target: "scan::summary",
            fetched = result.fetched,
            uploaded = result.uploaded(),
            quarantined = result.quarantined(),
            deferred = result.deferred(),
            orphaned = result.orphaned(),
            "scan cycle finished"
        );

        result
    }

    async fn process(&self, record: PacketStatusRecord) -> PacketReport {
        let packet =
            PendingPacket::from_record(&record, &self.config.packet_extension);
        let span = debug_span!(
            "packet",
            packet_id = %packet.id,
            retry_count = record.effective_retry_count()
        );

        async move {
            let path = match self
                .ports
                .staging
                .packet_path(&self.config.scan_area, &packet)
            {
                Ok(path) => path,
                Err(err) => return deferred(&packet, Stage::Scan, err),
            };

            let verdict = match self
                .bounded(
                    FailureKind::ScanFailure,
                    "virus scan",
                    self.ports.scanner.scan_file(&path),
                )
                .await
            {
                Ok(verdict) => verdict,
                Err(err) => {
                    error!(
                        target: "scan::packet",
                        error = %err,
                        path = %path.display(),
                        "virus scan for the packet failed"
                    );
                    return deferred(&packet, Stage::Scan, err);
                }
            };

            match Transition::decide(&verdict) {
                Transition::Upload => self.upload(record, &packet, &path).await,
                Transition::Quarantine => {
                    debug!(target: "scan::packet", ?verdict, "packet is infected");
                    self.quarantine(record, &packet).await
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn upload(
        &self,
        record: PacketStatusRecord,
        packet: &PendingPacket,
        path: &Path,
    ) -> PacketReport {
        if let Err(err) = self
            .bounded(
                FailureKind::ConnectionUnavailable,
                "durable store write",
                self.ports.durable.store_packet(&packet.id, path),
            )
            .await
        {
            error!(
                target: "scan::packet",
                error = %err,
                "durable store is not accessible"
            );
            return deferred(packet, Stage::DurableWrite, err);
        }

        let updated = record.into_uploaded(&self.config.actor);
        if let Err(err) = self.commit(&updated).await {
            return deferred(packet, Stage::StatusUpdate, err);
        }

        info!(
            target: "scan::packet",
            "packet is clean and has been sent to the durable store"
        );
        PacketReport::new(packet.id.clone(), PacketOutcome::Uploaded)
    }

    async fn quarantine(
        &self,
        record: PacketStatusRecord,
        packet: &PendingPacket,
    ) -> PacketReport {
        let scan_area = &self.config.scan_area;
        let retry_area = &self.config.retry_area;

        if let Err(err) = self
            .bounded(
                FailureKind::IoFailure,
                "retry area copy",
                self.ports.staging.copy(packet, scan_area, retry_area),
            )
            .await
        {
            error!(
                target: "scan::packet",
                error = %err,
                area = %retry_area,
                "retry area is not accessible"
            );
            return deferred(packet, Stage::RetryCopy, err);
        }

        let updated = record.into_quarantined(&self.config.actor);
        let retry_count = updated.effective_retry_count();
        if let Err(err) = self.commit(&updated).await {
            return deferred(packet, Stage::StatusUpdate, err);
        }

        let (cleanup, cleanup_error) = match self
            .bounded(
                FailureKind::RetryAreaUnavailable,
                "scan area cleanup",
                self.ports.staging.cleanup(scan_area, retry_area, packet),
            )
            .await
        {
            Ok(()) => (CleanupOutcome::Removed, None),
            Err(err) => {
                warn!(
                    target: "scan::packet",
                    error = %err,
                    area = %scan_area,
                    "source copy could not be removed; leaving it in place"
                );
                (CleanupOutcome::Orphaned(err.kind()), Some(err))
            }
        };

        info!(
            target: "scan::packet",
            retry_count,
            "packet is infected and has been sent to the retry area"
        );
        let report = PacketReport::new(
            packet.id.clone(),
            PacketOutcome::Quarantined {
                retry_count,
                cleanup,
            },
        );
        match cleanup_error {
            Some(err) => report.with_error(err),
            None => report,
        }
    }

    async fn commit(&self, record: &PacketStatusRecord) -> Result<()> {
        let result = self
            .bounded(
                FailureKind::StoreUnavailable,
                "status update",
                self.ports.status_store.update(record),
            )
            .await;
        if let Err(err) = &result {
            error!(
                target: "scan::store",
                error = %err,
                status = %record.status,
                "status update failed; packet stays awaiting scan"
            );
        }
        result
    }

    /// Run one external call under the configured timeout. Elapsed calls
    /// fail with `kind`.
    async fn bounded<T, F>(&self, kind: FailureKind, what: &str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.config.call_timeout(), call).await {
            Ok(result) => result,
            Err(_) => Err(PacketError::timed_out(kind, what)),
        }
    }
}

fn deferred(packet: &PendingPacket, stage: Stage, err: PacketError) -> PacketReport {
    PacketReport::new(
        packet.id.clone(),
        PacketOutcome::Deferred {
            stage,
            kind: err.kind(),
        },
    )
    .with_error(err)
}
