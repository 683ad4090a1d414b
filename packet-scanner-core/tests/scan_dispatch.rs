mod support;

use std::time::Duration;

use packet_scanner_core::{
    FailureKind,
    domain::PacketStatus,
    orchestration::{CleanupOutcome, DispatchConfig, PacketOutcome, Stage},
};
use support::{Harness, Script};

#[tokio::test]
async fn clean_packet_is_stored_and_marked_uploaded() {
    let h = Harness::new();
    let id = h.stage("10001100770000320250115101010").await;

    let result = h.orchestrator().run_cycle().await;

    assert_eq!(result.fetched, 1);
    assert_eq!(result.uploaded(), 1);
    assert_eq!(
        result.report_for(&id).map(|r| r.outcome),
        Some(PacketOutcome::Uploaded)
    );
    assert_eq!(h.durable.writes_for(&id), 1);
    assert!(h.durable.object_path(&id).exists());

    let record = h.record(&id).await;
    assert_eq!(record.status, PacketStatus::Uploaded);
    assert_eq!(record.retry_count, None);
    assert_eq!(record.updated_by.as_deref(), Some("PACKET_SCANNER_JOB"));
    assert!(record.updated_at.is_some());
    // Clean packets are not removed from the scan area.
    assert!(h.scan_path(&id).exists());
}

#[tokio::test]
async fn infected_packet_without_retry_count_is_quarantined_with_one() {
    let h = Harness::new();
    let id = h.stage("10001100770000320250115101011").await;
    h.scanner.set(&id, Script::Infected);

    let result = h.orchestrator().run_cycle().await;

    assert_eq!(
        result.report_for(&id).map(|r| r.outcome),
        Some(PacketOutcome::Quarantined {
            retry_count: 1,
            cleanup: CleanupOutcome::Removed,
        })
    );
    let record = h.record(&id).await;
    assert_eq!(record.status, PacketStatus::ScanRetry);
    assert_eq!(record.retry_count, Some(1));
    assert!(h.retry_path(&id).exists());
    assert!(!h.scan_path(&id).exists());
    assert_eq!(h.durable.total_writes(), 0);
}

#[tokio::test]
async fn infected_packet_increments_existing_retry_count() {
    let h = Harness::new();
    let id = h
        .stage_record("10001100770000320250115101012", Some(2))
        .await;
    h.scanner.set(&id, Script::Infected);

    h.orchestrator().run_cycle().await;

    assert_eq!(h.record(&id).await.retry_count, Some(3));
}

#[tokio::test]
async fn failed_cleanup_keeps_quarantine_and_reports_orphan() {
    let h = Harness::new();
    let id = h.stage("10001100770000320250115101013").await;
    h.scanner.set(&id, Script::Infected);
    h.staging.set_cleanup_failure(true);

    let result = h.orchestrator().run_cycle().await;

    let report = result.report_for(&id).expect("report");
    assert_eq!(
        report.outcome,
        PacketOutcome::Quarantined {
            retry_count: 1,
            cleanup: CleanupOutcome::Orphaned(FailureKind::RetryAreaUnavailable),
        }
    );
    assert!(report.error.is_some());
    assert_eq!(result.orphaned(), 1);

    let record = h.record(&id).await;
    assert_eq!(record.status, PacketStatus::ScanRetry);
    assert_eq!(record.retry_count, Some(1));
    assert!(h.scan_path(&id).exists());
    assert!(h.retry_path(&id).exists());
}

#[tokio::test]
async fn scan_failure_leaves_record_untouched() {
    let h = Harness::new();
    let id = h.stage("10001100770000320250115101014").await;
    h.scanner.set(&id, Script::Fail);
    let before = h.record(&id).await;

    let result = h.orchestrator().run_cycle().await;

    assert_eq!(
        result.report_for(&id).map(|r| r.outcome),
        Some(PacketOutcome::Deferred {
            stage: Stage::Scan,
            kind: FailureKind::ScanFailure,
        })
    );
    assert_eq!(h.record(&id).await, before);
    assert_eq!(h.store.update_count(), 0);
    assert_eq!(h.durable.total_writes(), 0);
    assert_eq!(h.staging.copies(), 0);
}

#[tokio::test]
async fn listing_failure_processes_nothing() {
    let h = Harness::new();
    let id = h.stage("10001100770000320250115101015").await;
    h.store.set_listing_failure(true);

    let result = h.orchestrator().run_cycle().await;

    assert!(result.is_fetch_failure());
    assert_eq!(result.processed(), 0);
    assert_eq!(h.scanner.calls(), 0);
    assert_eq!(h.durable.total_writes(), 0);
    assert_eq!(h.staging.copies(), 0);
    assert_eq!(h.record(&id).await.status, PacketStatus::AwaitingScan);

    // The next cycle picks the packet up once the store is back.
    h.store.set_listing_failure(false);
    let result = h.orchestrator().run_cycle().await;
    assert!(!result.is_fetch_failure());
    assert_eq!(result.uploaded(), 1);
}

#[tokio::test]
async fn settled_packets_are_not_touched_again() {
    let h = Harness::new();
    let clean = h.stage("10001100770000320250115101016").await;
    let infected = h.stage("10001100770000320250115101017").await;
    h.scanner.set(&infected, Script::Infected);
    let orchestrator = h.orchestrator();

    orchestrator.run_cycle().await;
    let scans = h.scanner.calls();
    let updates = h.store.update_count();

    let second = orchestrator.run_cycle().await;

    assert_eq!(second.fetched, 0);
    assert_eq!(h.scanner.calls(), scans);
    assert_eq!(h.store.update_count(), updates);
    assert_eq!(h.durable.writes_for(&clean), 1);
    assert_eq!(h.staging.copies(), 1);
    assert_eq!(h.record(&infected).await.retry_count, Some(1));
}

#[tokio::test]
async fn durable_store_outage_is_retried_next_cycle() {
    let h = Harness::new();
    let id = h.stage("10001100770000320250115101018").await;
    h.durable.fail_next(1);
    let orchestrator = h.orchestrator();

    let first = orchestrator.run_cycle().await;
    assert_eq!(
        first.report_for(&id).map(|r| r.outcome),
        Some(PacketOutcome::Deferred {
            stage: Stage::DurableWrite,
            kind: FailureKind::ConnectionUnavailable,
        })
    );
    let record = h.record(&id).await;
    assert_eq!(record.status, PacketStatus::AwaitingScan);
    assert_eq!(record.retry_count, None);

    let second = orchestrator.run_cycle().await;
    assert_eq!(second.uploaded(), 1);
    assert_eq!(h.record(&id).await.status, PacketStatus::Uploaded);
    assert_eq!(h.durable.writes_for(&id), 1);
}

#[tokio::test]
async fn status_update_failure_after_upload_repeats_the_write() {
    let h = Harness::new();
    let id = h.stage("10001100770000320250115101019").await;
    h.store.set_update_failure(&id, true).await;
    let orchestrator = h.orchestrator();

    let first = orchestrator.run_cycle().await;
    assert_eq!(
        first.report_for(&id).map(|r| r.outcome),
        Some(PacketOutcome::Deferred {
            stage: Stage::StatusUpdate,
            kind: FailureKind::StoreUnavailable,
        })
    );
    assert_eq!(h.durable.writes_for(&id), 1);
    assert_eq!(h.record(&id).await.status, PacketStatus::AwaitingScan);

    h.store.set_update_failure(&id, false).await;
    orchestrator.run_cycle().await;

    // At-least-once: the durable write happened twice.
    assert_eq!(h.durable.writes_for(&id), 2);
    assert_eq!(h.record(&id).await.status, PacketStatus::Uploaded);
}

#[tokio::test]
async fn status_update_failure_after_copy_skips_cleanup() {
    let h = Harness::new();
    let id = h.stage("10001100770000320250115101020").await;
    h.scanner.set(&id, Script::Infected);
    h.store.set_update_failure(&id, true).await;
    let orchestrator = h.orchestrator();

    let first = orchestrator.run_cycle().await;
    assert_eq!(
        first.report_for(&id).map(|r| r.outcome),
        Some(PacketOutcome::Deferred {
            stage: Stage::StatusUpdate,
            kind: FailureKind::StoreUnavailable,
        })
    );
    assert_eq!(h.staging.cleanups(), 0);
    assert!(h.scan_path(&id).exists());
    assert!(h.retry_path(&id).exists());
    assert_eq!(h.record(&id).await.retry_count, None);

    h.store.set_update_failure(&id, false).await;
    orchestrator.run_cycle().await;

    let record = h.record(&id).await;
    assert_eq!(record.status, PacketStatus::ScanRetry);
    assert_eq!(record.retry_count, Some(1));
    assert_eq!(h.staging.copies(), 2);
    assert!(!h.scan_path(&id).exists());
}

#[tokio::test]
async fn retry_copy_failure_leaves_record_untouched() {
    let h = Harness::new();
    let id = h.stage("10001100770000320250115101021").await;
    h.scanner.set(&id, Script::Infected);
    h.staging.set_copy_failure(true);

    let result = h.orchestrator().run_cycle().await;

    assert_eq!(
        result.report_for(&id).map(|r| r.outcome),
        Some(PacketOutcome::Deferred {
            stage: Stage::RetryCopy,
            kind: FailureKind::IoFailure,
        })
    );
    let record = h.record(&id).await;
    assert_eq!(record.status, PacketStatus::AwaitingScan);
    assert_eq!(record.retry_count, None);
    assert_eq!(h.staging.cleanups(), 0);
    assert!(h.scan_path(&id).exists());
}

#[tokio::test]
async fn missing_retry_directory_is_destination_missing() {
    let h = Harness::new();
    let id = h.stage("10001100770000320250115101022").await;
    h.scanner.set(&id, Script::Infected);
    std::fs::remove_dir_all(&h.retry_dir).expect("remove retry dir");

    let result = h.orchestrator().run_cycle().await;

    assert_eq!(
        result.report_for(&id).map(|r| r.outcome),
        Some(PacketOutcome::Deferred {
            stage: Stage::RetryCopy,
            kind: FailureKind::DestinationMissing,
        })
    );
    assert_eq!(h.record(&id).await.status, PacketStatus::AwaitingScan);
}

#[tokio::test]
async fn one_failing_packet_does_not_affect_its_siblings() {
    let h = Harness::new();
    let clean = h.stage("10001100770000320250115101023").await;
    let broken = h.stage("10001100770000320250115101024").await;
    let infected = h.stage("10001100770000320250115101025").await;
    h.scanner.set(&broken, Script::Fail);
    h.scanner.set(&infected, Script::Infected);

    let result = h.orchestrator().run_cycle().await;

    assert_eq!(result.processed(), 3);
    assert_eq!(result.uploaded(), 1);
    assert_eq!(result.quarantined(), 1);
    assert_eq!(result.deferred(), 1);
    assert_eq!(h.record(&clean).await.status, PacketStatus::Uploaded);
    assert_eq!(h.record(&broken).await.status, PacketStatus::AwaitingScan);
    assert_eq!(h.record(&infected).await.status, PacketStatus::ScanRetry);
}

#[tokio::test]
async fn hanging_scan_times_out_as_scan_failure() {
    let h = Harness::new();
    let id = h.stage("10001100770000320250115101026").await;
    h.scanner.set(&id, Script::Hang(Duration::from_secs(30)));
    let config = DispatchConfig {
        call_timeout_ms: 50,
        ..h.config()
    };

    let result = h.orchestrator_with(config).run_cycle().await;

    let report = result.report_for(&id).expect("report");
    assert_eq!(
        report.outcome,
        PacketOutcome::Deferred {
            stage: Stage::Scan,
            kind: FailureKind::ScanFailure,
        }
    );
    assert!(report.error.as_deref().is_some_and(|e| e.contains("timed out")));
    assert_eq!(h.record(&id).await.status, PacketStatus::AwaitingScan);
}

#[tokio::test]
async fn packets_are_scanned_with_bounded_concurrency() {
    let h = Harness::new();
    for n in 0..8 {
        h.stage(&format!("1000110077000032025011510110{n}")).await;
    }
    h.scanner.set_delay(Duration::from_millis(25));
    let config = DispatchConfig {
        max_concurrency: 3,
        ..h.config()
    };

    let result = h.orchestrator_with(config).run_cycle().await;

    assert_eq!(result.uploaded(), 8);
    assert!(h.scanner.max_in_flight() <= 3);
    assert!(h.scanner.max_in_flight() >= 2);
}

#[tokio::test]
async fn packets_in_other_statuses_are_ignored() {
    let h = Harness::new();
    let waiting = h.stage("10001100770000320250115101027").await;
    let done = h.stage("10001100770000320250115101028").await;
    let record = h.record(&done).await.into_uploaded("REGISTRATION_CLIENT");
    h.store.insert(record).await;

    let result = h.orchestrator().run_cycle().await;

    assert_eq!(result.fetched, 1);
    assert!(result.report_for(&waiting).is_some());
    assert!(result.report_for(&done).is_none());
    assert_eq!(h.durable.writes_for(&done), 0);
}

#[tokio::test]
async fn cycle_result_serializes_for_reporting() {
    let h = Harness::new();
    let id = h.stage("10001100770000320250115101029").await;
    h.scanner.set(&id, Script::Infected);

    let result = h.orchestrator().run_cycle().await;
    let json = serde_json::to_value(&result).expect("serialize");

    assert_eq!(json["fetched"], 1);
    assert_eq!(json["reports"][0]["outcome"], "quarantined");
    assert_eq!(json["reports"][0]["retry_count"], 1);
    assert_eq!(json["reports"][0]["cleanup"]["result"], "removed");
    assert!(json.get("batch_fetch_error").is_none());
}
