use std::{future::Future, sync::Arc, time::Duration};

use packet_scanner_core::{CycleResult, ScanDispatchOrchestrator};
use serde_json::json;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Totals across the cycles of one [`CycleScheduler::run_until`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleSummary {
    /// Cycles run.
    pub cycles: usize,
    /// Cycles whose batch fetch failed.
    pub fetch_failures: usize,
    /// Packets uploaded.
    pub uploaded: usize,
    /// Packets quarantined.
    pub quarantined: usize,
    /// Packets deferred (counted once per cycle).
    pub deferred: usize,
}

impl ScheduleSummary {
    fn record(&mut self, result: &CycleResult) {
        self.cycles += 1;
        if result.is_fetch_failure() {
            self.fetch_failures += 1;
        }
        self.uploaded += result.uploaded();
        self.quarantined += result.quarantined();
        self.deferred += result.deferred();
    }

    /// Summary as a JSON object for the exit log line.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "cycles": self.cycles,
            "fetch_failures": self.fetch_failures,
            "uploaded": self.uploaded,
            "quarantined": self.quarantined,
            "deferred": self.deferred,
        })
    }
}

/// Runs cycles back to back on a fixed interval.
///
/// A cycle always runs to completion before the next tick is awaited, so at
/// most one cycle is active at a time. Ticks missed while a long cycle was
/// running are not replayed.
#[derive(Debug)]
pub struct CycleScheduler {
    orchestrator: Arc<ScanDispatchOrchestrator>,
    interval: Duration,
}

impl CycleScheduler {
    /// Scheduler starting a cycle every `interval`.
    pub fn new(orchestrator: Arc<ScanDispatchOrchestrator>, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Run until `shutdown` resolves. The first cycle starts immediately.
    pub async fn run_until<S>(&self, shutdown: S) -> ScheduleSummary
    where
        S: Future<Output = ()>,
    {
        let mut summary = ScheduleSummary::default();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            target: "scan::cycle",
            interval = %humantime::format_duration(self.interval),
            "scheduled scanning started"
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            let result = self.orchestrator.run_cycle().await;
            if result.is_fetch_failure() {
                warn!(
                    target: "scan::cycle",
                    cycle = summary.cycles + 1,
                    "cycle skipped: status store unavailable"
                );
            }
            summary.record(&result);
        }

        info!(
            target: "scan::summary",
            cycles = summary.cycles,
            uploaded = summary.uploaded,
            quarantined = summary.quarantined,
            deferred = summary.deferred,
            fetch_failures = summary.fetch_failures,
            "scheduled scanning stopped"
        );
        summary
    }
}
