//! Scan-and-dispatch orchestration: one cycle over the AWAITING_SCAN batch.

/// Orchestrator settings.
pub mod config;
/// The orchestrator itself.
pub mod dispatcher;
pub mod outcome;

pub use config::DispatchConfig;
pub use dispatcher::{DispatchPorts, ScanDispatchOrchestrator};
pub use outcome::{
    CleanupOutcome, CycleResult, PacketOutcome, PacketReport, Stage, Transition,
};
