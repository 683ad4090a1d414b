//! Contracts of the external collaborators the orchestrator drives.
//!
//! Every call may fail with the [`PacketError`](crate::error::PacketError)
//! variant documented on it. Implementations must tolerate being called
//! again for the same packet on a later cycle.

/// Durable store contract.
pub mod durable_store;
/// Virus scanning contract.
pub mod scanner;
/// Staging file contract.
pub mod staging;
/// Status store contract.
pub mod status_store;

pub use durable_store::DurableStore;
pub use scanner::{ScanVerdict, VirusScanner};
pub use staging::StagingFileManager;
pub use status_store::StatusStore;
