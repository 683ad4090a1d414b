//! # Packet Scanner Core
//!
//! Scan-and-dispatch core of the packet scanner job: every packet waiting in
//! the `VIRUS_SCAN` staging area is scanned, clean packets are written to the
//! durable store and marked `PACKET_UPLOADED_TO_DFS`, infected packets are
//! copied to the retry area and marked `PACKET_FOR_VIRUS_SCAN_RETRY`.
//!
//! ## Architecture
//!
//! - [`domain`]: packet identifiers, staging areas, the persisted status record
//! - [`ports`]: contracts of the status store, scanner, staging and durable store
//! - [`orchestration`]: [`ScanDispatchOrchestrator`] and its outcome types
//! - [`infrastructure`]: Postgres/in-memory stores, ClamAV client, filesystem adapters
//!
//! ## Feature Flags
//!
//! - `database` (default): Postgres status store via SQLx
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use packet_scanner_core::{
//!     domain::StagingArea,
//!     infrastructure::{
//!         ClamdScanner, FilesystemDurableStore, InMemoryStatusStore,
//!         LocalStagingFileManager,
//!     },
//!     orchestration::{DispatchConfig, DispatchPorts, ScanDispatchOrchestrator},
//! };
//!
//! # async fn run() {
//! let staging = LocalStagingFileManager::new()
//!     .with_area(StagingArea::virus_scan(), "/data/virus-scan")
//!     .with_area(StagingArea::virus_scan_retry(), "/data/virus-scan-retry");
//! let ports = DispatchPorts::new(
//!     Arc::new(InMemoryStatusStore::new()),
//!     Arc::new(ClamdScanner::new("localhost", 3310)),
//!     Arc::new(staging),
//!     Arc::new(FilesystemDurableStore::new("/mnt/dfs")),
//! );
//! let orchestrator = ScanDispatchOrchestrator::new(ports, DispatchConfig::default());
//! let result = orchestrator.run_cycle().await;
//! println!("uploaded {}", result.uploaded());
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Packet identifiers, status codes and records.
pub mod domain;
/// Collaborator failures and their kinds.
pub mod error;
/// Concrete collaborators.
pub mod infrastructure;
/// The scan-and-dispatch cycle.
pub mod orchestration;
/// Collaborator contracts.
pub mod ports;

pub use error::{FailureKind, PacketError, Result};
pub use orchestration::{CycleResult, ScanDispatchOrchestrator};
