use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of one external collaborator call.
///
/// Each variant corresponds to one failure kind of the collaborator that
/// raised it. The orchestrator never propagates these past a single packet.
#[derive(Error, Debug)]
pub enum PacketError {
    /// Status store could not be read or written.
    #[error("Status store unavailable: {0}")]
    StoreUnavailable(String),

    /// Scan did not complete.
    #[error("Virus scan failed: {0}")]
    ScanFailure(String),

    /// Durable store unreachable.
    #[error("Durable store connection unavailable: {0}")]
    ConnectionUnavailable(String),

    /// Staging file could not be read or copied.
    #[error("Staging IO error: {0}")]
    IoFailure(String),

    /// Target staging area does not exist.
    #[error("Destination missing: {0}")]
    DestinationMissing(String),

    /// Source copy could not be cleaned up.
    #[error("Retry area unavailable: {0}")]
    RetryAreaUnavailable(String),

    /// Malformed data read from the status store.
    #[error("Invalid status record: {0}")]
    InvalidRecord(String),
}

impl PacketError {
    /// Data-free tag of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            PacketError::StoreUnavailable(_) => FailureKind::StoreUnavailable,
            PacketError::ScanFailure(_) => FailureKind::ScanFailure,
            PacketError::ConnectionUnavailable(_) => {
                FailureKind::ConnectionUnavailable
            }
            PacketError::IoFailure(_) => FailureKind::IoFailure,
            PacketError::DestinationMissing(_) => {
                FailureKind::DestinationMissing
            }
            PacketError::RetryAreaUnavailable(_) => {
                FailureKind::RetryAreaUnavailable
            }
            PacketError::InvalidRecord(_) => FailureKind::InvalidRecord,
        }
    }

    /// Builds the error a timed out call of the given kind should surface as.
    pub fn timed_out(kind: FailureKind, what: &str) -> Self {
        let msg = format!("{what} timed out");
        match kind {
            FailureKind::StoreUnavailable => PacketError::StoreUnavailable(msg),
            FailureKind::ScanFailure => PacketError::ScanFailure(msg),
            FailureKind::ConnectionUnavailable => {
                PacketError::ConnectionUnavailable(msg)
            }
            FailureKind::IoFailure => PacketError::IoFailure(msg),
            FailureKind::DestinationMissing => {
                PacketError::DestinationMissing(msg)
            }
            FailureKind::RetryAreaUnavailable => {
                PacketError::RetryAreaUnavailable(msg)
            }
            FailureKind::InvalidRecord => PacketError::InvalidRecord(msg),
        }
    }
}

/// Data-free tag of a [`PacketError`], used in outcome reports.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// See [`PacketError::StoreUnavailable`].
    StoreUnavailable,
    /// See [`PacketError::ScanFailure`].
    ScanFailure,
    /// See [`PacketError::ConnectionUnavailable`].
    ConnectionUnavailable,
    /// See [`PacketError::IoFailure`].
    IoFailure,
    /// See [`PacketError::DestinationMissing`].
    DestinationMissing,
    /// See [`PacketError::RetryAreaUnavailable`].
    RetryAreaUnavailable,
    /// See [`PacketError::InvalidRecord`].
    InvalidRecord,
}

impl FailureKind {
    /// Snake-case name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::StoreUnavailable => "store_unavailable",
            FailureKind::ScanFailure => "scan_failure",
            FailureKind::ConnectionUnavailable => "connection_unavailable",
            FailureKind::IoFailure => "io_failure",
            FailureKind::DestinationMissing => "destination_missing",
            FailureKind::RetryAreaUnavailable => "retry_area_unavailable",
            FailureKind::InvalidRecord => "invalid_record",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for PacketError {
    fn from(err: sqlx::Error) -> Self {
        PacketError::StoreUnavailable(err.to_string())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PacketError>;
