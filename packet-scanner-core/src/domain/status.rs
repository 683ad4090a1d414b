use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::PacketError;

/// Lifecycle status of a packet as persisted in the status store.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum PacketStatus {
    /// Staged and waiting for a malware scan.
    #[serde(rename = "PACKET_FOR_VIRUS_SCAN")]
    AwaitingScan,
    /// Scan reported an infection; waiting for an external requeue.
    #[serde(rename = "PACKET_FOR_VIRUS_SCAN_RETRY")]
    ScanRetry,
    /// Clean and persisted to the durable store. Terminal for this job.
    #[serde(rename = "PACKET_UPLOADED_TO_DFS")]
    Uploaded,
}

impl PacketStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [PacketStatus; 3] = [
        PacketStatus::AwaitingScan,
        PacketStatus::ScanRetry,
        PacketStatus::Uploaded,
    ];

    /// Status code as stored in the `packet_status.status` column.
    pub fn code(&self) -> &'static str {
        match self {
            PacketStatus::AwaitingScan => "PACKET_FOR_VIRUS_SCAN",
            PacketStatus::ScanRetry => "PACKET_FOR_VIRUS_SCAN_RETRY",
            PacketStatus::Uploaded => "PACKET_UPLOADED_TO_DFS",
        }
    }

    /// True once the job will never touch the packet again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PacketStatus::Uploaded)
    }
}

impl fmt::Display for PacketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PacketStatus {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PacketStatus::ALL
            .into_iter()
            .find(|status| status.code() == s)
            .ok_or_else(|| {
                PacketError::InvalidRecord(format!("unknown status code '{s}'"))
            })
    }
}
