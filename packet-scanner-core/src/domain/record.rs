use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PacketId, PacketStatus};

/// Status comment written when a packet reaches the durable store.
pub const UPLOADED_COMMENT: &str =
    "Packet is clean and has been stored in the durable store";
/// Status comment written when a packet is moved to the retry area.
pub const QUARANTINED_COMMENT: &str =
    "Packet is infected and has been moved to the retry area";

/// Persisted status of one packet. The status store keeps exactly one of
/// these per live packet identifier.
///
/// `retry_count` is `None` when the store has never recorded a retry. The
/// absent value counts as zero, and that default is applied only when the
/// packet is quarantined ([`PacketStatusRecord::into_quarantined`]). Reading
/// the record never rewrites the field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketStatusRecord {
    /// Stable packet identifier; primary key.
    pub id: PacketId,
    /// Current lifecycle status.
    pub status: PacketStatus,
    /// Times the packet was quarantined. `None` means never recorded.
    pub retry_count: Option<u32>,
    /// Free-text note of the last transition.
    pub status_comment: Option<String>,
    /// Inactive records are invisible to the job.
    pub is_active: bool,
    /// Actor that staged the packet.
    pub created_by: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Actor of the last status change.
    pub updated_by: Option<String>,
    /// Time of the last status change.
    pub updated_at: Option<DateTime<Utc>>,
}

impl PacketStatusRecord {
    /// Fresh record as written by the upstream stage that stages a packet.
    pub fn awaiting_scan(id: PacketId, created_by: impl Into<String>) -> Self {
        Self {
            id,
            status: PacketStatus::AwaitingScan,
            retry_count: None,
            status_comment: None,
            is_active: true,
            created_by: created_by.into(),
            created_at: Utc::now(),
            updated_by: None,
            updated_at: None,
        }
    }

    /// Retry count with the absent value read as zero.
    pub fn effective_retry_count(&self) -> u32 {
        self.retry_count.unwrap_or(0)
    }

    /// Record after a clean scan and a successful durable write.
    pub fn into_uploaded(self, actor: &str) -> Self {
        Self {
            status: PacketStatus::Uploaded,
            status_comment: Some(UPLOADED_COMMENT.to_string()),
            updated_by: Some(actor.to_string()),
            updated_at: Some(Utc::now()),
            ..self
        }
    }

    /// Record after an infected scan and a successful copy to the retry
    /// area. The retry count moves up by exactly one.
    pub fn into_quarantined(self, actor: &str) -> Self {
        let retry_count = self.effective_retry_count().saturating_add(1);
        Self {
            status: PacketStatus::ScanRetry,
            retry_count: Some(retry_count),
            status_comment: Some(QUARANTINED_COMMENT.to_string()),
            updated_by: Some(actor.to_string()),
            updated_at: Some(Utc::now()),
            ..self
        }
    }
}
