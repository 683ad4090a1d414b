use async_trait::async_trait;

use crate::domain::{PacketId, PacketStatus, PacketStatusRecord};
use crate::error::Result;

/// Authoritative persisted state, one record per packet.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// All active records currently in `status`. Order is not significant.
    ///
    /// Fails with `StoreUnavailable` when the backing store is unreachable.
    async fn list_by_status(
        &self,
        status: PacketStatus,
    ) -> Result<Vec<PacketStatusRecord>>;

    /// Persist status, retry count and audit fields of `record`.
    /// All-or-nothing per call; fails with `StoreUnavailable`.
    async fn update(&self, record: &PacketStatusRecord) -> Result<()>;

    /// Look up a single record by identifier.
    async fn find(&self, id: &PacketId) -> Result<Option<PacketStatusRecord>>;
}
