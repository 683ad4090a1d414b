use std::path::Path;

use async_trait::async_trait;

use crate::domain::PacketId;
use crate::error::Result;

/// Permanent storage for clean packets.
///
/// Writes are keyed by packet identifier and must be safe to repeat: the
/// orchestrator writes again on a later cycle whenever the status update that
/// followed a successful write did not commit.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Fails with `ConnectionUnavailable`.
    async fn store_packet(&self, id: &PacketId, file: &Path) -> Result<()>;
}
