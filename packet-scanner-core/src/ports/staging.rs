use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::{PendingPacket, StagingArea};
use crate::error::Result;

/// Moves packet files between logical staging areas.
#[async_trait]
pub trait StagingFileManager: Send + Sync {
    /// Where the packet file lives (or would live) inside `area`.
    fn packet_path(
        &self,
        area: &StagingArea,
        packet: &PendingPacket,
    ) -> Result<PathBuf>;

    /// Duplicate the packet file from `from` into `to`, replacing any copy
    /// already present. Fails with `IoFailure` or `DestinationMissing`.
    async fn copy(
        &self,
        packet: &PendingPacket,
        from: &StagingArea,
        to: &StagingArea,
    ) -> Result<()>;

    /// Remove the superseded source copy in `from` once the copy in `to` is
    /// in place. Fails with `RetryAreaUnavailable`.
    async fn cleanup(
        &self,
        from: &StagingArea,
        to: &StagingArea,
        packet: &PendingPacket,
    ) -> Result<()>;
}
