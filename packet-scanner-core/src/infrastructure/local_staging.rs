use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    domain::{PendingPacket, StagingArea},
    error::{PacketError, Result},
    ports::StagingFileManager,
};

/// Staging areas mapped onto local (or mounted) directories.
#[derive(Debug, Clone, Default)]
pub struct LocalStagingFileManager {
    areas: HashMap<StagingArea, PathBuf>,
}

impl LocalStagingFileManager {
    /// Manager with no areas configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `area` to `directory`.
    pub fn with_area(
        mut self,
        area: StagingArea,
        directory: impl Into<PathBuf>,
    ) -> Self {
        self.areas.insert(area, directory.into());
        self
    }

    /// Directory of `area`, if configured.
    pub fn directory(&self, area: &StagingArea) -> Option<&Path> {
        self.areas.get(area).map(PathBuf::as_path)
    }

    /// All configured areas.
    pub fn areas(&self) -> impl Iterator<Item = (&StagingArea, &Path)> {
        self.areas.iter().map(|(area, dir)| (area, dir.as_path()))
    }

    fn area_dir(&self, area: &StagingArea) -> Result<&Path> {
        self.directory(area).ok_or_else(|| {
            PacketError::DestinationMissing(format!(
                "staging area {area} is not configured"
            ))
        })
    }
}

#[async_trait]
impl StagingFileManager for LocalStagingFileManager {
    fn packet_path(
        &self,
        area: &StagingArea,
        packet: &PendingPacket,
    ) -> Result<PathBuf> {
        Ok(self.area_dir(area)?.join(&packet.file_name))
    }

    async fn copy(
        &self,
        packet: &PendingPacket,
        from: &StagingArea,
        to: &StagingArea,
    ) -> Result<()> {
        let source = self.packet_path(from, packet)?;
        let target_dir = self.area_dir(to)?;

        match tokio::fs::metadata(target_dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(PacketError::DestinationMissing(format!(
                    "{} is not a directory",
                    target_dir.display()
                )));
            }
            Err(e) => {
                return Err(PacketError::DestinationMissing(format!(
                    "{}: {e}",
                    target_dir.display()
                )));
            }
        }

        let target = target_dir.join(&packet.file_name);
        // Copy under a temporary name so a half-written file is never seen
        // under the packet name.
        let partial = target_dir.join(format!(".{}.partial", packet.file_name));
        if let Err(e) = tokio::fs::copy(&source, &partial).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(PacketError::IoFailure(format!(
                "copy {} -> {}: {e}",
                source.display(),
                partial.display()
            )));
        }
        tokio::fs::rename(&partial, &target).await.map_err(|e| {
            PacketError::IoFailure(format!(
                "rename {} -> {}: {e}",
                partial.display(),
                target.display()
            ))
        })?;

        debug!(
            target: "scan::packet",
            from = %from,
            to = %to,
            file = %packet.file_name,
            "packet copied between staging areas"
        );
        Ok(())
    }

    async fn cleanup(
        &self,
        from: &StagingArea,
        to: &StagingArea,
        packet: &PendingPacket,
    ) -> Result<()> {
        let destination = self
            .packet_path(to, packet)
            .map_err(|e| PacketError::RetryAreaUnavailable(e.to_string()))?;
        let source = self
            .packet_path(from, packet)
            .map_err(|e| PacketError::RetryAreaUnavailable(e.to_string()))?;

        match tokio::fs::try_exists(&destination).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(PacketError::RetryAreaUnavailable(format!(
                    "{} not found in {to}; keeping source copy",
                    packet.file_name
                )));
            }
            Err(e) => {
                return Err(PacketError::RetryAreaUnavailable(format!(
                    "{}: {e}",
                    destination.display()
                )));
            }
        }

        match tokio::fs::remove_file(&source).await {
            Ok(()) => Ok(()),
            // Already gone, e.g. removed by an earlier cycle.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PacketError::RetryAreaUnavailable(format!(
                "removing {}: {e}",
                source.display()
            ))),
        }
    }
}
