use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

use crate::{
    domain::PacketId,
    error::{PacketError, Result},
    ports::DurableStore,
};

const OBJECTS_DIR: &str = "objects";
const DIGESTS_DIR: &str = "digests";
const PARTIAL_DIR: &str = ".partial";
const DIGEST_SUFFIX: &str = "sha256";

/// Durable store writing one object per packet identifier under a root
/// directory (typically a mounted distributed filesystem).
///
/// Layout:
///
/// ```text
/// <root>/objects/<id>
/// <root>/digests/<id>.sha256
/// <root>/.partial/<id>.object | <id>.sha256   (in-flight writes)
/// ```
///
/// Objects and digests never share a directory, so no identifier can name
/// another packet's digest. Writing the same content again for an
/// identifier is a no-op.
#[derive(Debug, Clone)]
pub struct FilesystemDurableStore {
    root: PathBuf,
}

impl FilesystemDurableStore {
    /// Store rooted at `root`; directories are created on the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the stored object for `id`.
    pub fn object_path(&self, id: &PacketId) -> PathBuf {
        self.root.join(OBJECTS_DIR).join(id.as_str())
    }

    fn digest_path(&self, id: &PacketId) -> PathBuf {
        self.root
            .join(DIGESTS_DIR)
            .join(format!("{}.{DIGEST_SUFFIX}", id.as_str()))
    }

    fn partial_path(&self, id: &PacketId, suffix: &str) -> PathBuf {
        self.root
            .join(PARTIAL_DIR)
            .join(format!("{}.{suffix}", id.as_str()))
    }

    /// Stored digest for `id`, if the object has been written.
    pub async fn stored_digest(&self, id: &PacketId) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.digest_path(id)).await {
            Ok(digest) => Ok(Some(digest.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(unavailable(&self.root, e)),
        }
    }
}

fn unavailable(root: &Path, err: std::io::Error) -> PacketError {
    PacketError::ConnectionUnavailable(format!("{}: {err}", root.display()))
}

async fn file_digest(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

async fn write_atomically(
    partial: &Path,
    target: &Path,
    bytes: &[u8],
) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(partial).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(partial, target).await
}

#[async_trait]
impl DurableStore for FilesystemDurableStore {
    async fn store_packet(&self, id: &PacketId, file: &Path) -> Result<()> {
        for dir in [OBJECTS_DIR, DIGESTS_DIR, PARTIAL_DIR] {
            tokio::fs::create_dir_all(self.root.join(dir))
                .await
                .map_err(|e| unavailable(&self.root, e))?;
        }

        let digest = file_digest(file).await.map_err(|e| {
            PacketError::ConnectionUnavailable(format!(
                "reading {}: {e}",
                file.display()
            ))
        })?;

        if self.stored_digest(id).await?.as_deref() == Some(digest.as_str())
            && tokio::fs::try_exists(self.object_path(id))
                .await
                .unwrap_or(false)
        {
            debug!(
                target: "scan::packet",
                packet_id = %id,
                "identical packet already stored; skipping write"
            );
            return Ok(());
        }

        let object = self.object_path(id);
        let partial = self.partial_path(id, "object");
        tokio::fs::copy(file, &partial)
            .await
            .map_err(|e| unavailable(&self.root, e))?;
        tokio::fs::rename(&partial, &object)
            .await
            .map_err(|e| unavailable(&self.root, e))?;
        write_atomically(
            &self.partial_path(id, DIGEST_SUFFIX),
            &self.digest_path(id),
            digest.as_bytes(),
        )
            .await
            .map_err(|e| unavailable(&self.root, e))?;

        info!(
            target: "scan::store",
            packet_id = %id,
            sha256 = %digest,
            "packet stored"
        );
        Ok(())
    }
}
