use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Completed scan result. An infection is a verdict, not an error.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ScanVerdict {
    /// No threat found.
    Clean,
    /// Threat found.
    Infected {
        /// Signature name, when the engine reports one.
        signature: Option<String>,
    },
}

impl ScanVerdict {
    /// True for [`ScanVerdict::Clean`].
    pub fn is_clean(&self) -> bool {
        matches!(self, ScanVerdict::Clean)
    }
}

/// Malware scanning capability. Expected to be deterministic for a fixed
/// file content and engine version.
#[async_trait]
pub trait VirusScanner: Send + Sync {
    /// Fails with `ScanFailure` only when the scan could not complete.
    async fn scan_file(&self, path: &Path) -> Result<ScanVerdict>;
}
