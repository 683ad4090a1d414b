use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PacketError, Result};

/// Stable identifier of one enrollment packet.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PacketId(String);

impl PacketId {
    /// Validate and wrap a raw identifier. The value is kept verbatim; blank
    /// ids, ids with surrounding whitespace and ids that are not plain file
    /// names are rejected.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(PacketError::InvalidRecord(
                "packet identifier is empty".into(),
            ));
        }
        // The id is written back verbatim, so it must match the stored row.
        if raw.trim().len() != raw.len() {
            return Err(PacketError::InvalidRecord(format!(
                "packet identifier '{raw}' has surrounding whitespace"
            )));
        }
        // Ids become file names in staging and durable storage.
        if raw.contains(['/', '\\']) || raw == "." || raw == ".." {
            return Err(PacketError::InvalidRecord(format!(
                "packet identifier '{raw}' is not a valid file name"
            )));
        }
        Ok(Self(raw))
    }

    /// Borrow the raw value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PacketId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Logical name of a staging location, e.g. `VIRUS_SCAN`.
#[derive(
    Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StagingArea(String);

impl StagingArea {
    /// Area holding packets awaiting a scan.
    pub const VIRUS_SCAN: &'static str = "VIRUS_SCAN";
    /// Quarantine area for infected packets.
    pub const VIRUS_SCAN_RETRY: &'static str = "VIRUS_SCAN_RETRY";

    /// Area with an arbitrary name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The standard scan area.
    pub fn virus_scan() -> Self {
        Self::new(Self::VIRUS_SCAN)
    }

    /// The standard retry area.
    pub fn virus_scan_retry() -> Self {
        Self::new(Self::VIRUS_SCAN_RETRY)
    }

    /// Borrow the raw value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StagingArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
