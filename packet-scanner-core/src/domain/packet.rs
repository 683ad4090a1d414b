use super::{PacketId, PacketStatusRecord};

/// One packet picked up for this cycle. Rebuilt from the status record on
/// every cycle; never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingPacket {
    /// Identifier from the status record.
    pub id: PacketId,
    /// Staging file name: identifier followed by the packet extension.
    pub file_name: String,
}

impl PendingPacket {
    /// Derive the staging file name from `id` and `extension`.
    pub fn new(id: PacketId, extension: &str) -> Self {
        let file_name = format!("{}{}", id.as_str(), extension);
        Self { id, file_name }
    }

    /// Shorthand for [`PendingPacket::new`] with the record's id.
    pub fn from_record(record: &PacketStatusRecord, extension: &str) -> Self {
        Self::new(record.id.clone(), extension)
    }
}
