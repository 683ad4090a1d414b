//! Packet identifiers, staging areas, and the persisted status record.

/// Packet and staging-area identifiers.
pub mod ids;
/// Per-cycle view of a packet.
pub mod packet;
/// Persisted status record.
pub mod record;
/// Status codes.
pub mod status;

pub use ids::{PacketId, StagingArea};
pub use packet::PendingPacket;
pub use record::PacketStatusRecord;
pub use status::PacketStatus;
