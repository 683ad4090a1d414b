//! Concrete collaborators: Postgres and in-memory status stores, the ClamAV
//! daemon client, local staging directories and the filesystem durable store.

pub mod clamav;
/// Durable store on a (mounted) filesystem.
pub mod fs_durable_store;
/// Staging areas mapped to local directories.
pub mod local_staging;
/// In-process status store.
pub mod memory_status_store;
/// Postgres status store.
#[cfg(feature = "database")]
pub mod postgres_status_store;

pub use clamav::ClamdScanner;
pub use fs_durable_store::FilesystemDurableStore;
pub use local_staging::LocalStagingFileManager;
pub use memory_status_store::InMemoryStatusStore;
#[cfg(feature = "database")]
pub use postgres_status_store::PostgresStatusStore;
