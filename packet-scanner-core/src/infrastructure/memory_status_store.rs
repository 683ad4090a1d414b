use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{PacketId, PacketStatus, PacketStatusRecord},
    error::{PacketError, Result},
    ports::StatusStore,
};

/// Status store kept in process memory.
///
/// Useful for embedding and tests. Listing and per-packet updates can be
/// made to fail on demand to exercise the orchestrator's failure paths.
#[derive(Default)]
pub struct InMemoryStatusStore {
    records: Mutex<HashMap<PacketId, PacketStatusRecord>>,
    fail_listing: AtomicBool,
    failing_updates: Mutex<HashSet<PacketId>>,
    updates: AtomicUsize,
}

impl fmt::Debug for InMemoryStatusStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("InMemoryStatusStore");
        match self.records.try_lock() {
            Ok(records) => debug.field("records", &records.len()),
            Err(_) => debug.field("records", &"<locked>"),
        };
        debug
            .field("fail_listing", &self.fail_listing.load(Ordering::Relaxed))
            .field("updates", &self.updates.load(Ordering::Relaxed))
            .finish()
    }
}

impl InMemoryStatusStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `records`.
    pub async fn with_records(
        records: impl IntoIterator<Item = PacketStatusRecord>,
    ) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record).await;
        }
        store
    }

    /// Insert or replace the record for its identifier.
    pub async fn insert(&self, record: PacketStatusRecord) {
        self.records.lock().await.insert(record.id.clone(), record);
    }

    /// Make `list_by_status` fail until cleared.
    pub fn set_listing_failure(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Make updates of `id` fail until cleared.
    pub async fn set_update_failure(&self, id: &PacketId, fail: bool) {
        let mut failing = self.failing_updates.lock().await;
        if fail {
            failing.insert(id.clone());
        } else {
            failing.remove(id);
        }
    }

    /// Number of successful updates since construction.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn list_by_status(
        &self,
        status: PacketStatus,
    ) -> Result<Vec<PacketStatusRecord>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(PacketError::StoreUnavailable(
                "in-memory status store listing disabled".into(),
            ));
        }
        let records = self.records.lock().await;
        let mut matching: Vec<_> = records
            .values()
            .filter(|record| record.is_active && record.status == status)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching)
    }

    async fn update(&self, record: &PacketStatusRecord) -> Result<()> {
        if self.failing_updates.lock().await.contains(&record.id) {
            return Err(PacketError::StoreUnavailable(format!(
                "update rejected for packet {}",
                record.id
            )));
        }
        let mut records = self.records.lock().await;
        match records.get_mut(&record.id) {
            Some(existing) if existing.is_active => {
                *existing = record.clone();
                self.updates.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            _ => Err(PacketError::StoreUnavailable(format!(
                "no active status record for packet {}",
                record.id
            ))),
        }
    }

    async fn find(&self, id: &PacketId) -> Result<Option<PacketStatusRecord>> {
        Ok(self.records.lock().await.get(id).cloned())
    }
}
