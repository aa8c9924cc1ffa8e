//! Record store seam: live ordered queries plus create/update/delete over a
//! document collection.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use shared::{AppFields, AppRecord, RecordId, StoreError};
use tokio::sync::watch;
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt};

mod memory;
mod sqlite;

pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;

/// Field the live query orders by.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// A full, ordered list of records as of one store emission.
pub type Snapshot = Arc<Vec<AppRecord>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveQuery {
    pub collection: String,
    pub order_by: String,
    pub descending: bool,
}

impl LiveQuery {
    pub fn newest_first(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            order_by: CREATED_AT_FIELD.to_string(),
            descending: true,
        }
    }

    fn ensure_supported(&self) -> Result<(), StoreError> {
        if self.order_by != CREATED_AT_FIELD || !self.descending {
            return Err(StoreError::invalid_query(format!(
                "unsupported ordering {} {} on collection {}",
                self.order_by,
                if self.descending { "desc" } else { "asc" },
                self.collection
            )));
        }
        Ok(())
    }
}

/// Receiving end of a live query.
///
/// Holds `None` until the store has produced its first snapshot. Dropping the
/// feed unsubscribes.
#[derive(Debug, Clone)]
pub struct SnapshotFeed {
    rx: watch::Receiver<Option<Snapshot>>,
}

impl SnapshotFeed {
    pub fn new(rx: watch::Receiver<Option<Snapshot>>) -> Self {
        Self { rx }
    }

    pub fn latest(&self) -> Option<Snapshot> {
        self.rx.borrow().clone()
    }

    /// Returns the current snapshot and marks it as seen, so `changed` only
    /// resolves on a later emission.
    pub fn current(&mut self) -> Option<Snapshot> {
        self.rx.borrow_and_update().clone()
    }

    /// Waits for the next emission and returns it.
    pub async fn changed(&mut self) -> Result<Option<Snapshot>, StoreError> {
        self.rx
            .changed()
            .await
            .map_err(|_| StoreError::unavailable("live query closed by the store"))?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Stream of loaded snapshots, starting with the current one if present.
    pub fn into_stream(self) -> impl Stream<Item = Snapshot> + Send + Unpin + 'static {
        WatchStream::new(self.rx).filter_map(|snapshot| snapshot)
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn subscribe(&self, query: &LiveQuery) -> Result<SnapshotFeed, StoreError>;
    async fn create(&self, collection: &str, fields: &AppFields) -> Result<RecordId, StoreError>;
    async fn update(
        &self,
        collection: &str,
        id: &RecordId,
        fields: &AppFields,
    ) -> Result<(), StoreError>;
    async fn delete(&self, collection: &str, id: &RecordId) -> Result<(), StoreError>;
}

/// Per-collection watch channels shared by the store implementations.
#[derive(Default)]
struct FeedHub {
    channels: Mutex<HashMap<String, watch::Sender<Option<Snapshot>>>>,
}

impl FeedHub {
    fn publish(&self, collection: &str, records: Vec<AppRecord>) {
        let snapshot = Some(Arc::new(records));
        let mut channels = self.lock();
        match channels.get(collection) {
            Some(tx) => {
                tx.send_replace(snapshot);
            }
            None => {
                let (tx, _) = watch::channel(snapshot);
                channels.insert(collection.to_string(), tx);
            }
        }
    }

    /// Brings the channel for `collection` up to `current`, then subscribes.
    ///
    /// Existing subscribers are notified only if `current` differs from what
    /// the channel already holds, so a write whose publish never ran is picked
    /// up by the next subscriber.
    fn refresh_and_subscribe(&self, collection: &str, current: Vec<AppRecord>) -> SnapshotFeed {
        let mut channels = self.lock();
        let tx = channels
            .entry(collection.to_string())
            .or_insert_with(|| watch::channel(None).0);
        tx.send_if_modified(|snapshot| {
            if snapshot.as_deref() == Some(&current) {
                return false;
            }
            *snapshot = Some(Arc::new(current));
            true
        });
        SnapshotFeed::new(tx.subscribe())
    }

    fn receiver_count(&self, collection: &str) -> usize {
        self.lock()
            .get(collection)
            .map_or(0, |tx| tx.receiver_count())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, watch::Sender<Option<Snapshot>>>> {
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
