use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
};

use async_trait::async_trait;
use shared::{sort_newest_first, AppFields, AppRecord, RecordId, StoreError};
use tracing::debug;

use crate::{FeedHub, LiveQuery, RecordStore, SnapshotFeed};

type Collection = BTreeMap<RecordId, AppFields>;

/// In-process record store with the same live-query semantics as the durable
/// backends.
#[derive(Default)]
pub struct MemoryRecordStore {
    collections: Mutex<HashMap<String, Collection>>,
    hub: FeedHub,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record with a caller-chosen id and `createdAt`, bypassing id
    /// assignment.
    pub fn seed(&self, collection: &str, record: AppRecord) {
        let mut collections = self.lock();
        let docs = collections.entry(collection.to_string()).or_default();
        docs.insert(record.id.clone(), record.fields());
        self.hub.publish(collection, ordered(docs));
    }

    pub fn records(&self, collection: &str) -> Vec<AppRecord> {
        self.lock()
            .get(collection)
            .map(ordered)
            .unwrap_or_default()
    }

    /// Number of live feeds open on `collection`.
    pub fn subscriber_count(&self, collection: &str) -> usize {
        self.hub.receiver_count(collection)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Collection>> {
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn ordered(docs: &Collection) -> Vec<AppRecord> {
    let mut records: Vec<AppRecord> = docs
        .iter()
        .map(|(id, fields)| AppRecord::from_fields(id.clone(), fields.clone()))
        .collect();
    sort_newest_first(&mut records);
    records
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    // Every method publishes while holding the collections lock, so feeds see
    // snapshots in commit order.
    async fn subscribe(&self, query: &LiveQuery) -> Result<SnapshotFeed, StoreError> {
        query.ensure_supported()?;
        let collections = self.lock();
        let current = collections
            .get(&query.collection)
            .map(ordered)
            .unwrap_or_default();
        Ok(self.hub.refresh_and_subscribe(&query.collection, current))
    }

    async fn create(&self, collection: &str, fields: &AppFields) -> Result<RecordId, StoreError> {
        let id = RecordId::generate();
        let mut collections = self.lock();
        let docs = collections.entry(collection.to_string()).or_default();
        docs.insert(id.clone(), fields.clone());
        self.hub.publish(collection, ordered(docs));
        drop(collections);
        debug!("memory store: created collection={collection} id={id}");
        Ok(id)
    }

    async fn update(
        &self,
        collection: &str,
        id: &RecordId,
        fields: &AppFields,
    ) -> Result<(), StoreError> {
        let mut collections = self.lock();
        let Some(docs) = collections
            .get_mut(collection)
            .filter(|docs| docs.contains_key(id))
        else {
            return Err(StoreError::not_found(format!(
                "no document {id} in collection {collection}"
            )));
        };
        docs.insert(id.clone(), fields.clone());
        self.hub.publish(collection, ordered(docs));
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &RecordId) -> Result<(), StoreError> {
        let mut collections = self.lock();
        let Some(docs) = collections
            .get_mut(collection)
            .filter(|docs| docs.contains_key(id))
        else {
            return Err(StoreError::not_found(format!(
                "no document {id} in collection {collection}"
            )));
        };
        docs.remove(id);
        self.hub.publish(collection, ordered(docs));
        Ok(())
    }
}
