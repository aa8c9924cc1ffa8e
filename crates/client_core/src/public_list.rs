//! Read-only view over the live app list.

use futures::{Stream, StreamExt};
use shared::StoreError;
use storage::{LiveQuery, RecordStore, Snapshot, SnapshotFeed};
use tracing::debug;

pub const PUBLIC_EMPTY_MESSAGE: &str = "No apps available yet. Stay tuned!";
pub const ADMIN_EMPTY_MESSAGE: &str = "No apps found.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState {
    /// No snapshot has arrived yet.
    Loading,
    /// A snapshot arrived and it holds no records.
    Empty,
    Ready(Snapshot),
}

impl ListState {
    pub fn from_snapshot(snapshot: Option<Snapshot>) -> Self {
        match snapshot {
            None => Self::Loading,
            Some(snapshot) if snapshot.is_empty() => Self::Empty,
            Some(snapshot) => Self::Ready(snapshot),
        }
    }
}

pub struct PublicListView {
    collection: String,
    feed: SnapshotFeed,
}

impl PublicListView {
    pub async fn open(store: &dyn RecordStore, collection: &str) -> Result<Self, StoreError> {
        let feed = store.subscribe(&LiveQuery::newest_first(collection)).await?;
        debug!("public list: opened collection={collection}");
        Ok(Self {
            collection: collection.to_string(),
            feed,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn state(&self) -> ListState {
        ListState::from_snapshot(self.feed.latest())
    }

    /// Waits for the store's next emission.
    pub async fn next_state(&mut self) -> Result<ListState, StoreError> {
        let snapshot = self.feed.changed().await?;
        Ok(ListState::from_snapshot(snapshot))
    }

    /// Every loaded state from now on, starting with the current one.
    pub fn updates(self) -> impl Stream<Item = ListState> + Send + Unpin + 'static {
        self.feed
            .into_stream()
            .map(|snapshot| ListState::from_snapshot(Some(snapshot)))
    }

    pub fn close(self) {
        debug!("public list: closed collection={}", self.collection);
    }
}

#[cfg(test)]
#[path = "tests/public_list_tests.rs"]
mod tests;
