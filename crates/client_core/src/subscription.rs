use tokio::task::JoinHandle;
use tracing::debug;

/// Cancellation handle for a live query consumer task.
///
/// Dropping the handle aborts the task, which drops the underlying feed and
/// unsubscribes from the store.
pub struct Subscription {
    collection: String,
    task: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn new(collection: impl Into<String>, task: JoinHandle<()>) -> Self {
        Self {
            collection: collection.into(),
            task,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
        debug!("subscription: cancelled collection={}", self.collection);
    }
}
