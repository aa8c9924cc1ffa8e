//! Admin controller: form lifecycle, confirmed writes, and the live list.

use std::{
    future::Future,
    sync::{Arc, Weak},
    time::Duration,
};

use shared::{AppRecord, RecordId, StoreError};
use storage::{LiveQuery, RecordStore, Snapshot, SnapshotFeed};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    clock::{Clock, SystemClock},
    error::{ControllerError, ErrorNotice, StoreOperation, UserAction},
    form::AppForm,
    subscription::Subscription,
    APPS_COLLECTION,
};

/// Client-side bound on a single store write.
pub const SAVE_TIMEOUT: Duration = Duration::from_secs(30);
pub const SAVING_STATUS: &str = "Saving details...";

#[derive(Debug, Clone)]
pub struct AdminOptions {
    pub collection: String,
    pub save_timeout: Duration,
}

impl Default for AdminOptions {
    fn default() -> Self {
        Self {
            collection: APPS_COLLECTION.to_string(),
            save_timeout: SAVE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(RecordId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Created(RecordId),
    Updated(RecordId),
}

#[derive(Debug, Clone)]
pub enum AdminEvent {
    ListUpdated(Snapshot),
    FormChanged,
    Saved(SaveOutcome),
    Deleted(RecordId),
    Notice(ErrorNotice),
}

/// Point-in-time copy of everything a dashboard renders.
#[derive(Debug, Clone)]
pub struct AdminView {
    /// `None` until the first snapshot arrives.
    pub apps: Option<Snapshot>,
    pub form: AppForm,
    pub mode: FormMode,
    pub form_open: bool,
    pub save_confirmation_open: bool,
    pub pending_delete: Option<RecordId>,
    pub saving: bool,
    pub deleting: bool,
    pub status_message: Option<&'static str>,
    pub notice: Option<ErrorNotice>,
    /// Set after a failed or timed-out write until the next snapshot lands.
    pub list_may_be_stale: bool,
}

impl AdminView {
    pub fn is_loading(&self) -> bool {
        self.apps.is_none()
    }

    pub fn app_count(&self) -> usize {
        self.apps.as_ref().map_or(0, |apps| apps.len())
    }
}

#[derive(Debug, Clone)]
struct EditTarget {
    id: RecordId,
    created_at: i64,
}

struct AdminState {
    apps: Option<Snapshot>,
    form: AppForm,
    edit_target: Option<EditTarget>,
    form_open: bool,
    save_confirmation_open: bool,
    pending_delete: Option<RecordId>,
    saving: bool,
    deleting: bool,
    notice: Option<ErrorNotice>,
    list_may_be_stale: bool,
    subscription: Option<Subscription>,
    torn_down: bool,
}

impl AdminState {
    fn new() -> Self {
        Self {
            apps: None,
            form: AppForm::empty(),
            edit_target: None,
            form_open: false,
            save_confirmation_open: false,
            pending_delete: None,
            saving: false,
            deleting: false,
            notice: None,
            list_may_be_stale: false,
            subscription: None,
            torn_down: false,
        }
    }

    fn ensure_live(&self) -> Result<(), ControllerError> {
        if self.torn_down {
            return Err(ControllerError::Detached);
        }
        Ok(())
    }

    fn ensure_not_saving(&self) -> Result<(), ControllerError> {
        self.ensure_live()?;
        if self.saving {
            return Err(ControllerError::Busy(UserAction::Save));
        }
        Ok(())
    }

    fn reset_form(&mut self) {
        self.form = AppForm::empty();
        self.edit_target = None;
        self.form_open = false;
        self.save_confirmation_open = false;
        self.notice = None;
    }
}

pub struct AdminController {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    options: AdminOptions,
    inner: Mutex<AdminState>,
    events: broadcast::Sender<AdminEvent>,
}

impl AdminController {
    pub fn new(store: Arc<dyn RecordStore>) -> Arc<Self> {
        Self::new_with_dependencies(store, Arc::new(SystemClock), AdminOptions::default())
    }

    pub fn new_with_dependencies(
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        options: AdminOptions,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            store,
            clock,
            options,
            inner: Mutex::new(AdminState::new()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<AdminEvent> {
        self.events.subscribe()
    }

    /// Opens the live query and keeps the list mirrored from it until
    /// `unmount`. The current snapshot, if any, is applied before returning.
    pub async fn mount(self: &Arc<Self>) -> Result<(), ControllerError> {
        {
            let state = self.inner.lock().await;
            state.ensure_live()?;
            if state.subscription.is_some() {
                return Ok(());
            }
        }

        let query = LiveQuery::newest_first(self.options.collection.clone());
        let mut feed = match self.store.subscribe(&query).await {
            Ok(feed) => feed,
            Err(source) => {
                let err = ControllerError::Store {
                    operation: StoreOperation::Subscribe,
                    source,
                };
                warn!(
                    "admin: subscribe failed collection={}: {err}",
                    self.options.collection
                );
                self.publish_notice(&err).await;
                return Err(err);
            }
        };

        if let Some(snapshot) = feed.current() {
            self.apply_snapshot(snapshot).await;
        }

        let task = tokio::spawn(consume_feed(Arc::downgrade(self), feed));
        let mut state = self.inner.lock().await;
        if state.torn_down {
            task.abort();
            return Err(ControllerError::Detached);
        }
        state.subscription = Some(Subscription::new(self.options.collection.clone(), task));
        info!("admin: mounted collection={}", self.options.collection);
        Ok(())
    }

    /// Tears down the live query. Results of writes still in flight are
    /// discarded when they arrive.
    pub async fn unmount(&self) {
        let subscription = {
            let mut state = self.inner.lock().await;
            state.torn_down = true;
            state.subscription.take()
        };
        drop(subscription);
        info!("admin: unmounted collection={}", self.options.collection);
    }

    pub async fn is_mounted(&self) -> bool {
        let state = self.inner.lock().await;
        !state.torn_down
            && state
                .subscription
                .as_ref()
                .is_some_and(Subscription::is_active)
    }

    pub async fn view(&self) -> AdminView {
        let state = self.inner.lock().await;
        AdminView {
            apps: state.apps.clone(),
            form: state.form.clone(),
            mode: match &state.edit_target {
                Some(target) => FormMode::Edit(target.id.clone()),
                None => FormMode::Create,
            },
            form_open: state.form_open,
            save_confirmation_open: state.save_confirmation_open,
            pending_delete: state.pending_delete.clone(),
            saving: state.saving,
            deleting: state.deleting,
            status_message: state.saving.then_some(SAVING_STATUS),
            notice: state.notice.clone(),
            list_may_be_stale: state.list_may_be_stale,
        }
    }

    pub async fn form(&self) -> AppForm {
        self.inner.lock().await.form.clone()
    }

    pub async fn open_create_form(&self) -> Result<(), ControllerError> {
        let mut state = self.inner.lock().await;
        state.ensure_not_saving()?;
        state.form_open = true;
        drop(state);
        self.emit(AdminEvent::FormChanged);
        Ok(())
    }

    /// Applies an in-place edit to the form fields.
    pub async fn edit_form(
        &self,
        edit: impl FnOnce(&mut AppForm) + Send,
    ) -> Result<(), ControllerError> {
        let mut state = self.inner.lock().await;
        state.ensure_not_saving()?;
        edit(&mut state.form);
        drop(state);
        self.emit(AdminEvent::FormChanged);
        Ok(())
    }

    pub async fn begin_edit(&self, record: &AppRecord) -> Result<(), ControllerError> {
        let mut state = self.inner.lock().await;
        state.ensure_not_saving()?;
        state.form = AppForm::from_record(record);
        state.edit_target = Some(EditTarget {
            id: record.id.clone(),
            created_at: record.created_at,
        });
        state.form_open = true;
        state.save_confirmation_open = false;
        drop(state);
        debug!("admin: editing id={}", record.id);
        self.emit(AdminEvent::FormChanged);
        Ok(())
    }

    /// Starts editing the record with `id` from the current snapshot.
    pub async fn begin_edit_by_id(&self, id: &RecordId) -> Result<(), ControllerError> {
        let record = {
            let state = self.inner.lock().await;
            state
                .apps
                .as_ref()
                .and_then(|apps| apps.iter().find(|app| &app.id == id).cloned())
        };
        match record {
            Some(record) => self.begin_edit(&record).await,
            None => Err(ControllerError::UnknownRecord(id.clone())),
        }
    }

    /// Discards in-progress edits and returns to create mode with the empty
    /// template.
    pub async fn cancel_edit(&self) -> Result<(), ControllerError> {
        let mut state = self.inner.lock().await;
        state.ensure_not_saving()?;
        state.reset_form();
        drop(state);
        self.emit(AdminEvent::FormChanged);
        Ok(())
    }

    pub async fn reset(&self) -> Result<(), ControllerError> {
        self.cancel_edit().await
    }

    /// Validates the form and, if it passes, opens the save confirmation.
    pub async fn request_save(&self) -> Result<(), ControllerError> {
        let mut state = self.inner.lock().await;
        state.ensure_not_saving()?;
        if let Err(err) = crate::form::check(&state.form) {
            let err = ControllerError::from(err);
            let notice = err.notice();
            state.notice = Some(notice.clone());
            drop(state);
            self.emit(AdminEvent::Notice(notice));
            return Err(err);
        }
        state.save_confirmation_open = true;
        Ok(())
    }

    pub async fn cancel_save(&self) -> Result<(), ControllerError> {
        let mut state = self.inner.lock().await;
        state.ensure_not_saving()?;
        state.save_confirmation_open = false;
        Ok(())
    }

    /// Writes the confirmed form to the store, bounded by the save timeout.
    ///
    /// On success the form returns to the empty create template. On failure
    /// the form is left as it was so the save can be retried.
    pub async fn confirm_save(&self) -> Result<SaveOutcome, ControllerError> {
        let (target, fields) = {
            let mut state = self.inner.lock().await;
            state.ensure_not_saving()?;
            if !state.save_confirmation_open {
                return Err(ControllerError::ConfirmationRequired(UserAction::Save));
            }
            state.save_confirmation_open = false;

            let target = state.edit_target.clone();
            let created_at = target
                .as_ref()
                .map_or_else(|| self.clock.now_millis(), |target| target.created_at);
            let fields = match state.form.to_fields(created_at) {
                Ok(fields) => fields,
                Err(err) => {
                    let err = ControllerError::from(err);
                    let notice = err.notice();
                    state.notice = Some(notice.clone());
                    drop(state);
                    self.emit(AdminEvent::Notice(notice));
                    return Err(err);
                }
            };
            state.saving = true;
            (target, fields)
        };

        let store = Arc::clone(&self.store);
        let collection = self.options.collection.clone();
        let (operation, result) = match target {
            Some(target) => (
                StoreOperation::Update,
                self.run_bounded(StoreOperation::Update, async move {
                    store
                        .update(&collection, &target.id, &fields)
                        .await
                        .map(|()| SaveOutcome::Updated(target.id))
                })
                .await,
            ),
            None => (
                StoreOperation::Create,
                self.run_bounded(StoreOperation::Create, async move {
                    store
                        .create(&collection, &fields)
                        .await
                        .map(SaveOutcome::Created)
                })
                .await,
            ),
        };

        let mut state = self.inner.lock().await;
        state.saving = false;
        if state.torn_down {
            debug!("admin: discarding {operation} result after teardown");
            return Err(ControllerError::Detached);
        }

        match result {
            Ok(outcome) => {
                state.reset_form();
                drop(state);
                match &outcome {
                    SaveOutcome::Created(id) => info!("admin: created id={id}"),
                    SaveOutcome::Updated(id) => info!("admin: updated id={id}"),
                }
                self.emit(AdminEvent::Saved(outcome.clone()));
                Ok(outcome)
            }
            Err(err) => {
                let notice = err.notice();
                state.notice = Some(notice.clone());
                state.list_may_be_stale = true;
                drop(state);
                warn!("admin: save failed: {err}");
                self.emit(AdminEvent::Notice(notice));
                Err(err)
            }
        }
    }

    pub async fn request_delete(&self, id: RecordId) -> Result<(), ControllerError> {
        let mut state = self.inner.lock().await;
        state.ensure_live()?;
        if state.deleting {
            return Err(ControllerError::Busy(UserAction::Delete));
        }
        state.pending_delete = Some(id);
        Ok(())
    }

    pub async fn cancel_delete(&self) -> Result<(), ControllerError> {
        let mut state = self.inner.lock().await;
        state.ensure_live()?;
        if state.deleting {
            return Err(ControllerError::Busy(UserAction::Delete));
        }
        state.pending_delete = None;
        Ok(())
    }

    /// Deletes the record named by the preceding `request_delete`.
    ///
    /// The list is not touched locally: the record disappears only when the
    /// store emits a snapshot without it.
    pub async fn confirm_delete(&self) -> Result<RecordId, ControllerError> {
        let id = {
            let mut state = self.inner.lock().await;
            state.ensure_live()?;
            if state.deleting {
                return Err(ControllerError::Busy(UserAction::Delete));
            }
            let Some(id) = state.pending_delete.clone() else {
                return Err(ControllerError::NothingToDelete);
            };
            state.deleting = true;
            id
        };

        let store = Arc::clone(&self.store);
        let collection = self.options.collection.clone();
        let target = id.clone();
        let result = self
            .run_bounded(StoreOperation::Delete, async move {
                store.delete(&collection, &target).await
            })
            .await;

        let mut state = self.inner.lock().await;
        state.deleting = false;
        if state.torn_down {
            debug!("admin: discarding delete result after teardown id={id}");
            return Err(ControllerError::Detached);
        }

        match result {
            Ok(()) => {
                state.pending_delete = None;
                drop(state);
                info!("admin: deleted id={id}");
                self.emit(AdminEvent::Deleted(id.clone()));
                Ok(id)
            }
            Err(err) => {
                let notice = err.notice();
                state.notice = Some(notice.clone());
                state.list_may_be_stale = true;
                drop(state);
                warn!("admin: delete failed id={id}: {err}");
                self.emit(AdminEvent::Notice(notice));
                Err(err)
            }
        }
    }

    /// Runs a store write on its own task and waits for it up to the save
    /// timeout. On timeout the task is left running, so the write still
    /// completes and reaches the live feed.
    async fn run_bounded<T>(
        &self,
        operation: StoreOperation,
        write: impl Future<Output = Result<T, StoreError>> + Send + 'static,
    ) -> Result<T, ControllerError>
    where
        T: Send + 'static,
    {
        let bound = self.options.save_timeout;
        match tokio::time::timeout(bound, tokio::spawn(write)).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(source))) => Err(ControllerError::Store { operation, source }),
            Ok(Err(join_err)) => Err(ControllerError::Store {
                operation,
                source: StoreError::internal(format!("{operation} task failed: {join_err}")),
            }),
            Err(_) => Err(ControllerError::StoreTimeout {
                operation,
                after: bound,
            }),
        }
    }

    async fn apply_snapshot(&self, snapshot: Snapshot) {
        let mut state = self.inner.lock().await;
        if state.torn_down {
            return;
        }
        state.apps = Some(Arc::clone(&snapshot));
        state.list_may_be_stale = false;
        drop(state);
        debug!(
            "admin: applied snapshot collection={} records={}",
            self.options.collection,
            snapshot.len()
        );
        self.emit(AdminEvent::ListUpdated(snapshot));
    }

    async fn publish_notice(&self, err: &ControllerError) {
        let notice = err.notice();
        self.inner.lock().await.notice = Some(notice.clone());
        self.emit(AdminEvent::Notice(notice));
    }

    fn emit(&self, event: AdminEvent) {
        let _ = self.events.send(event);
    }
}

async fn consume_feed(controller: Weak<AdminController>, mut feed: SnapshotFeed) {
    loop {
        match feed.changed().await {
            Ok(Some(snapshot)) => {
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                controller.apply_snapshot(snapshot).await;
            }
            Ok(None) => {}
            Err(err) => {
                warn!("admin: live query ended: {err}");
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/admin_tests.rs"]
mod tests;
