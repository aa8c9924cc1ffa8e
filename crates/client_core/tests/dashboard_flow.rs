use std::{sync::Arc, time::Duration};

use client_core::{
    AdminController, AdminEvent, ListState, PublicListView, SaveOutcome, APPS_COLLECTION,
};
use shared::LaunchStatus;
use storage::{MemoryRecordStore, RecordStore};
use tokio::sync::broadcast;

async fn wait_for_list(events: &mut broadcast::Receiver<AdminEvent>) -> usize {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(AdminEvent::ListUpdated(apps)) = events.recv().await {
                return apps.len();
            }
        }
    })
    .await
    .expect("list update")
}

#[tokio::test]
async fn admin_writes_reach_the_public_list() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
    let mut public = PublicListView::open(store.as_ref(), APPS_COLLECTION)
        .await
        .expect("open public list");
    assert_eq!(public.state(), ListState::Empty);

    let admin = AdminController::new(Arc::clone(&store));
    let mut events = admin.subscribe_events();
    admin.mount().await.expect("mount");
    assert_eq!(wait_for_list(&mut events).await, 0);

    admin.open_create_form().await.expect("open form");
    admin
        .edit_form(|form| {
            form.name = "Ludo Supreme".into();
            form.launch_status = LaunchStatus::ComingOnDate;
            form.launch_date = "2026-12-24".into();
        })
        .await
        .expect("edit");
    admin.request_save().await.expect("request");
    let SaveOutcome::Created(id) = admin.confirm_save().await.expect("save") else {
        panic!("expected create");
    };
    assert_eq!(wait_for_list(&mut events).await, 1);

    let ListState::Ready(apps) = public.next_state().await.expect("public update") else {
        panic!("expected records");
    };
    assert_eq!(apps[0].id, id);
    assert_eq!(apps[0].launch_summary().as_deref(), Some("Target: 2026-12-24"));

    admin.request_delete(id).await.expect("request delete");
    admin.confirm_delete().await.expect("delete");
    assert_eq!(wait_for_list(&mut events).await, 0);
    assert_eq!(
        public.next_state().await.expect("public update"),
        ListState::Empty
    );

    admin.unmount().await;
    public.close();
}
