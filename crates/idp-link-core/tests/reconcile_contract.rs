//! Contract Test: Reconciliation & State
//!
//! Verifies that persisted state only follows successful directory calls.
//!
//! Constraints verified:
//! - apply creates declared links and is idempotent across runs
//! - a failed existence probe drops the link so the next apply recreates it
//! - a confirmed link is re-stamped by refresh
//! - changed inputs replace the link (unlink, then link)
//! - a failed delete keeps the link in state
//! - imported IDs are adopted by a matching declaration
//! - state survives a restart through the file store
//!
//! If this test fails, state and directory can disagree silently.

mod common;

use common::*;
use idp_link_core::config::ControllerConfig;
use idp_link_core::model::LinkResource;
use idp_link_core::plan::PlannedAction;
use idp_link_core::reconciler::{ReconcileEvent, Reconciler};
use idp_link_core::state::{FileStateStore, MemoryStateStore};
use idp_link_core::traits::StateStore;
use idp_link_core::LinkController;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;

fn reconciler(
    client: &RecordingDirectoryClient,
    store: Box<dyn StateStore>,
) -> (Reconciler, mpsc::Receiver<ReconcileEvent>) {
    let controller = LinkController::new(Arc::new(client.clone()));
    Reconciler::new(Arc::new(controller), store, &ControllerConfig::default())
}

fn declared(links: &[(&str, LinkResource)]) -> BTreeMap<String, LinkResource> {
    links
        .iter()
        .map(|(name, link)| (name.to_string(), link.clone()))
        .collect()
}

fn drain(rx: &mut mpsc::Receiver<ReconcileEvent>) -> Vec<ReconcileEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn apply_creates_then_converges() {
    let client = RecordingDirectoryClient::new();
    let store = MemoryStateStore::new();
    let (reconciler, mut events) = reconciler(&client, Box::new(store.clone()));
    let links = declared(&[("alice", sample_link())]);

    let first = reconciler.apply(&links).await.unwrap();
    assert!(first.is_success());
    assert_eq!(first.created, vec!["alice".to_string()]);

    let stored = store.get_resource("alice").await.unwrap().unwrap();
    assert_eq!(stored.id.as_deref(), Some("pool-1:dest-42:src-99"));
    assert!(drain(&mut events).contains(&ReconcileEvent::Created {
        name: "alice".to_string(),
        id: "pool-1:dest-42:src-99".to_string(),
    }));

    let second = reconciler.apply(&links).await.unwrap();
    assert!(second.created.is_empty());
    assert_eq!(second.unchanged, vec!["alice".to_string()]);
    assert_eq!(client.link_count(), 1);
    // The second run refreshed through the probe.
    assert_eq!(client.probe_count(), 1);
}

#[tokio::test]
async fn invalid_declaration_aborts_before_any_call() {
    let client = RecordingDirectoryClient::new();
    let (reconciler, _events) = reconciler(&client, Box::new(MemoryStateStore::new()));
    let mut broken = sample_link();
    broken.source_user.provider_name.clear();

    let err = reconciler
        .apply(&declared(&[("ok", link_for("dest-1", "src-1")), ("broken", broken)]))
        .await
        .unwrap_err();

    assert!(err.is_config());
    assert!(err.to_string().contains("broken"));
    assert_eq!(client.total_calls(), 0);
}

#[tokio::test]
async fn failed_probe_drops_link_and_next_apply_recreates_it() {
    let client = RecordingDirectoryClient::new();
    let store = MemoryStateStore::new();
    let (reconciler, mut events) = reconciler(&client, Box::new(store.clone()));
    let links = declared(&[("alice", sample_link())]);
    reconciler.apply(&links).await.unwrap();

    client.remove_user("dest-42");
    let dropped = reconciler.refresh().await.unwrap();

    assert_eq!(dropped, vec!["alice".to_string()]);
    assert!(store.get_resource("alice").await.unwrap().is_none());
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        ReconcileEvent::Dropped { name, .. } if name == "alice"
    )));

    let summary = reconciler.apply(&links).await.unwrap();
    assert_eq!(summary.created, vec!["alice".to_string()]);
    assert_eq!(client.link_count(), 2);
}

#[tokio::test]
async fn refresh_restamps_confirmed_links() {
    let client = RecordingDirectoryClient::new();
    let store = MemoryStateStore::new();
    let (reconciler, _events) = reconciler(&client, Box::new(store.clone()));
    reconciler
        .apply(&declared(&[("alice", sample_link())]))
        .await
        .unwrap();
    let created = store.get_record("alice").await.unwrap().unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    assert!(reconciler.refresh().await.unwrap().is_empty());

    let confirmed = store.get_record("alice").await.unwrap().unwrap();
    assert_eq!(confirmed.resource, created.resource);
    assert!(confirmed.last_refreshed > created.last_refreshed);
}

#[tokio::test]
async fn changed_input_replaces_link() {
    let client = RecordingDirectoryClient::new();
    let store = MemoryStateStore::new();
    let (reconciler, _events) = reconciler(&client, Box::new(store.clone()));
    reconciler
        .apply(&declared(&[("alice", sample_link())]))
        .await
        .unwrap();

    let mut changed = sample_link();
    changed.source_user.provider_attribute_value = "src-100".to_string();
    let links = declared(&[("alice", changed)]);

    let plan = reconciler.plan(&links).await.unwrap();
    assert_eq!(
        plan[0].action,
        PlannedAction::Replace {
            changed: vec!["source_user.provider_attribute_value"]
        }
    );

    let summary = reconciler.apply(&links).await.unwrap();
    assert_eq!(summary.replaced, vec!["alice".to_string()]);
    assert_eq!(client.unlink_count(), 1);
    assert_eq!(client.link_count(), 2);

    let calls = client.calls();
    let unlink_at = calls
        .iter()
        .position(|c| matches!(c, DirectoryCall::Unlink { .. }))
        .unwrap();
    let relink_at = calls
        .iter()
        .rposition(|c| matches!(c, DirectoryCall::Link { .. }))
        .unwrap();
    assert!(unlink_at < relink_at, "old link must be removed first");

    let stored = store.get_resource("alice").await.unwrap().unwrap();
    assert_eq!(stored.id.as_deref(), Some("pool-1:dest-42:src-100"));
}

#[tokio::test]
async fn failed_delete_keeps_link_in_state() {
    let client = RecordingDirectoryClient::new();
    let store = MemoryStateStore::new();
    let (reconciler, mut events) = reconciler(&client, Box::new(store.clone()));
    reconciler
        .apply(&declared(&[("alice", sample_link())]))
        .await
        .unwrap();
    drain(&mut events);

    client.fail_unlink(Failure::Service);
    let summary = reconciler.destroy().await.unwrap();

    assert!(!summary.is_success());
    assert_eq!(summary.failed[0].name, "alice");
    assert!(store.get_resource("alice").await.unwrap().is_some());
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        ReconcileEvent::Failed { operation, .. } if operation == "delete"
    )));
}

#[tokio::test]
async fn one_failure_does_not_stop_other_links() {
    let client = RecordingDirectoryClient::new();
    let store = MemoryStateStore::new();
    let (reconciler, _events) = reconciler(&client, Box::new(store.clone()));
    client.fail_link(Failure::AccessDenied);

    let summary = reconciler
        .apply(&declared(&[
            ("alice", link_for("dest-1", "src-1")),
            ("bob", link_for("dest-2", "src-2")),
        ]))
        .await
        .unwrap();

    assert_eq!(summary.failed.len(), 2);
    assert_eq!(client.link_count(), 2);
    assert!(store.list_records().await.unwrap().is_empty());
}

#[tokio::test]
async fn undeclared_link_is_deleted() {
    let client = RecordingDirectoryClient::new();
    let store = MemoryStateStore::new();
    let (reconciler, _events) = reconciler(&client, Box::new(store.clone()));
    reconciler
        .apply(&declared(&[("alice", sample_link())]))
        .await
        .unwrap();

    let summary = reconciler.apply(&BTreeMap::new()).await.unwrap();

    assert_eq!(summary.deleted, vec!["alice".to_string()]);
    assert!(store.list_records().await.unwrap().is_empty());
}

#[tokio::test]
async fn import_is_adopted_by_matching_declaration() {
    let client = RecordingDirectoryClient::new();
    let store = MemoryStateStore::new();
    let (reconciler, _events) = reconciler(&client, Box::new(store.clone()));

    let imported = reconciler
        .import("alice", "pool-1:dest-42:src-99")
        .await
        .unwrap();
    assert!(!imported.has_inputs());
    assert_eq!(client.total_calls(), 0);

    // Import-only entries are not probed.
    assert!(reconciler.refresh().await.unwrap().is_empty());
    assert_eq!(client.total_calls(), 0);

    let summary = reconciler
        .apply(&declared(&[("alice", sample_link())]))
        .await
        .unwrap();

    assert_eq!(summary.adopted, vec!["alice".to_string()]);
    assert_eq!(client.link_count(), 0);
    assert_eq!(client.probe_count(), 1);
    let stored = store.get_resource("alice").await.unwrap().unwrap();
    assert_eq!(stored.source_user.provider_attribute_value, "src-99");
    assert_eq!(stored.id.as_deref(), Some("pool-1:dest-42:src-99"));
}

#[tokio::test]
async fn import_refuses_managed_name() {
    let client = RecordingDirectoryClient::new();
    let (reconciler, _events) = reconciler(&client, Box::new(MemoryStateStore::new()));
    reconciler.import("alice", "pool-1:a:b").await.unwrap();

    let err = reconciler.import("alice", "pool-1:c:d").await.unwrap_err();
    assert!(err.is_config());
}

#[tokio::test]
async fn state_survives_restart_with_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let client = RecordingDirectoryClient::new();
    let links = declared(&[("alice", sample_link())]);

    {
        let store = FileStateStore::new(&path).await.unwrap();
        let (reconciler, _events) = reconciler(&client, Box::new(store));
        reconciler.apply(&links).await.unwrap();
    }

    let store = FileStateStore::new(&path).await.unwrap();
    let (reconciler, _events) = reconciler(&client, Box::new(store));
    let summary = reconciler.apply(&links).await.unwrap();

    assert!(summary.created.is_empty());
    assert_eq!(summary.unchanged, vec!["alice".to_string()]);
    assert_eq!(client.link_count(), 1);
}
