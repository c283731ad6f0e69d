//! Minimal embedding example for idp-link-core
//!
//! Drives the controller and reconciler against an in-process directory, so
//! it runs without AWS credentials. The application owns every component.

use idp_link_core::traits::{DirectoryClient, ProviderUserIdentifier, StateStore};
use idp_link_core::{
    ControllerConfig, DestinationUser, Error, LinkController, LinkResource, MemoryStateStore,
    Reconciler, Result, SourceUser,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

/// Directory kept in memory: users, and federated identity → username
#[derive(Default)]
struct EmbeddedDirectory {
    users: HashSet<String>,
    links: Mutex<HashMap<(String, String), String>>,
}

impl EmbeddedDirectory {
    fn with_users(users: &[&str]) -> Self {
        Self {
            users: users.iter().map(|u| u.to_string()).collect(),
            ..Self::default()
        }
    }

    fn linked(&self) -> usize {
        self.links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn identity_key(identity: &ProviderUserIdentifier) -> (String, String) {
    (
        identity.provider_name.clone(),
        identity.provider_attribute_value.clone(),
    )
}

#[async_trait::async_trait]
impl DirectoryClient for EmbeddedDirectory {
    async fn link_identities(
        &self,
        _user_pool_id: &str,
        destination: &ProviderUserIdentifier,
        source: &ProviderUserIdentifier,
    ) -> Result<()> {
        if !self.users.contains(&destination.provider_attribute_value) {
            return Err(Error::not_found("User does not exist."));
        }
        println!(
            "[Embedded] Linking {}:{} -> {}",
            source.provider_name, source.provider_attribute_value, destination.provider_attribute_value
        );
        self.links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity_key(source), destination.provider_attribute_value.clone());
        Ok(())
    }

    async fn probe_user_exists(&self, _user_pool_id: &str, username: &str) -> Result<()> {
        if self.users.contains(username) {
            Ok(())
        } else {
            Err(Error::not_found("User does not exist."))
        }
    }

    async fn unlink_identity(
        &self,
        _user_pool_id: &str,
        identity: &ProviderUserIdentifier,
    ) -> Result<()> {
        println!(
            "[Embedded] Unlinking {}:{}",
            identity.provider_name, identity.provider_attribute_value
        );
        self.links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&identity_key(identity));
        Ok(())
    }

    fn directory_name(&self) -> &'static str {
        "embedded"
    }
}

fn link(destination: &str, source: &str) -> LinkResource {
    LinkResource::new(
        "local_pool",
        DestinationUser::new("Cognito", destination),
        SourceUser::new("Google", "Cognito_Subject", source),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Embedded idp-link-core Example ===\n");

    let directory = Arc::new(EmbeddedDirectory::with_users(&["alice", "bob"]));
    let state = MemoryStateStore::new();
    let config = ControllerConfig::default();

    let controller = LinkController::from_config(directory.clone(), &config);
    let (reconciler, mut events) =
        Reconciler::new(Arc::new(controller), Box::new(state.clone()), &config);

    let mut declared = BTreeMap::new();
    declared.insert("alice_google".to_string(), link("alice", "1111"));
    declared.insert("bob_google".to_string(), link("bob", "2222"));

    for change in reconciler.plan(&declared).await? {
        println!("Planned: {} -> {:?}", change.name, change.action);
    }

    let summary = reconciler.apply(&declared).await?;
    println!(
        "\nApplied: {} created, {} failed; directory holds {} link(s)",
        summary.created.len(),
        summary.failed.len(),
        directory.linked()
    );

    // Second apply converges without remote changes.
    let summary = reconciler.apply(&declared).await?;
    println!("Re-applied: {} unchanged", summary.unchanged.len());

    declared.remove("bob_google");
    let summary = reconciler.apply(&declared).await?;
    println!("Removed declaration: {} deleted", summary.deleted.len());

    let summary = reconciler.destroy().await?;
    println!(
        "Destroyed: {} deleted; {} record(s) left in state",
        summary.deleted.len(),
        state.list_records().await?.len()
    );

    drop(reconciler);
    while let Some(event) = events.recv().await {
        println!("[Event] {:?}", event);
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
