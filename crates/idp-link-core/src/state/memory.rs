// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// Provides a simple, fast state store that doesn't persist across restarts.
// Useful for tests, embedding, and one-shot runs that re-import every time.
//
// ## Crash Behavior
//
// - All state is lost on exit
// - The next apply treats every declared link as new and tries to create it,
//   which the directory rejects for links that already exist

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::config::StateStoreConfig;
use crate::model::LinkResource;
use crate::traits::state_store::{StateRecord, StateStore, StateStoreFactory};

/// In-memory state store implementation
///
/// # Example
///
/// ```rust,no_run
/// use idp_link_core::model::{DestinationUser, LinkResource, SourceUser};
/// use idp_link_core::state::MemoryStateStore;
/// use idp_link_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStateStore::new();
///     let link = LinkResource::new(
///         "pool-1",
///         DestinationUser::new("Cognito", "alice"),
///         SourceUser::new("Google", "Cognito_Subject", "123"),
///     );
///
///     store.set_resource("alice_google", &link).await?;
///     assert_eq!(store.get_resource("alice_google").await?, Some(link));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<HashMap<String, StateRecord>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_resource(&self, name: &str) -> Result<Option<LinkResource>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(name).map(|record| record.resource.clone()))
    }

    async fn get_record(&self, name: &str) -> Result<Option<StateRecord>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(name).cloned())
    }

    async fn set_resource(&self, name: &str, resource: &LinkResource) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(name.to_string(), StateRecord::new(resource.clone()));
        Ok(())
    }

    async fn delete_record(&self, name: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.remove(name);
        Ok(())
    }

    async fn list_records(&self) -> Result<Vec<String>, Error> {
        let guard = self.inner.read().await;
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// Factory for the `memory` state store type
pub struct MemoryStateStoreFactory;

#[async_trait]
impl StateStoreFactory for MemoryStateStoreFactory {
    async fn create(&self, config: &StateStoreConfig) -> Result<Box<dyn StateStore>, Error> {
        match config {
            StateStoreConfig::Memory => Ok(Box::new(MemoryStateStore::new())),
            _ => Err(Error::config("Invalid config for memory state store")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DestinationUser, SourceUser};

    fn link(dest: &str) -> LinkResource {
        LinkResource::new(
            "pool-1",
            DestinationUser::new("Cognito", dest),
            SourceUser::new("Google", "Cognito_Subject", "123"),
        )
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStateStore::new();
        assert!(store.list_records().await.unwrap().is_empty());

        store.set_resource("alice", &link("alice")).await.unwrap();
        assert_eq!(
            store.get_resource("alice").await.unwrap(),
            Some(link("alice"))
        );
        let record = store.get_record("alice").await.unwrap().unwrap();
        assert_eq!(record.resource, link("alice"));

        store.delete_record("alice").await.unwrap();
        assert!(store.list_records().await.unwrap().is_empty());
        assert_eq!(store.get_resource("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_list_is_sorted() {
        let store = MemoryStateStore::new();
        store.set_resource("zed", &link("zed")).await.unwrap();
        store.set_resource("bob", &link("bob")).await.unwrap();

        assert_eq!(
            store.list_records().await.unwrap(),
            vec!["bob".to_string(), "zed".to_string()]
        );
    }

    #[tokio::test]
    async fn test_factory_rejects_other_config() {
        let config = StateStoreConfig::File {
            path: "state.json".to_string(),
        };
        assert!(MemoryStateStoreFactory.create(&config).await.is_err());
        assert!(
            MemoryStateStoreFactory
                .create(&StateStoreConfig::Memory)
                .await
                .is_ok()
        );
    }
}
