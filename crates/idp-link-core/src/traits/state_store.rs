// # State Store Trait
//
// Defines the interface for persisted resource state.
//
// ## Purpose
//
// The host persists whatever a successful lifecycle call returns and treats
// it as authoritative on the next run. Entries are keyed by the resource
// name used in the declaration (e.g. "alice_google").
//
// ## Implementations
//
// - File-based: JSON with atomic writes and backup recovery
// - In-memory: tests and one-shot runs
//
// ## Usage
//
// ```rust,ignore
// use idp_link_core::StateStore;
//
// #[tokio::main]
// async fn main() -> idp_link_core::Result<()> {
//     let store = /* StateStore implementation */;
//
//     // Record a created link
//     store.set_resource("alice_google", &created).await?;
//
//     // Drop it after the existence probe failed
//     store.delete_record("alice_google").await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::model::LinkResource;

/// Persisted state for one link resource
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StateRecord {
    /// The resource as last returned by the controller
    pub resource: LinkResource,
    /// When the controller last confirmed or produced this state
    pub last_refreshed: chrono::DateTime<chrono::Utc>,
}

impl StateRecord {
    /// Create a new state record stamped with the current time
    pub fn new(resource: LinkResource) -> Self {
        Self {
            resource,
            last_refreshed: chrono::Utc::now(),
        }
    }
}

/// Trait for state store implementations
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// State stores perform I/O for durability only. They never call the
/// directory service and never decide what to create or delete; that is the
/// `Reconciler`'s job.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the stored resource for a name
    async fn get_resource(&self, name: &str) -> Result<Option<LinkResource>, crate::Error>;

    /// Get the full state record, including when it was last confirmed
    async fn get_record(&self, name: &str) -> Result<Option<StateRecord>, crate::Error>;

    /// Store a resource, stamping it with the current time
    async fn set_resource(&self, name: &str, resource: &LinkResource) -> Result<(), crate::Error>;

    /// Delete a state record (no error if it didn't exist)
    async fn delete_record(&self, name: &str) -> Result<(), crate::Error>;

    /// List all resource names in the store
    async fn list_records(&self) -> Result<Vec<String>, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}

/// Helper trait for constructing state stores from configuration
#[async_trait]
pub trait StateStoreFactory: Send + Sync {
    /// Create a StateStore instance from its configuration
    async fn create(
        &self,
        config: &crate::config::StateStoreConfig,
    ) -> Result<Box<dyn StateStore>, crate::Error>;
}
