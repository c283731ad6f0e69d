// # Link Lifecycle Trait
//
// The plugin contract a declarative host drives: create, read, update,
// delete, plus passthrough import. `LinkController` is the implementation;
// the `Reconciler` (and any other host) only sees this trait.

use async_trait::async_trait;

use crate::model::LinkResource;

/// Lifecycle verbs for one link resource
#[async_trait]
pub trait LinkLifecycle: Send + Sync {
    /// Create the link and return the resource with its ID set
    ///
    /// On error nothing exists and the caller must not persist anything.
    async fn create(&self, desired: LinkResource) -> Result<LinkResource, crate::Error>;

    /// Confirm the link still exists
    ///
    /// - `Ok(Some(resource))`: still present, returned unchanged
    /// - `Ok(None)`: gone; the caller drops it from state
    async fn read(&self, current: LinkResource) -> Result<Option<LinkResource>, crate::Error>;

    /// In-place modification; always rejected
    async fn update(
        &self,
        prior: LinkResource,
        planned: LinkResource,
    ) -> Result<LinkResource, crate::Error>;

    /// Remove the link
    ///
    /// On error the resource is still present.
    async fn delete(&self, current: &LinkResource) -> Result<(), crate::Error>;

    /// Adopt an existing link by its opaque ID
    fn import(&self, id: &str) -> Result<LinkResource, crate::Error>;
}
