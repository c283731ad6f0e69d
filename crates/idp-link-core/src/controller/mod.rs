//! Link lifecycle controller
//!
//! The controller maps each lifecycle verb onto at most one directory call:
//!
//! ```text
//! create  ── AdminLinkProviderForUser     (source → destination)
//! read    ── AdminListGroupsForUser       (existence probe on destination)
//! update  ── rejected, no call
//! delete  ── AdminDisableProviderForUser  (source only)
//! import  ── no call, ID taken verbatim
//! ```
//!
//! ## Existence probe
//!
//! The directory has no operation that describes a provider link. `read`
//! therefore looks up the destination user's groups and treats success as
//! proof that the user, and by assumption the link, still exists. Any
//! failure of that lookup is reported as "absent", including failures that
//! say nothing about the link (throttling, revoked permissions). The host
//! then drops the resource and recreates it on the next apply. This is a
//! known false-negative risk and is kept as-is.
//!
//! ## Statelessness
//!
//! The controller holds only the shared client handle and an optional
//! deadline. Every request is built from the resource passed in, so one
//! controller can serve concurrent operations on different resources.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::error::{Error, Result};
use crate::model::LinkResource;
use crate::traits::{DirectoryClient, LinkLifecycle, ProviderUserIdentifier};

/// Message returned for every update attempt
pub const UPDATE_UNSUPPORTED: &str =
    "This resource does not support update operations. Please recreate the resource.";

/// Lifecycle controller for identity provider links
#[derive(Clone)]
pub struct LinkController {
    /// Shared, already-authenticated directory client
    client: Arc<dyn DirectoryClient>,

    /// Deadline for the single remote call of each operation
    operation_timeout: Option<Duration>,
}

impl std::fmt::Debug for LinkController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkController")
            .field("directory", &self.client.directory_name())
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

impl LinkController {
    /// Create a controller around a shared directory client
    pub fn new(client: Arc<dyn DirectoryClient>) -> Self {
        Self {
            client,
            operation_timeout: None,
        }
    }

    /// Create a controller using the configured deadline
    pub fn from_config(client: Arc<dyn DirectoryClient>, config: &ControllerConfig) -> Self {
        let controller = Self::new(client);
        match config.operation_timeout() {
            Some(limit) => controller.with_operation_timeout(limit),
            None => controller,
        }
    }

    /// Abandon remote calls that take longer than `limit`
    pub fn with_operation_timeout(mut self, limit: Duration) -> Self {
        self.operation_timeout = Some(limit);
        self
    }

    /// Await a remote call under the configured deadline
    ///
    /// Expiry drops the in-flight request. Whether it reached the service is
    /// unknown, so this is always an error and never a guess.
    async fn with_deadline<F: Future>(
        &self,
        operation: &str,
        link: &str,
        call: F,
    ) -> Result<F::Output> {
        match self.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                warn!(
                    "{} of {} abandoned after {:?}; remote state unknown",
                    operation, link, limit
                );
                Error::timeout(operation, link, limit)
            }),
            None => Ok(call.await),
        }
    }
}

#[async_trait]
impl LinkLifecycle for LinkController {
    async fn create(&self, desired: LinkResource) -> Result<LinkResource> {
        desired.validate()?;

        let id = desired.derive_id();
        let destination = ProviderUserIdentifier::from(&desired.destination_user);
        let source = ProviderUserIdentifier::from(&desired.source_user);

        debug!(
            "Linking {}:{} to {} in {}",
            source.provider_name,
            source.provider_attribute_value,
            destination.provider_attribute_value,
            desired.user_pool_id
        );

        self.with_deadline(
            "create",
            &id,
            self.client
                .link_identities(&desired.user_pool_id, &destination, &source),
        )
        .await?
        .map_err(|e| Error::remote("link users", &id, e.to_string()))?;

        info!("Created link {}", id);
        Ok(LinkResource {
            id: Some(id),
            ..desired
        })
    }

    async fn read(&self, current: LinkResource) -> Result<Option<LinkResource>> {
        current.validate_for_probe()?;

        let probe = self
            .with_deadline(
                "read",
                &current.to_string(),
                self.client.probe_user_exists(
                    &current.user_pool_id,
                    &current.destination_user.provider_attribute_value,
                ),
            )
            .await?;

        match probe {
            Ok(()) => {
                debug!("Link {} confirmed by existence probe", current);
                Ok(Some(current))
            }
            Err(e) => {
                // Any probe failure counts as deletion, even when unrelated to the link.
                warn!("Existence probe failed for {}, treating as deleted: {}", current, e);
                Ok(None)
            }
        }
    }

    async fn update(&self, prior: LinkResource, _planned: LinkResource) -> Result<LinkResource> {
        warn!("Rejected in-place update of {}", prior);
        Err(Error::unsupported(UPDATE_UNSUPPORTED))
    }

    async fn delete(&self, current: &LinkResource) -> Result<()> {
        current.validate_for_unlink()?;

        let identity = ProviderUserIdentifier::from(&current.source_user);

        debug!(
            "Unlinking {}:{} in {}",
            identity.provider_name, identity.provider_attribute_value, current.user_pool_id
        );

        self.with_deadline(
            "delete",
            &current.to_string(),
            self.client
                .unlink_identity(&current.user_pool_id, &identity),
        )
        .await?
        .map_err(|e| Error::remote("unlink user", current.to_string(), e.to_string()))?;

        info!("Deleted link {}", current);
        Ok(())
    }

    fn import(&self, id: &str) -> Result<LinkResource> {
        if id.trim().is_empty() {
            return Err(Error::config("import ID cannot be empty"));
        }

        info!("Imported link {}", id);
        Ok(LinkResource::imported(id))
    }
}
