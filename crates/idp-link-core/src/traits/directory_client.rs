// # Directory Client Trait
//
// Defines the interface to the identity-directory service (Cognito User Pools).
//
// ## Implementations
//
// - Cognito User Pools via the AWS SDK: `idp-link-cognito` crate
// - Tests: call-recording doubles in `tests/common`
//
// ## Usage
//
// ```rust,ignore
// use idp_link_core::traits::{DirectoryClient, ProviderUserIdentifier};
//
// #[tokio::main]
// async fn main() -> idp_link_core::Result<()> {
//     let client = /* DirectoryClient implementation */;
//
//     client.link_identities(
//         "eu-west-1_abc",
//         &ProviderUserIdentifier::username("Cognito", "alice"),
//         &ProviderUserIdentifier::federated("Google", "Cognito_Subject", "1234"),
//     ).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::model::{DestinationUser, SourceUser};

/// A user identity as the directory API addresses it
///
/// Destination identities are matched by username and carry no attribute
/// name; federated identities always do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUserIdentifier {
    /// Identity provider name
    pub provider_name: String,
    /// Attribute used for the match, if any
    pub provider_attribute_name: Option<String>,
    /// Attribute value (or username)
    pub provider_attribute_value: String,
}

impl ProviderUserIdentifier {
    /// An identity matched by username
    pub fn username(provider_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            provider_attribute_name: None,
            provider_attribute_value: value.into(),
        }
    }

    /// A federated identity matched by attribute
    pub fn federated(
        provider_name: impl Into<String>,
        attribute_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            provider_name: provider_name.into(),
            provider_attribute_name: Some(attribute_name.into()),
            provider_attribute_value: value.into(),
        }
    }
}

impl From<&DestinationUser> for ProviderUserIdentifier {
    fn from(user: &DestinationUser) -> Self {
        Self::username(&user.provider_name, &user.provider_attribute_value)
    }
}

impl From<&SourceUser> for ProviderUserIdentifier {
    fn from(user: &SourceUser) -> Self {
        Self::federated(
            &user.provider_name,
            &user.provider_attribute_name,
            &user.provider_attribute_value,
        )
    }
}

/// Trait for identity-directory clients
///
/// # Thread Safety
///
/// One already-authenticated client is shared by every lifecycle operation,
/// possibly concurrently. Implementations must be `Send + Sync` and must not
/// require external locking.
///
/// # Single-shot
///
/// Each method performs exactly one API call. Retries, backoff and caching
/// are not the client's business; an error is returned as soon as the
/// service rejects a call.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Link a federated `source` identity to an existing `destination` user
    ///
    /// Maps to `AdminLinkProviderForUser`.
    async fn link_identities(
        &self,
        user_pool_id: &str,
        destination: &ProviderUserIdentifier,
        source: &ProviderUserIdentifier,
    ) -> Result<(), crate::Error>;

    /// Succeed if `username` can be looked up in the pool
    ///
    /// Maps to `AdminListGroupsForUser`; the group list itself is discarded.
    async fn probe_user_exists(&self, user_pool_id: &str, username: &str)
    -> Result<(), crate::Error>;

    /// Detach a federated identity from whatever user it is linked to
    ///
    /// Maps to `AdminDisableProviderForUser`.
    async fn unlink_identity(
        &self,
        user_pool_id: &str,
        identity: &ProviderUserIdentifier,
    ) -> Result<(), crate::Error>;

    /// Client name for logging (e.g. "cognito")
    fn directory_name(&self) -> &'static str;
}

/// Helper trait for constructing directory clients from configuration
///
/// Creation is async so factories can resolve ambient credentials and
/// region before the first call.
#[async_trait]
pub trait DirectoryClientFactory: Send + Sync {
    /// Create a shared client from its configuration
    async fn create(
        &self,
        config: &crate::config::DirectoryConfig,
    ) -> Result<Arc<dyn DirectoryClient>, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_has_no_attribute_name() {
        let id = ProviderUserIdentifier::from(&DestinationUser::new("Corp", "dest-42"));
        assert_eq!(id.provider_name, "Corp");
        assert_eq!(id.provider_attribute_name, None);
        assert_eq!(id.provider_attribute_value, "dest-42");
    }

    #[test]
    fn test_source_keeps_attribute_name() {
        let id = ProviderUserIdentifier::from(&SourceUser::new("OIDC", "sub", "src-99"));
        assert_eq!(id, ProviderUserIdentifier::federated("OIDC", "sub", "src-99"));
    }
}
