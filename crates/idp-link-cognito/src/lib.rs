// # Cognito Directory Client
//
// This crate provides the AWS Cognito User Pools implementation of
// `DirectoryClient` for identity provider links.
//
// ## Behaviour
//
// - One SDK call per trait call
// - SDK retries disabled; errors propagated as-is
// - Operation timeout of 30 seconds
// - Credentials never logged
//
// ## Credentials and region
//
// Resolved by the standard AWS default chain (`aws-config`): environment
// variables, shared config and credentials files, named profiles, SSO, web
// identity, ECS and IMDS. `directory.region`, `directory.endpoint` and
// `directory.profile` override the ambient values.
//
// Operations used:
// - `AdminLinkProviderForUser`: link a federated identity to a user
// - `AdminListGroupsForUser`: existence probe on a username
// - `AdminDisableProviderForUser`: unlink a federated identity

use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_cognitoidentityprovider::Client;
use aws_sdk_cognitoidentityprovider::config::http::HttpResponse;
use aws_sdk_cognitoidentityprovider::config::retry::RetryConfig;
use aws_sdk_cognitoidentityprovider::config::timeout::TimeoutConfig;
use aws_sdk_cognitoidentityprovider::config::{Builder as ServiceConfigBuilder, Region};
use aws_sdk_cognitoidentityprovider::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cognitoidentityprovider::types::ProviderUserIdentifierType;
use idp_link_core::config::DirectoryConfig;
use idp_link_core::traits::{DirectoryClient, DirectoryClientFactory, ProviderUserIdentifier};
use idp_link_core::{ClientRegistry, Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Default timeout for one API operation (30 seconds)
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

fn identifier(identity: &ProviderUserIdentifier) -> ProviderUserIdentifierType {
    ProviderUserIdentifierType::builder()
        .provider_name(&identity.provider_name)
        .set_provider_attribute_name(identity.provider_attribute_name.clone())
        .provider_attribute_value(&identity.provider_attribute_value)
        .build()
}

/// Cognito User Pools directory client
///
/// The SDK client is cheap to clone and safe to share; one instance serves
/// every lifecycle operation.
#[derive(Clone)]
pub struct CognitoDirectoryClient {
    client: Client,
    region: Option<String>,
}

// The SDK config holds the credentials provider; only the region is shown
impl std::fmt::Debug for CognitoDirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CognitoDirectoryClient")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl CognitoDirectoryClient {
    /// Wrap an already configured SDK client
    pub fn new(client: Client) -> Self {
        let region = client.config().region().map(ToString::to_string);
        Self { client, region }
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

#[async_trait]
impl DirectoryClient for CognitoDirectoryClient {
    async fn link_identities(
        &self,
        user_pool_id: &str,
        destination: &ProviderUserIdentifier,
        source: &ProviderUserIdentifier,
    ) -> Result<()> {
        tracing::debug!("Calling Cognito AdminLinkProviderForUser on {}", user_pool_id);
        self.client
            .admin_link_provider_for_user()
            .user_pool_id(user_pool_id)
            .destination_user(identifier(destination))
            .source_user(identifier(source))
            .send()
            .await
            .map_err(|e| map_sdk_error("AdminLinkProviderForUser", e))?;
        Ok(())
    }

    async fn probe_user_exists(&self, user_pool_id: &str, username: &str) -> Result<()> {
        tracing::debug!("Calling Cognito AdminListGroupsForUser on {}", user_pool_id);
        // Group membership is irrelevant; only the success matters.
        self.client
            .admin_list_groups_for_user()
            .user_pool_id(user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(|e| map_sdk_error("AdminListGroupsForUser", e))?;
        Ok(())
    }

    async fn unlink_identity(
        &self,
        user_pool_id: &str,
        identity: &ProviderUserIdentifier,
    ) -> Result<()> {
        tracing::debug!("Calling Cognito AdminDisableProviderForUser on {}", user_pool_id);
        self.client
            .admin_disable_provider_for_user()
            .user_pool_id(user_pool_id)
            .user(identifier(identity))
            .send()
            .await
            .map_err(|e| map_sdk_error("AdminDisableProviderForUser", e))?;
        Ok(())
    }

    fn directory_name(&self) -> &'static str {
        "cognito"
    }
}

/// Map an SDK failure to an error
///
/// Failures that never produced a response (dispatch, timeout, credential
/// resolution) are transport errors; everything else is classified by its
/// error code and HTTP status.
fn map_sdk_error<E>(operation: &str, err: SdkError<E, HttpResponse>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|response| response.status().as_u16());
    let code = err.code().map(str::to_string);
    let message = err.message().map(str::to_string);

    let mapped = match (status, code) {
        (None, None) => Error::http(format!(
            "Cognito {} failed: {}",
            operation,
            DisplayErrorContext(&err)
        )),
        (status, code) => classify_error(
            status,
            code.as_deref(),
            message.as_deref().unwrap_or("no error message"),
        ),
    };
    tracing::debug!("Cognito {} failed: {}", operation, mapped);
    mapped
}

/// Classify a Cognito error response by error code and HTTP status
pub fn classify_error(status: Option<u16>, code: Option<&str>, message: &str) -> Error {
    let message = message.to_string();

    match (status.unwrap_or_default(), code.unwrap_or("")) {
        (_, "NotAuthorizedException") | (401 | 403, _) => Error::auth(message),
        (_, "TooManyRequestsException") | (429, _) => Error::rate_limited(message),
        (_, "UserNotFoundException" | "ResourceNotFoundException") => Error::not_found(message),
        (status @ 500..=599, _) => Error::provider(
            "cognito",
            format!("Cognito server error (transient): {} - {}", status, message),
        ),
        (_, "InternalErrorException") => Error::provider(
            "cognito",
            format!("Cognito server error (transient): {}", message),
        ),
        (status, "") => Error::provider("cognito", format!("{} - {}", status, message)),
        (_, code) => Error::provider("cognito", format!("{}: {}", code, message)),
    }
}

/// Apply the directory overrides and the single-shot call policy
fn service_config(
    base: &SdkConfig,
    region: Option<&str>,
    endpoint: Option<&str>,
) -> aws_sdk_cognitoidentityprovider::Config {
    let mut builder = ServiceConfigBuilder::from(base)
        .retry_config(RetryConfig::disabled())
        .timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(DEFAULT_OPERATION_TIMEOUT)
                .build(),
        );
    if let Some(region) = region {
        builder = builder.region(Region::new(region.to_string()));
    }
    if let Some(endpoint) = endpoint {
        builder = builder.endpoint_url(endpoint);
    }
    builder.build()
}

/// Load the ambient AWS configuration
async fn load_sdk_config(region: Option<&str>, profile: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    if let Some(profile) = profile {
        loader = loader.profile_name(profile);
    }
    loader.load().await
}

/// Factory for creating Cognito clients
///
/// Without a base configuration, the AWS default chain is loaded when a
/// client is created.
#[derive(Debug, Default)]
pub struct CognitoFactory {
    base: Option<SdkConfig>,
}

impl CognitoFactory {
    /// Start from a loaded SDK configuration instead of the default chain
    pub fn with_sdk_config(base: SdkConfig) -> Self {
        Self { base: Some(base) }
    }
}

#[async_trait]
impl DirectoryClientFactory for CognitoFactory {
    async fn create(&self, config: &DirectoryConfig) -> Result<Arc<dyn DirectoryClient>> {
        let DirectoryConfig::Cognito {
            region,
            endpoint,
            profile,
        } = config
        else {
            return Err(Error::config("Invalid config for Cognito directory"));
        };

        let base = match &self.base {
            Some(base) => base.clone(),
            None => load_sdk_config(region.as_deref(), profile.as_deref()).await,
        };
        let service_config = service_config(&base, region.as_deref(), endpoint.as_deref());

        let Some(resolved) = service_config.region().map(ToString::to_string) else {
            return Err(Error::config(
                "Cognito region not configured; set directory.region, AWS_REGION or a profile region",
            ));
        };

        match endpoint {
            Some(endpoint) => {
                tracing::info!("Using Cognito directory in {} at {}", resolved, endpoint)
            }
            None => tracing::info!("Using Cognito directory in {}", resolved),
        }

        Ok(Arc::new(CognitoDirectoryClient::new(Client::from_conf(
            service_config,
        ))))
    }
}

/// Register the Cognito directory with a registry
///
/// # Example
///
/// ```rust
/// use idp_link_core::ClientRegistry;
///
/// let registry = ClientRegistry::new();
/// idp_link_cognito::register(&registry);
/// assert!(registry.has_directory("cognito"));
/// ```
pub fn register(registry: &ClientRegistry) {
    registry.register_directory("cognito", Box::new(CognitoFactory::default()));
}
