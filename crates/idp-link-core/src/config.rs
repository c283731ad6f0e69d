//! Configuration types for identity provider link management
//!
//! A [`LinkConfig`] document is JSON:
//!
//! ```json
//! {
//!   "directory": { "type": "cognito", "region": "eu-west-1" },
//!   "state_store": { "type": "file", "path": "/var/lib/idp-link/state.json" },
//!   "links": {
//!     "alice_google": {
//!       "user_pool_id": "eu-west-1_AbCdEf",
//!       "destination_user": { "provider_name": "Cognito", "provider_attribute_value": "alice" },
//!       "source_user": {
//!         "provider_name": "Google",
//!         "provider_attribute_name": "Cognito_Subject",
//!         "provider_attribute_value": "1234567890"
//!       }
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::model::LinkResource;

/// Main configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Directory service configuration
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Where resource state is persisted
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// Declared links, keyed by resource name
    #[serde(default)]
    pub links: BTreeMap<String, LinkResource>,

    /// Optional controller settings
    #[serde(default)]
    pub controller: ControllerConfig,
}

impl LinkConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration document
    pub fn from_json(json: &str) -> Result<Self, crate::Error> {
        serde_json::from_str(json)
            .map_err(|e| crate::Error::config(format!("Invalid configuration document: {}", e)))
    }

    /// Load a configuration document from disk
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            crate::Error::config(format!(
                "Failed to read configuration {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    /// Validate the configuration
    ///
    /// Declared links are checked by the reconciler when planning, so that
    /// one broken declaration names itself in the error.
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.directory.validate()?;
        self.state_store.validate()?;

        for name in self.links.keys() {
            if name.trim().is_empty() {
                return Err(crate::Error::config("Link resource names cannot be empty"));
            }
        }

        Ok(())
    }
}

/// Directory service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DirectoryConfig {
    /// AWS Cognito User Pools
    Cognito {
        /// AWS region; falls back to the ambient AWS environment
        #[serde(default)]
        region: Option<String>,
        /// Endpoint override (e.g. a local emulator)
        #[serde(default)]
        endpoint: Option<String>,
        /// Named profile from the shared AWS config files
        #[serde(default)]
        profile: Option<String>,
    },

    /// Custom directory client
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl DirectoryConfig {
    /// Validate the directory configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            DirectoryConfig::Cognito {
                region,
                endpoint,
                profile,
            } => {
                if region.as_ref().is_some_and(|r| r.trim().is_empty()) {
                    return Err(crate::Error::config("Cognito region cannot be empty"));
                }
                if profile.as_ref().is_some_and(|p| p.trim().is_empty()) {
                    return Err(crate::Error::config("AWS profile name cannot be empty"));
                }
                if let Some(endpoint) = endpoint
                    && !endpoint.starts_with("https://")
                    && !endpoint.starts_with("http://")
                {
                    return Err(crate::Error::config(format!(
                        "Cognito endpoint must use HTTP or HTTPS scheme. Got: {}",
                        endpoint
                    )));
                }
                Ok(())
            }
            DirectoryConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom directory factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom directory config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the directory type name used for registry lookup
    pub fn type_name(&self) -> &str {
        match self {
            DirectoryConfig::Cognito { .. } => "cognito",
            DirectoryConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        DirectoryConfig::Cognito {
            region: None,
            endpoint: None,
            profile: None,
        }
    }
}

/// State store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// File-based state store
    File {
        /// Path to the state file
        path: String,
    },

    /// In-memory state store (not persistent)
    #[default]
    Memory,

    /// Custom state store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl StateStoreConfig {
    /// Validate the state store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StateStoreConfig::File { path } if path.trim().is_empty() => {
                Err(crate::Error::config("State file path cannot be empty"))
            }
            StateStoreConfig::Custom { factory, .. } if factory.is_empty() => Err(
                crate::Error::config("Custom state store factory cannot be empty"),
            ),
            _ => Ok(()),
        }
    }

    /// Get the state store type name used for registry lookup
    pub fn type_name(&self) -> &str {
        match self {
            StateStoreConfig::File { .. } => "file",
            StateStoreConfig::Memory => "memory",
            StateStoreConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Controller and host-driver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Deadline for each remote call, in seconds (0 disables it)
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,

    /// Capacity of the reconcile event channel
    ///
    /// When full, new events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl ControllerConfig {
    /// The configured deadline, if any
    pub fn operation_timeout(&self) -> Option<Duration> {
        (self.operation_timeout_secs > 0).then(|| Duration::from_secs(self.operation_timeout_secs))
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            operation_timeout_secs: default_operation_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_operation_timeout_secs() -> u64 {
    60
}

fn default_event_channel_capacity() -> usize {
    100
}
