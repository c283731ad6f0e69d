//! Plugin-based client registry
//!
//! The registry maps directory and state store type names to factories, so
//! the binary builds whatever the configuration names without hardcoded
//! if-else chains.
//!
//! ## Registration
//!
//! Client crates expose a `register()` function:
//!
//! ```rust,ignore
//! // In idp-link-cognito
//! pub fn register(registry: &ClientRegistry) {
//!     registry.register_directory("cognito", Box::new(CognitoFactory::default()));
//! }
//! ```
//!
//! The built-in `file` and `memory` state stores are registered by
//! [`ClientRegistry::with_builtin_state_stores`].

use crate::config::{DirectoryConfig, StateStoreConfig};
use crate::error::{Error, Result};
use crate::state::{FileStateStoreFactory, MemoryStateStoreFactory};
use crate::traits::{DirectoryClient, DirectoryClientFactory, StateStore, StateStoreFactory};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Registry of directory client and state store factories
///
/// Uses interior mutability so registration works through a shared
/// reference.
#[derive(Default)]
pub struct ClientRegistry {
    directories: RwLock<HashMap<String, Arc<dyn DirectoryClientFactory>>>,
    state_stores: RwLock<HashMap<String, Arc<dyn StateStoreFactory>>>,
}

impl ClientRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the `file` and `memory` state stores registered
    pub fn with_builtin_state_stores() -> Self {
        let registry = Self::new();
        registry.register_state_store("file", Box::new(FileStateStoreFactory));
        registry.register_state_store("memory", Box::new(MemoryStateStoreFactory));
        registry
    }

    /// Register a directory client factory under a type name
    pub fn register_directory(
        &self,
        name: impl Into<String>,
        factory: Box<dyn DirectoryClientFactory>,
    ) {
        let mut directories = self
            .directories
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        directories.insert(name.into(), Arc::from(factory));
    }

    /// Register a state store factory under a type name
    pub fn register_state_store(
        &self,
        name: impl Into<String>,
        factory: Box<dyn StateStoreFactory>,
    ) {
        let mut stores = self
            .state_stores
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        stores.insert(name.into(), Arc::from(factory));
    }

    /// Create a shared directory client from configuration
    pub async fn create_directory(
        &self,
        config: &DirectoryConfig,
    ) -> Result<Arc<dyn DirectoryClient>> {
        config.validate()?;

        let directory_type = config.type_name();
        let factory = {
            let directories = self
                .directories
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            directories.get(directory_type).cloned().ok_or_else(|| {
                Error::config(format!("Unknown directory type: {}", directory_type))
            })?
        };

        factory.create(config).await
    }

    /// Create a state store from configuration
    pub async fn create_state_store(&self, config: &StateStoreConfig) -> Result<Box<dyn StateStore>> {
        config.validate()?;

        let store_type = config.type_name();
        let factory = {
            let stores = self
                .state_stores
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            stores.get(store_type).cloned().ok_or_else(|| {
                Error::config(format!("Unknown state store type: {}", store_type))
            })?
        };

        // Lock released before the async create
        factory.create(config).await
    }

    /// Check if a directory type is registered
    pub fn has_directory(&self, name: &str) -> bool {
        self.directories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}
