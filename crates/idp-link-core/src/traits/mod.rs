//! Core traits for identity provider link management
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DirectoryClient`]: Calls into the identity-directory service
//! - [`LinkLifecycle`]: Lifecycle verbs a declarative host drives
//! - [`StateStore`]: Persistent resource state owned by the host

pub mod directory_client;
pub mod lifecycle;
pub mod state_store;

pub use directory_client::{DirectoryClient, DirectoryClientFactory, ProviderUserIdentifier};
pub use lifecycle::LinkLifecycle;
pub use state_store::{StateRecord, StateStore, StateStoreFactory};
