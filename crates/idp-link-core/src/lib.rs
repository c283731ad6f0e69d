// # idp-link-core
//
// Core library for managing identity provider links in a user directory.
//
// ## Architecture Overview
//
// A link records that a federated source identity and a destination user
// are the same person. Links are declared, created once, probed for
// existence and deleted; they are never modified in place.
//
// - **DirectoryClient**: Trait for the three directory calls (link, probe, unlink)
// - **LinkLifecycle**: Trait for the create/read/update/delete/import contract
// - **LinkController**: Lifecycle implementation over a shared DirectoryClient
// - **StateStore**: Trait for persisting managed links between runs
// - **Reconciler**: Host driver that refreshes, plans and applies declared links
// - **ClientRegistry**: Plugin-based registry for directory clients and state stores
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Lifecycle logic is separate from the directory wire protocol
// 2. **Plugin-Based**: Directory clients are registered dynamically, no hard-coded if-else
// 3. **Library-First**: All core functionality can be used as a library
// 4. **State After Success**: State changes only when the directory call succeeded

pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod plan;
pub mod reconciler;
pub mod registry;
pub mod schema;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{ControllerConfig, DirectoryConfig, LinkConfig, StateStoreConfig};
pub use controller::LinkController;
pub use error::{Error, Result};
pub use model::{DestinationUser, LinkResource, SourceUser};
pub use plan::PlannedAction;
pub use reconciler::{ApplySummary, PlannedChange, ReconcileEvent, Reconciler};
pub use registry::ClientRegistry;
pub use schema::{ProviderMetadata, ResourceSchema};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{DirectoryClient, LinkLifecycle, ProviderUserIdentifier, StateStore};
