//! Host-side reconciliation of declared links against persisted state
//!
//! The Reconciler plays the part of a declarative host framework:
//! - Refreshes persisted state through the controller's existence probe
//! - Plans create/replace/delete per resource name
//! - Applies the plan, persisting only what succeeded
//! - Destroys and imports on request
//!
//! ## Architecture
//!
//! ```text
//!  declared links ──┐
//!                   ▼
//!            ┌──────────────┐   create/read/delete   ┌───────────────┐
//!            │  Reconciler  │ ─────────────────────▶ │ LinkLifecycle │ ──▶ directory
//!            └──────────────┘                        └───────────────┘
//!              │          │
//!              ▼          ▼
//!      ┌────────────┐  ┌──────────┐
//!      │ StateStore │  │  Events  │
//!      └────────────┘  └──────────┘
//! ```
//!
//! ## State rules
//!
//! - State is written only after the controller reports success
//! - A failed delete leaves the resource in state
//! - A failed existence probe drops the resource from state; this is the
//!   only place state changes without a successful remote call
//! - One failing resource does not stop the others; failures are collected
//!   in the [`ApplySummary`]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::ControllerConfig;
use crate::error::{Error, Result};
use crate::model::LinkResource;
use crate::plan::{PlannedAction, plan_change};
use crate::traits::{LinkLifecycle, StateStore};

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// Existence probe confirmed the link
    Confirmed { name: String, id: String },

    /// Existence probe failed; the link was dropped from state
    Dropped { name: String, id: String },

    /// Link created and persisted
    Created { name: String, id: String },

    /// Link deleted and removed from state
    Deleted { name: String, id: String },

    /// Imported ID recorded in state
    Imported { name: String, id: String },

    /// Imported entry filled in from its declaration
    Adopted { name: String, id: String },

    /// A lifecycle operation failed; state left as it was
    Failed {
        name: String,
        operation: String,
        error: String,
    },
}

/// One planned change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedChange {
    /// Resource name
    pub name: String,
    #[serde(flatten)]
    pub action: PlannedAction,
}

/// A resource whose operation failed during apply or destroy
#[derive(Debug)]
pub struct ResourceFailure {
    pub name: String,
    pub error: Error,
}

/// Outcome of an apply or destroy run
#[derive(Debug, Default)]
pub struct ApplySummary {
    pub created: Vec<String>,
    pub replaced: Vec<String>,
    pub deleted: Vec<String>,
    pub adopted: Vec<String>,
    pub unchanged: Vec<String>,
    /// Dropped from state because the existence probe failed
    pub dropped: Vec<String>,
    pub failed: Vec<ResourceFailure>,
}

impl ApplySummary {
    /// Whether every resource converged
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn fail(&mut self, name: &str, error: Error) {
        self.failed.push(ResourceFailure {
            name: name.to_string(),
            error,
        });
    }
}

/// Declarative host driver for link resources
pub struct Reconciler {
    lifecycle: Arc<dyn LinkLifecycle>,
    state_store: Box<dyn StateStore>,
    event_tx: mpsc::Sender<ReconcileEvent>,
}

impl Reconciler {
    /// Create a reconciler
    ///
    /// Returns the reconciler and a receiver for its events.
    pub fn new(
        lifecycle: Arc<dyn LinkLifecycle>,
        state_store: Box<dyn StateStore>,
        config: &ControllerConfig,
    ) -> (Self, mpsc::Receiver<ReconcileEvent>) {
        let (tx, rx) = mpsc::channel(config.event_channel_capacity.max(1));

        let reconciler = Self {
            lifecycle,
            state_store,
            event_tx: tx,
        };

        (reconciler, rx)
    }

    /// Read every managed link and drop the ones the probe no longer finds
    ///
    /// Confirmed links are re-stamped with the current time. Imported entries without inputs are skipped until a declaration
    /// adopts them. Returns the names that were dropped. The first read
    /// error (timeout, malformed state) aborts the refresh.
    pub async fn refresh(&self) -> Result<Vec<String>> {
        let mut dropped = Vec::new();

        for name in self.state_store.list_records().await? {
            let Some(record) = self.state_store.get_record(&name).await? else {
                continue;
            };
            let last_confirmed = record.last_refreshed;
            let prior = record.resource;

            if !prior.has_inputs() {
                debug!("Skipping refresh of imported link {} until it is adopted", name);
                continue;
            }

            let id = prior.to_string();
            match self
                .lifecycle
                .read(prior)
                .await
                .map_err(|e| for_resource(&name, e))?
            {
                Some(current) => {
                    self.state_store.set_resource(&name, &current).await?;
                    self.emit_event(ReconcileEvent::Confirmed { name, id });
                }
                None => {
                    warn!(
                        "Link {} ({}) no longer found, removing from state (last confirmed {})",
                        name,
                        id,
                        last_confirmed.to_rfc3339()
                    );
                    self.state_store.delete_record(&name).await?;
                    self.emit_event(ReconcileEvent::Dropped {
                        name: name.clone(),
                        id,
                    });
                    dropped.push(name);
                }
            }
        }

        self.state_store.flush().await?;
        Ok(dropped)
    }

    /// Plan changes against current state without touching the directory
    ///
    /// Every declared link is validated first; one invalid declaration
    /// aborts the plan before anything else happens.
    pub async fn plan(
        &self,
        declared: &BTreeMap<String, LinkResource>,
    ) -> Result<Vec<PlannedChange>> {
        for (name, link) in declared {
            link.validate().map_err(|e| for_resource(name, e))?;
        }

        let mut names: BTreeSet<String> = declared.keys().cloned().collect();
        names.extend(self.state_store.list_records().await?);

        let mut changes = Vec::with_capacity(names.len());
        for name in names {
            let prior = self.state_store.get_resource(&name).await?;
            let action = plan_change(prior.as_ref(), declared.get(&name))
                .map_err(|e| for_resource(&name, e))?;
            changes.push(PlannedChange { name, action });
        }

        Ok(changes)
    }

    /// Refresh, plan and execute
    ///
    /// Refresh and plan errors abort before any change. After that each
    /// resource is handled independently.
    pub async fn apply(&self, declared: &BTreeMap<String, LinkResource>) -> Result<ApplySummary> {
        let mut summary = ApplySummary {
            dropped: self.refresh().await?,
            ..ApplySummary::default()
        };

        let changes = self.plan(declared).await?;
        info!(
            "Applying {} change(s) across {} resource(s)",
            changes.iter().filter(|c| c.action.is_change()).count(),
            changes.len()
        );

        for change in changes {
            let name = change.name.as_str();
            let prior = self.state_store.get_resource(name).await?;
            let desired = declared.get(name);

            match (change.action, prior, desired) {
                (PlannedAction::NoOp, _, _) => summary.unchanged.push(change.name),
                (PlannedAction::Create, _, Some(desired)) => {
                    if self.create(name, desired.clone(), &mut summary).await {
                        summary.created.push(change.name);
                    }
                }
                (PlannedAction::Adopt, Some(prior), Some(desired)) => {
                    self.adopt(name, prior, desired, &mut summary).await?;
                }
                (PlannedAction::Replace { changed }, Some(prior), Some(desired)) => {
                    info!("Replacing {} (changed: {})", name, changed.join(", "));
                    if self.delete(name, &prior, &mut summary).await?
                        && self.create(name, desired.clone(), &mut summary).await
                    {
                        summary.replaced.push(change.name);
                    }
                }
                (PlannedAction::Delete, Some(prior), _) => {
                    if self.delete(name, &prior, &mut summary).await? {
                        summary.deleted.push(change.name);
                    }
                }
                (action, _, _) => {
                    // State changed underneath the plan.
                    summary.fail(
                        name,
                        Error::Other(format!("state changed while applying {:?}", action)),
                    );
                }
            }
        }

        self.state_store.flush().await?;
        Ok(summary)
    }

    /// Delete every managed link
    pub async fn destroy(&self) -> Result<ApplySummary> {
        let mut summary = ApplySummary::default();

        for name in self.state_store.list_records().await? {
            let Some(prior) = self.state_store.get_resource(&name).await? else {
                continue;
            };
            if self.delete(&name, &prior, &mut summary).await? {
                summary.deleted.push(name);
            }
        }

        self.state_store.flush().await?;
        Ok(summary)
    }

    /// Record an existing link under `name` by its opaque ID
    pub async fn import(&self, name: &str, id: &str) -> Result<LinkResource> {
        if name.trim().is_empty() {
            return Err(Error::config("resource name cannot be empty"));
        }
        if self.state_store.get_resource(name).await?.is_some() {
            return Err(Error::config(format!(
                "{} is already managed; remove it from state before importing",
                name
            )));
        }

        let imported = self.lifecycle.import(id)?;
        self.state_store.set_resource(name, &imported).await?;
        self.state_store.flush().await?;

        self.emit_event(ReconcileEvent::Imported {
            name: name.to_string(),
            id: id.to_string(),
        });
        Ok(imported)
    }

    /// Create and persist; returns whether it succeeded
    async fn create(&self, name: &str, desired: LinkResource, summary: &mut ApplySummary) -> bool {
        match self.lifecycle.create(desired).await {
            Ok(created) => {
                let id = created.to_string();
                if let Err(e) = self.state_store.set_resource(name, &created).await {
                    // The link exists remotely but is not tracked; import it to recover.
                    error!("Created {} ({}) but failed to persist state: {}", name, id, e);
                    summary.fail(name, e);
                    return false;
                }
                self.emit_event(ReconcileEvent::Created {
                    name: name.to_string(),
                    id,
                });
                true
            }
            Err(e) => {
                self.record_failure(name, "create", e, summary);
                false
            }
        }
    }

    /// Delete and forget; returns whether it succeeded
    ///
    /// State store errors after a successful delete are returned as errors
    /// because the persisted state no longer reflects reality.
    async fn delete(
        &self,
        name: &str,
        prior: &LinkResource,
        summary: &mut ApplySummary,
    ) -> Result<bool> {
        match self.lifecycle.delete(prior).await {
            Ok(()) => {
                self.state_store.delete_record(name).await?;
                self.emit_event(ReconcileEvent::Deleted {
                    name: name.to_string(),
                    id: prior.to_string(),
                });
                Ok(true)
            }
            Err(e) => {
                self.record_failure(name, "delete", e, summary);
                Ok(false)
            }
        }
    }

    /// Fill an imported entry from its declaration and confirm it
    async fn adopt(
        &self,
        name: &str,
        prior: LinkResource,
        desired: &LinkResource,
        summary: &mut ApplySummary,
    ) -> Result<()> {
        let candidate = LinkResource {
            id: prior.id,
            ..desired.clone()
        };

        match self.lifecycle.read(candidate).await {
            Ok(Some(current)) => {
                self.state_store.set_resource(name, &current).await?;
                self.emit_event(ReconcileEvent::Adopted {
                    name: name.to_string(),
                    id: current.to_string(),
                });
                summary.adopted.push(name.to_string());
            }
            Ok(None) => {
                warn!("Imported link {} not found, creating it", name);
                self.state_store.delete_record(name).await?;
                self.emit_event(ReconcileEvent::Dropped {
                    name: name.to_string(),
                    id: desired.derive_id(),
                });
                summary.dropped.push(name.to_string());
                if self.create(name, desired.clone(), summary).await {
                    summary.created.push(name.to_string());
                }
            }
            Err(e) => self.record_failure(name, "read", e, summary),
        }

        Ok(())
    }

    fn record_failure(&self, name: &str, operation: &str, e: Error, summary: &mut ApplySummary) {
        error!("Failed to {} {}: {}", operation, name, e);
        self.emit_event(ReconcileEvent::Failed {
            name: name.to_string(),
            operation: operation.to_string(),
            error: e.to_string(),
        });
        summary.fail(name, e);
    }

    fn emit_event(&self, event: ReconcileEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

/// Prefix configuration errors with the resource name they belong to
fn for_resource(name: &str, err: Error) -> Error {
    match err {
        Error::Config(msg) => Error::config(format!("{}: {}", name, msg)),
        other => other,
    }
}
