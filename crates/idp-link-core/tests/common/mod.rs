//! Test doubles and common utilities for lifecycle contract tests
//!
//! The recording client captures every directory call so tests can assert
//! exactly which requests a lifecycle operation issued.

#![allow(dead_code)]

use async_trait::async_trait;
use idp_link_core::error::{Error, Result};
use idp_link_core::model::{DestinationUser, LinkResource, SourceUser};
use idp_link_core::traits::{DirectoryClient, ProviderUserIdentifier};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One recorded directory call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    Link {
        user_pool_id: String,
        destination: ProviderUserIdentifier,
        source: ProviderUserIdentifier,
    },
    Probe {
        user_pool_id: String,
        username: String,
    },
    Unlink {
        user_pool_id: String,
        identity: ProviderUserIdentifier,
    },
}

/// How the double fails a call
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    NotFound,
    Throttled,
    AccessDenied,
    Service,
}

impl Failure {
    fn to_error(self) -> Error {
        match self {
            Failure::NotFound => Error::not_found("User does not exist."),
            Failure::Throttled => Error::rate_limited("Rate exceeded"),
            Failure::AccessDenied => Error::auth("not authorized to perform this action"),
            Failure::Service => Error::provider("recording", "service unavailable"),
        }
    }
}

#[derive(Default)]
struct Behaviour {
    link_failure: Option<Failure>,
    probe_failure: Option<Failure>,
    unlink_failure: Option<Failure>,
    /// Destination usernames the probe does not find
    missing_users: HashSet<String>,
    delay: Option<Duration>,
}

/// A DirectoryClient that records calls and fails on request
#[derive(Clone, Default)]
pub struct RecordingDirectoryClient {
    calls: Arc<Mutex<Vec<DirectoryCall>>>,
    behaviour: Arc<Mutex<Behaviour>>,
    link_count: Arc<AtomicUsize>,
    probe_count: Arc<AtomicUsize>,
    unlink_count: Arc<AtomicUsize>,
}

impl RecordingDirectoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_link(&self, failure: Failure) {
        self.behaviour.lock().unwrap().link_failure = Some(failure);
    }

    pub fn fail_probe(&self, failure: Failure) {
        self.behaviour.lock().unwrap().probe_failure = Some(failure);
    }

    pub fn fail_unlink(&self, failure: Failure) {
        self.behaviour.lock().unwrap().unlink_failure = Some(failure);
    }

    /// Make the probe report `username` as unknown
    pub fn remove_user(&self, username: &str) {
        self.behaviour
            .lock()
            .unwrap()
            .missing_users
            .insert(username.to_string());
    }

    /// Delay every call before answering
    pub fn set_delay(&self, delay: Duration) {
        self.behaviour.lock().unwrap().delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.link_count() + self.probe_count() + self.unlink_count()
    }

    pub fn link_count(&self) -> usize {
        self.link_count.load(Ordering::SeqCst)
    }

    pub fn probe_count(&self) -> usize {
        self.probe_count.load(Ordering::SeqCst)
    }

    pub fn unlink_count(&self) -> usize {
        self.unlink_count.load(Ordering::SeqCst)
    }

    async fn answer(&self, call: DirectoryCall, failure: Option<Failure>) -> Result<()> {
        let delay = self.behaviour.lock().unwrap().delay;
        self.calls.lock().unwrap().push(call);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DirectoryClient for RecordingDirectoryClient {
    async fn link_identities(
        &self,
        user_pool_id: &str,
        destination: &ProviderUserIdentifier,
        source: &ProviderUserIdentifier,
    ) -> Result<()> {
        self.link_count.fetch_add(1, Ordering::SeqCst);
        let failure = self.behaviour.lock().unwrap().link_failure;
        self.answer(
            DirectoryCall::Link {
                user_pool_id: user_pool_id.to_string(),
                destination: destination.clone(),
                source: source.clone(),
            },
            failure,
        )
        .await
    }

    async fn probe_user_exists(&self, user_pool_id: &str, username: &str) -> Result<()> {
        self.probe_count.fetch_add(1, Ordering::SeqCst);
        let failure = {
            let behaviour = self.behaviour.lock().unwrap();
            if behaviour.missing_users.contains(username) {
                Some(Failure::NotFound)
            } else {
                behaviour.probe_failure
            }
        };
        self.answer(
            DirectoryCall::Probe {
                user_pool_id: user_pool_id.to_string(),
                username: username.to_string(),
            },
            failure,
        )
        .await
    }

    async fn unlink_identity(
        &self,
        user_pool_id: &str,
        identity: &ProviderUserIdentifier,
    ) -> Result<()> {
        self.unlink_count.fetch_add(1, Ordering::SeqCst);
        let failure = self.behaviour.lock().unwrap().unlink_failure;
        self.answer(
            DirectoryCall::Unlink {
                user_pool_id: user_pool_id.to_string(),
                identity: identity.clone(),
            },
            failure,
        )
        .await
    }

    fn directory_name(&self) -> &'static str {
        "recording"
    }
}

/// The link used throughout the contract tests
pub fn sample_link() -> LinkResource {
    LinkResource::new(
        "pool-1",
        DestinationUser::new("Corp", "dest-42"),
        SourceUser::new("OIDC", "sub", "src-99"),
    )
}

/// A link for another destination/source pair in the same pool
pub fn link_for(destination: &str, source: &str) -> LinkResource {
    LinkResource::new(
        "pool-1",
        DestinationUser::new("Corp", destination),
        SourceUser::new("OIDC", "sub", source),
    )
}
