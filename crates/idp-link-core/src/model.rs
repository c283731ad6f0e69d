//! Resource model for a declared identity provider link
//!
//! A [`LinkResource`] binds a federated *source* identity to an existing
//! *destination* identity inside one user pool. Every input attribute is
//! immutable; a change to any of them is a different resource.
//!
//! Fields are plain strings. Presence is checked explicitly by
//! [`LinkResource::validate`] and friends rather than by wrapper types, so a
//! partially decoded or imported resource can still be represented.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Separator used in the composite resource ID
pub const ID_SEPARATOR: char = ':';

/// The existing directory identity the source is linked to
///
/// Matched by its internal username, so no attribute name is needed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationUser {
    /// Provider name (e.g. "Cognito" for native users)
    #[serde(default)]
    pub provider_name: String,

    /// Username of the destination user
    #[serde(default)]
    pub provider_attribute_value: String,
}

impl DestinationUser {
    /// Create a destination identity
    pub fn new(provider_name: impl Into<String>, provider_attribute_value: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            provider_attribute_value: provider_attribute_value.into(),
        }
    }
}

/// The federated identity being linked
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUser {
    /// Identity provider name as registered in the pool
    #[serde(default)]
    pub provider_name: String,

    /// Attribute of the federated identity used for the match (e.g. "Cognito_Subject")
    #[serde(default)]
    pub provider_attribute_name: String,

    /// Value of that attribute
    #[serde(default)]
    pub provider_attribute_value: String,
}

impl SourceUser {
    /// Create a source identity
    pub fn new(
        provider_name: impl Into<String>,
        provider_attribute_name: impl Into<String>,
        provider_attribute_value: impl Into<String>,
    ) -> Self {
        Self {
            provider_name: provider_name.into(),
            provider_attribute_name: provider_attribute_name.into(),
            provider_attribute_value: provider_attribute_value.into(),
        }
    }
}

/// One declared link between a source and a destination identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkResource {
    /// Target user pool
    #[serde(default)]
    pub user_pool_id: String,

    /// Existing directory identity
    #[serde(default)]
    pub destination_user: DestinationUser,

    /// Federated identity being linked
    #[serde(default)]
    pub source_user: SourceUser,

    /// Composite ID, set by create or import
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl LinkResource {
    /// Create a resource from its inputs; `id` stays unset until created
    pub fn new(
        user_pool_id: impl Into<String>,
        destination_user: DestinationUser,
        source_user: SourceUser,
    ) -> Self {
        Self {
            user_pool_id: user_pool_id.into(),
            destination_user,
            source_user,
            id: None,
        }
    }

    /// A resource known only by an externally supplied ID
    pub fn imported(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Derive the composite ID `pool:destination-value:source-value`
    pub fn derive_id(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.user_pool_id,
            self.destination_user.provider_attribute_value,
            self.source_user.provider_attribute_value,
            sep = ID_SEPARATOR,
        )
    }

    /// Whether any input attribute is set
    ///
    /// Imported resources carry only an ID until the host fills them in.
    pub fn has_inputs(&self) -> bool {
        !(self.user_pool_id.is_empty()
            && self.destination_user == DestinationUser::default()
            && self.source_user == SourceUser::default())
    }

    /// Check that every required input is present
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        collect_missing(&mut missing, "user_pool_id", &self.user_pool_id);
        collect_missing(
            &mut missing,
            "destination_user.provider_name",
            &self.destination_user.provider_name,
        );
        collect_missing(
            &mut missing,
            "destination_user.provider_attribute_value",
            &self.destination_user.provider_attribute_value,
        );
        self.collect_missing_source(&mut missing);
        into_result(missing)
    }

    /// Check the fields the existence probe needs
    pub fn validate_for_probe(&self) -> Result<()> {
        let mut missing = Vec::new();
        collect_missing(&mut missing, "user_pool_id", &self.user_pool_id);
        collect_missing(
            &mut missing,
            "destination_user.provider_attribute_value",
            &self.destination_user.provider_attribute_value,
        );
        into_result(missing)
    }

    /// Check the fields unlinking needs
    pub fn validate_for_unlink(&self) -> Result<()> {
        let mut missing = Vec::new();
        collect_missing(&mut missing, "user_pool_id", &self.user_pool_id);
        self.collect_missing_source(&mut missing);
        into_result(missing)
    }

    fn collect_missing_source(&self, missing: &mut Vec<&'static str>) {
        collect_missing(
            missing,
            "source_user.provider_name",
            &self.source_user.provider_name,
        );
        collect_missing(
            missing,
            "source_user.provider_attribute_name",
            &self.source_user.provider_attribute_name,
        );
        collect_missing(
            missing,
            "source_user.provider_attribute_value",
            &self.source_user.provider_attribute_value,
        );
    }
}

impl fmt::Display for LinkResource {
    /// Identifies the link in logs and errors; prefers the stored ID
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => f.write_str(id),
            None => f.write_str(&self.derive_id()),
        }
    }
}

fn collect_missing(missing: &mut Vec<&'static str>, name: &'static str, value: &str) {
    if value.trim().is_empty() {
        missing.push(name);
    }
}

fn into_result(missing: Vec<&'static str>) -> Result<()> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::config(format!(
            "missing required attribute(s): {}",
            missing.join(", ")
        )))
    }
}
