//! Plan semantics for link resources
//!
//! Links are immutable. Comparing persisted state with the declaration
//! yields create, delete, replace or nothing; never an in-place update.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::LinkResource;

/// What the host must do to converge one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlannedAction {
    /// Declared but not in state
    Create,
    /// State matches the declaration
    NoOp,
    /// Imported by ID; the declaration supplies the remaining fields
    Adopt,
    /// Declared inputs differ from state: delete, then create
    Replace {
        /// Dotted paths of the attributes that changed
        changed: Vec<&'static str>,
    },
    /// In state but no longer declared
    Delete,
}

impl PlannedAction {
    /// Whether executing this action issues remote calls
    pub fn is_change(&self) -> bool {
        !matches!(self, PlannedAction::NoOp | PlannedAction::Adopt)
    }
}

type Accessor = fn(&LinkResource) -> &str;

fn user_pool_id(r: &LinkResource) -> &str {
    &r.user_pool_id
}

fn destination_provider_name(r: &LinkResource) -> &str {
    &r.destination_user.provider_name
}

fn destination_attribute_value(r: &LinkResource) -> &str {
    &r.destination_user.provider_attribute_value
}

fn source_provider_name(r: &LinkResource) -> &str {
    &r.source_user.provider_name
}

fn source_attribute_name(r: &LinkResource) -> &str {
    &r.source_user.provider_attribute_name
}

fn source_attribute_value(r: &LinkResource) -> &str {
    &r.source_user.provider_attribute_value
}

const REPLACEMENT_ATTRIBUTES: [(&str, Accessor); 6] = [
    ("user_pool_id", user_pool_id),
    ("destination_user.provider_name", destination_provider_name),
    ("destination_user.provider_attribute_value", destination_attribute_value),
    ("source_user.provider_name", source_provider_name),
    ("source_user.provider_attribute_name", source_attribute_name),
    ("source_user.provider_attribute_value", source_attribute_value),
];

/// Attributes whose values differ between two resources
pub fn changed_attributes(prior: &LinkResource, desired: &LinkResource) -> Vec<&'static str> {
    REPLACEMENT_ATTRIBUTES
        .iter()
        .filter(|(_, get)| get(prior) != get(desired))
        .map(|(name, _)| *name)
        .collect()
}

/// Plan the change for one resource name
///
/// `prior` is the persisted state, `desired` the declaration. An imported
/// entry can only be adopted by a declaration whose derived ID equals the
/// imported one; anything else is a configuration error.
pub fn plan_change(
    prior: Option<&LinkResource>,
    desired: Option<&LinkResource>,
) -> Result<PlannedAction> {
    match (prior, desired) {
        (None, None) => Ok(PlannedAction::NoOp),
        (None, Some(_)) => Ok(PlannedAction::Create),
        (Some(_), None) => Ok(PlannedAction::Delete),
        (Some(prior), Some(desired)) if !prior.has_inputs() => {
            let expected = desired.derive_id();
            match prior.id.as_deref() {
                Some(id) if id == expected => Ok(PlannedAction::Adopt),
                other => Err(Error::config(format!(
                    "imported ID {} does not match declared link {}",
                    other.unwrap_or("<none>"),
                    expected
                ))),
            }
        }
        (Some(prior), Some(desired)) => {
            let changed = changed_attributes(prior, desired);
            if changed.is_empty() {
                Ok(PlannedAction::NoOp)
            } else {
                Ok(PlannedAction::Replace { changed })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DestinationUser, SourceUser};

    fn declared() -> LinkResource {
        LinkResource::new(
            "pool-1",
            DestinationUser::new("Corp", "dest-42"),
            SourceUser::new("OIDC", "sub", "src-99"),
        )
    }

    fn created() -> LinkResource {
        let mut link = declared();
        link.id = Some(link.derive_id());
        link
    }

    #[test]
    fn test_create_and_delete() {
        assert_eq!(plan_change(None, Some(&declared())).unwrap(), PlannedAction::Create);
        assert_eq!(plan_change(Some(&created()), None).unwrap(), PlannedAction::Delete);
        assert_eq!(plan_change(None, None).unwrap(), PlannedAction::NoOp);
    }

    #[test]
    fn test_unchanged_ignores_computed_id() {
        assert_eq!(
            plan_change(Some(&created()), Some(&declared())).unwrap(),
            PlannedAction::NoOp
        );
    }

    #[test]
    fn test_any_input_change_replaces() {
        let mut desired = declared();
        desired.user_pool_id = "pool-2".to_string();
        desired.source_user.provider_attribute_name = "email".to_string();

        assert_eq!(
            plan_change(Some(&created()), Some(&desired)).unwrap(),
            PlannedAction::Replace {
                changed: vec!["user_pool_id", "source_user.provider_attribute_name"]
            }
        );
    }

    #[test]
    fn test_destination_provider_change_replaces() {
        let mut desired = declared();
        desired.destination_user.provider_name = "Cognito".to_string();

        let action = plan_change(Some(&created()), Some(&desired)).unwrap();
        assert!(action.is_change());
        assert_eq!(
            action,
            PlannedAction::Replace {
                changed: vec!["destination_user.provider_name"]
            }
        );
    }

    #[test]
    fn test_import_adopted_by_matching_declaration() {
        let imported = LinkResource::imported("pool-1:dest-42:src-99");
        let action = plan_change(Some(&imported), Some(&declared())).unwrap();
        assert_eq!(action, PlannedAction::Adopt);
        assert!(!action.is_change());
    }

    #[test]
    fn test_import_with_foreign_id_is_config_error() {
        let imported = LinkResource::imported("pool-9:someone:else");
        let err = plan_change(Some(&imported), Some(&declared())).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("pool-9:someone:else"));
    }
}
