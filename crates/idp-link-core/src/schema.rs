//! Resource schema and provider metadata
//!
//! Describes the declarative surface a host needs to decode configuration
//! and render plans. Every input attribute forces replacement: links cannot
//! be modified in place.

use serde::Serialize;
use std::collections::BTreeMap;

/// Provider type name
pub const PROVIDER_TYPE_NAME: &str = "cognito-idp-link";

/// Registry address the provider is served under
pub const PROVIDER_ADDRESS: &str = "registry.terraform.io/atpons/cognito-idp-link";

/// Suffix appended to the provider type name for the link resource
pub const LINK_RESOURCE_SUFFIX: &str = "_link";

/// Provider identity reported to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderMetadata {
    pub type_name: String,
    pub version: String,
    pub address: String,
    pub description: String,
}

impl ProviderMetadata {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            type_name: PROVIDER_TYPE_NAME.to_string(),
            version: version.into(),
            address: PROVIDER_ADDRESS.to_string(),
            description: "Interact with AWS Cognito User Pools Identity Provider Link."
                .to_string(),
        }
    }

    /// Fully qualified name of the link resource type
    pub fn link_resource_type(&self) -> String {
        format!("{}{}", self.type_name, LINK_RESOURCE_SUFFIX)
    }
}

/// Shape of an attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeKind {
    String,
    SingleNested {
        attributes: BTreeMap<String, Attribute>,
    },
}

/// One attribute of a resource schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub description: String,
    #[serde(flatten)]
    pub kind: AttributeKind,
    pub required: bool,
    pub computed: bool,
    /// A change to this attribute destroys and recreates the resource
    pub requires_replace: bool,
}

impl Attribute {
    fn required_string(description: &str) -> Self {
        Self {
            description: description.to_string(),
            kind: AttributeKind::String,
            required: true,
            computed: false,
            requires_replace: true,
        }
    }

    fn computed_string(description: &str) -> Self {
        Self {
            description: description.to_string(),
            kind: AttributeKind::String,
            required: false,
            computed: true,
            requires_replace: false,
        }
    }

    fn required_nested(description: &str, attributes: &[(&str, Attribute)]) -> Self {
        Self {
            description: description.to_string(),
            kind: AttributeKind::SingleNested {
                attributes: attributes
                    .iter()
                    .map(|(name, attr)| (name.to_string(), attr.clone()))
                    .collect(),
            },
            required: true,
            computed: false,
            requires_replace: true,
        }
    }
}

/// Schema of one resource type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSchema {
    pub type_name: String,
    pub description: String,
    pub attributes: BTreeMap<String, Attribute>,
    /// Lifecycle verbs the resource supports
    pub operations: Vec<String>,
}

impl ResourceSchema {
    /// Dotted paths of every attribute whose change forces replacement
    pub fn replacement_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for (name, attr) in &self.attributes {
            match &attr.kind {
                AttributeKind::SingleNested { attributes } => {
                    for (nested, nested_attr) in attributes {
                        if nested_attr.requires_replace {
                            paths.push(format!("{}.{}", name, nested));
                        }
                    }
                }
                AttributeKind::String if attr.requires_replace => paths.push(name.clone()),
                AttributeKind::String => {}
            }
        }
        paths
    }
}

/// Schema of the link resource
pub fn link_resource_schema(metadata: &ProviderMetadata) -> ResourceSchema {
    let attributes = [
        (
            "user_pool_id",
            Attribute::required_string("Cognito User Pool ID"),
        ),
        (
            "destination_user",
            Attribute::required_nested(
                "Information of the destination user to be linked",
                &[
                    ("provider_name", Attribute::required_string("Provider name")),
                    (
                        "provider_attribute_value",
                        Attribute::required_string("Provider attribute value"),
                    ),
                ],
            ),
        ),
        (
            "source_user",
            Attribute::required_nested(
                "Information of the source user to be linked",
                &[
                    ("provider_name", Attribute::required_string("Provider name")),
                    (
                        "provider_attribute_name",
                        Attribute::required_string("Provider attribute name"),
                    ),
                    (
                        "provider_attribute_value",
                        Attribute::required_string("Provider attribute value"),
                    ),
                ],
            ),
        ),
        ("id", Attribute::computed_string("Resource ID")),
    ];

    ResourceSchema {
        type_name: metadata.link_resource_type(),
        description: "Manages users to be linked in Cognito User Pools.".to_string(),
        attributes: attributes
            .into_iter()
            .map(|(name, attr)| (name.to_string(), attr))
            .collect(),
        operations: ["create", "read", "delete", "import"]
            .into_iter()
            .map(String::from)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_name() {
        let metadata = ProviderMetadata::new("dev");
        assert_eq!(metadata.link_resource_type(), "cognito-idp-link_link");
        assert_eq!(metadata.address, PROVIDER_ADDRESS);
    }

    #[test]
    fn test_every_input_forces_replacement() {
        let schema = link_resource_schema(&ProviderMetadata::new("dev"));
        assert_eq!(
            schema.replacement_paths(),
            vec![
                "destination_user.provider_attribute_value",
                "destination_user.provider_name",
                "source_user.provider_attribute_name",
                "source_user.provider_attribute_value",
                "source_user.provider_name",
                "user_pool_id",
            ]
        );
    }

    #[test]
    fn test_id_is_computed_and_update_not_offered() {
        let schema = link_resource_schema(&ProviderMetadata::new("dev"));
        let id = &schema.attributes["id"];
        assert!(id.computed);
        assert!(!id.required);
        assert!(!schema.operations.contains(&"update".to_string()));
    }

    #[test]
    fn test_schema_serializes_nested_attributes() {
        let schema = link_resource_schema(&ProviderMetadata::new("dev"));
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            json["attributes"]["source_user"]["type"],
            serde_json::json!("single_nested")
        );
        assert_eq!(
            json["attributes"]["source_user"]["attributes"]["provider_attribute_name"]["required"],
            serde_json::json!(true)
        );
    }
}
