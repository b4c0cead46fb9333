//! Resource declarations

use crate::token::Reference;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What happens to a resource when it leaves the template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalPolicy {
    /// Keep the physical resource
    Retain,
    /// Delete the physical resource
    Destroy,
}

impl RemovalPolicy {
    /// Value used for `DeletionPolicy` / `UpdateReplacePolicy`
    pub fn as_policy(&self) -> &'static str {
        match self {
            RemovalPolicy::Retain => "Retain",
            RemovalPolicy::Destroy => "Delete",
        }
    }
}

impl std::fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemovalPolicy::Retain => write!(f, "retain"),
            RemovalPolicy::Destroy => write!(f, "destroy"),
        }
    }
}

/// A single resource declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Logical id, unique within the stack
    pub logical_id: String,

    /// Resource type (e.g., "AWS::ECR::Repository")
    pub resource_type: String,

    /// Resource properties, possibly containing reference tokens
    pub properties: Value,

    /// Logical ids in the same stack that must be created first
    pub depends_on: Vec<String>,

    /// Deletion / update-replace policy
    pub removal_policy: Option<RemovalPolicy>,
}

impl Resource {
    pub fn new(
        logical_id: impl Into<String>,
        resource_type: impl Into<String>,
        properties: Value,
    ) -> Self {
        Self {
            logical_id: logical_id.into(),
            resource_type: resource_type.into(),
            properties,
            depends_on: Vec::new(),
            removal_policy: None,
        }
    }

    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = Some(policy);
        self
    }

    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    /// Get a property value as a specific type
    pub fn get_property<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.properties
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Handle to a resource that has been added to a stack
///
/// Cheap to clone; handing it to another stack only passes the reference,
/// never the resource itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    stack: String,
    logical_id: String,
    resource_type: String,
}

impl ResourceRef {
    pub(crate) fn new(
        stack: impl Into<String>,
        logical_id: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        Self {
            stack: stack.into(),
            logical_id: logical_id.into(),
            resource_type: resource_type.into(),
        }
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Token for the resource's primary identifier (`Ref`)
    pub fn ref_token(&self) -> Value {
        Reference::new(&self.stack, &self.logical_id).to_token()
    }

    /// Token for one of the resource's attributes (`Fn::GetAtt`)
    pub fn att(&self, attribute: &str) -> Value {
        Reference::new(&self.stack, &self.logical_id)
            .with_attribute(attribute)
            .to_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_removal_policy_values() {
        assert_eq!(RemovalPolicy::Retain.as_policy(), "Retain");
        assert_eq!(RemovalPolicy::Destroy.as_policy(), "Delete");
        assert_eq!(RemovalPolicy::Destroy.to_string(), "destroy");
    }

    #[test]
    fn test_resource_builder() {
        let resource = Resource::new(
            "Repo",
            "AWS::CodeCommit::Repository",
            json!({ "RepositoryName": "sys-common-backend-repo" }),
        )
        .with_removal_policy(RemovalPolicy::Retain)
        .depends_on("Other");

        assert_eq!(resource.depends_on, vec!["Other"]);
        assert_eq!(
            resource.get_property::<String>("RepositoryName").as_deref(),
            Some("sys-common-backend-repo")
        );
        assert!(resource.get_property::<String>("Missing").is_none());
    }

    #[test]
    fn test_ref_tokens() {
        let handle = ResourceRef::new("stack-a", "Bucket", "AWS::S3::Bucket");
        let reference = Reference::from_token(&handle.att("Arn")).unwrap();
        assert_eq!(reference.stack, "stack-a");
        assert_eq!(reference.logical_id, "Bucket");
        assert_eq!(reference.attribute.as_deref(), Some("Arn"));

        let plain = Reference::from_token(&handle.ref_token()).unwrap();
        assert!(plain.attribute.is_none());
    }
}
