//! Stacks

use crate::error::{CloudError, Result};
use crate::resource::{Resource, ResourceRef};
use stackflow_core::Environment;

/// Deployment-level settings of a stack
#[derive(Debug, Clone, Default)]
pub struct StackProps {
    /// Account/region the stack is pinned to; environment-agnostic if unset
    pub env: Option<Environment>,

    /// Refuse stack deletion in the provisioning engine
    pub termination_protection: bool,

    /// Template description
    pub description: Option<String>,
}

impl StackProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, env: Option<Environment>) -> Self {
        self.env = env.filter(|e| !e.is_agnostic());
        self
    }

    pub fn with_termination_protection(mut self, enabled: bool) -> Self {
        self.termination_protection = enabled;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A named, independently deployable group of resources
#[derive(Debug, Clone)]
pub struct Stack {
    name: String,
    props: StackProps,
    resources: Vec<Resource>,
}

impl Stack {
    pub fn new(name: impl Into<String>, props: StackProps) -> Self {
        Self {
            name: name.into(),
            props,
            resources: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn props(&self) -> &StackProps {
        &self.props
    }

    /// Adds a resource and returns a handle to it
    ///
    /// Logical ids are plain alphanumerics and must be unique in the stack.
    pub fn add(&mut self, resource: Resource) -> Result<ResourceRef> {
        let logical_id = &resource.logical_id;
        if logical_id.is_empty() || !logical_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CloudError::InvalidLogicalId(logical_id.clone()));
        }
        if self.resource(logical_id).is_some() {
            return Err(CloudError::DuplicateLogicalId {
                stack: self.name.clone(),
                logical_id: logical_id.clone(),
            });
        }

        tracing::debug!(
            stack = %self.name,
            logical_id = %logical_id,
            resource_type = %resource.resource_type,
            "Adding resource"
        );

        let handle = ResourceRef::new(&self.name, logical_id, &resource.resource_type);
        self.resources.push(resource);
        Ok(handle)
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.logical_id == logical_id)
    }

    /// Mutable access for constructs that extend a resource they declared
    pub fn resource_mut(&mut self, logical_id: &str) -> Option<&mut Resource> {
        self.resources.iter_mut().find(|r| r.logical_id == logical_id)
    }

    /// Get resources by type
    pub fn resources_by_type(&self, resource_type: &str) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|r| r.resource_type == resource_type)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bucket(id: &str) -> Resource {
        Resource::new(id, "AWS::S3::Bucket", json!({}))
    }

    #[test]
    fn test_add_returns_handle() {
        let mut stack = Stack::new("sys-dev-Storage", StackProps::new());
        let handle = stack.add(bucket("Bucket")).unwrap();

        assert_eq!(handle.stack(), "sys-dev-Storage");
        assert_eq!(handle.logical_id(), "Bucket");
        assert_eq!(handle.resource_type(), "AWS::S3::Bucket");
        assert_eq!(stack.resources().len(), 1);
    }

    #[test]
    fn test_duplicate_logical_id() {
        let mut stack = Stack::new("s", StackProps::new());
        stack.add(bucket("Bucket")).unwrap();

        let result = stack.add(bucket("Bucket"));
        assert!(matches!(result, Err(CloudError::DuplicateLogicalId { .. })));
    }

    #[test]
    fn test_invalid_logical_id() {
        let mut stack = Stack::new("s", StackProps::new());
        assert!(matches!(
            stack.add(bucket("my-bucket")),
            Err(CloudError::InvalidLogicalId(_))
        ));
        assert!(matches!(
            stack.add(bucket("")),
            Err(CloudError::InvalidLogicalId(_))
        ));
    }

    #[test]
    fn test_agnostic_env_is_dropped() {
        let props = StackProps::new().with_env(Some(Environment::default()));
        assert!(props.env.is_none());

        let props = StackProps::new().with_env(Some(Environment::new("1", "r")));
        assert!(props.env.is_some());
    }

    /// Declared resources can be extended in place
    #[test]
    fn test_resource_mut() {
        let mut stack = Stack::new("s", StackProps::new());
        stack.add(bucket("Bucket")).unwrap();

        if let Some(resource) = stack.resource_mut("Bucket") {
            resource.properties["BucketName"] = json!("logs");
        }
        assert_eq!(
            stack.resource("Bucket").unwrap().properties["BucketName"],
            json!("logs")
        );
        assert!(stack.resource_mut("Missing").is_none());
    }

    #[test]
    fn test_resources_by_type() {
        let mut stack = Stack::new("s", StackProps::new());
        stack.add(bucket("A")).unwrap();
        stack
            .add(Resource::new("Q", "AWS::SQS::Queue", json!({})))
            .unwrap();
        stack.add(bucket("B")).unwrap();

        assert_eq!(stack.resources_by_type("AWS::S3::Bucket").len(), 2);
    }
}
