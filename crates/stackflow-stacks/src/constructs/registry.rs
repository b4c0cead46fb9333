//! Source and image repositories

use crate::error::Result;
use serde_json::{Value, json};
use stackflow_cloud::{RemovalPolicy, Resource, ResourceRef, Stack};

/// Git repository hosted by the cloud provider
#[derive(Debug, Clone)]
pub struct CodeRepository {
    resource: ResourceRef,
}

impl CodeRepository {
    pub fn create(
        stack: &mut Stack,
        id: &str,
        repository_name: &str,
        removal_policy: RemovalPolicy,
    ) -> Result<Self> {
        let resource = stack.add(
            Resource::new(
                id,
                "AWS::CodeCommit::Repository",
                json!({ "RepositoryName": repository_name }),
            )
            .with_removal_policy(removal_policy),
        )?;
        Ok(Self { resource })
    }

    pub fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    pub fn name(&self) -> Value {
        self.resource.att("Name")
    }

    pub fn arn(&self) -> Value {
        self.resource.att("Arn")
    }
}

/// Container image registry
#[derive(Debug, Clone)]
pub struct EcrRepository {
    resource: ResourceRef,
}

/// Registry settings
#[derive(Debug, Clone)]
pub struct EcrRepositoryProps<'a> {
    pub repository_name: &'a str,
    pub kms_encryption: bool,
    /// Expire images beyond this count
    pub max_image_count: Option<u32>,
    pub removal_policy: RemovalPolicy,
}

impl EcrRepository {
    pub fn create(stack: &mut Stack, id: &str, props: EcrRepositoryProps<'_>) -> Result<Self> {
        let mut properties = json!({ "RepositoryName": props.repository_name });

        if props.kms_encryption {
            properties["EncryptionConfiguration"] = json!({ "EncryptionType": "KMS" });
        }
        if let Some(count) = props.max_image_count {
            properties["LifecyclePolicy"] = json!({
                "LifecyclePolicyText": lifecycle_policy_text(count)
            });
        }

        let resource = stack.add(
            Resource::new(id, "AWS::ECR::Repository", properties)
                .with_removal_policy(props.removal_policy),
        )?;
        Ok(Self { resource })
    }

    pub fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    pub fn name(&self) -> Value {
        self.resource.ref_token()
    }

    pub fn arn(&self) -> Value {
        self.resource.att("Arn")
    }

    pub fn uri(&self) -> Value {
        self.resource.att("RepositoryUri")
    }
}

/// Lifecycle policy keeping the `count` most recent images
fn lifecycle_policy_text(count: u32) -> String {
    json!({
        "rules": [{
            "rulePriority": 1,
            "selection": {
                "tagStatus": "any",
                "countType": "imageCountMoreThan",
                "countNumber": count
            },
            "action": { "type": "expire" }
        }]
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackflow_cloud::StackProps;

    #[test]
    fn test_ecr_repository() {
        let mut stack = Stack::new("s", StackProps::new());
        EcrRepository::create(
            &mut stack,
            "EcrRepository",
            EcrRepositoryProps {
                repository_name: "sys-dev-backend-repo",
                kms_encryption: true,
                max_image_count: Some(2),
                removal_policy: RemovalPolicy::Retain,
            },
        )
        .unwrap();

        let repo = stack.resource("EcrRepository").unwrap();
        assert_eq!(
            repo.properties["EncryptionConfiguration"]["EncryptionType"],
            json!("KMS")
        );

        let text: String = serde_json::from_value(
            repo.properties["LifecyclePolicy"]["LifecyclePolicyText"].clone(),
        )
        .unwrap();
        let policy: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(policy["rules"][0]["selection"]["countNumber"], json!(2));
        assert_eq!(repo.removal_policy, Some(RemovalPolicy::Retain));
    }

    #[test]
    fn test_code_repository() {
        let mut stack = Stack::new("s", StackProps::new());
        let repo = CodeRepository::create(
            &mut stack,
            "CodeCommitRepository",
            "sys-common-backend-repo",
            RemovalPolicy::Retain,
        )
        .unwrap();

        assert_eq!(repo.resource().resource_type(), "AWS::CodeCommit::Repository");
        assert_eq!(
            stack.resource("CodeCommitRepository").unwrap().removal_policy,
            Some(RemovalPolicy::Retain)
        );
    }
}
