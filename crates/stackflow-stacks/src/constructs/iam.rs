//! IAM roles and policies

use crate::error::Result;
use serde_json::{Value, json};
use stackflow_cloud::token::{AWS_PARTITION, fn_join, pseudo};
use stackflow_cloud::{Resource, ResourceRef, Stack};

/// One `Allow` statement
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStatement {
    pub actions: Vec<String>,
    pub resources: Vec<Value>,
}

impl PolicyStatement {
    pub fn allow<I, S>(actions: I, resources: Vec<Value>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
            resources,
        }
    }

    pub fn to_value(&self) -> Value {
        let action = match self.actions.as_slice() {
            [single] => json!(single),
            many => json!(many),
        };
        let resource = match self.resources.as_slice() {
            [single] => single.clone(),
            many => json!(many),
        };
        json!({
            "Action": action,
            "Effect": "Allow",
            "Resource": resource
        })
    }
}

/// `arn:{partition}:iam::aws:policy/{name}`
pub fn managed_policy_arn(name: &str) -> Value {
    fn_join(
        "",
        vec![
            json!("arn:"),
            pseudo(AWS_PARTITION),
            json!(format!(":iam::aws:policy/{}", name)),
        ],
    )
}

#[derive(Debug, Clone)]
pub struct Role {
    resource: ResourceRef,
}

impl Role {
    /// Role assumable by `service` (e.g. `lambda.amazonaws.com`)
    pub fn for_service(
        stack: &mut Stack,
        id: &str,
        service: &str,
        managed_policies: Vec<Value>,
    ) -> Result<Self> {
        let mut properties = json!({
            "AssumeRolePolicyDocument": {
                "Statement": [{
                    "Action": "sts:AssumeRole",
                    "Effect": "Allow",
                    "Principal": { "Service": service }
                }],
                "Version": "2012-10-17"
            }
        });
        if !managed_policies.is_empty() {
            properties["ManagedPolicyArns"] = json!(managed_policies);
        }

        let resource = stack.add(Resource::new(id, "AWS::IAM::Role", properties))?;
        Ok(Self { resource })
    }

    pub fn logical_id(&self) -> &str {
        self.resource.logical_id()
    }

    pub fn arn(&self) -> Value {
        self.resource.att("Arn")
    }

    pub fn name(&self) -> Value {
        self.resource.ref_token()
    }

    /// Attaches an inline policy named `{role}DefaultPolicy`
    pub fn attach_default_policy(
        &self,
        stack: &mut Stack,
        statements: &[PolicyStatement],
    ) -> Result<ResourceRef> {
        let id = format!("{}DefaultPolicy", self.logical_id());
        let statements: Vec<Value> = statements.iter().map(PolicyStatement::to_value).collect();

        Ok(stack.add(Resource::new(
            id.clone(),
            "AWS::IAM::Policy",
            json!({
                "PolicyDocument": {
                    "Statement": statements,
                    "Version": "2012-10-17"
                },
                "PolicyName": id,
                "Roles": [self.name()]
            }),
        ))?)
    }

    /// Appends `statements` to `{role}DefaultPolicy`, attaching the policy
    /// first if the role has none yet
    pub fn add_to_default_policy(
        &self,
        stack: &mut Stack,
        statements: &[PolicyStatement],
    ) -> Result<()> {
        let id = format!("{}DefaultPolicy", self.logical_id());
        let Some(policy) = stack.resource_mut(&id) else {
            self.attach_default_policy(stack, statements)?;
            return Ok(());
        };

        let added: Vec<Value> = statements.iter().map(PolicyStatement::to_value).collect();
        let document = &mut policy.properties["PolicyDocument"]["Statement"];
        match document.as_array_mut() {
            Some(existing) => existing.extend(added),
            None => *document = Value::Array(added),
        }
        tracing::debug!(policy = %id, added = statements.len(), "Extended default policy");
        Ok(())
    }
}
