//! Log groups

use crate::error::Result;
use serde_json::{Value, json};
use stackflow_cloud::{RemovalPolicy, Resource, ResourceRef, Stack};

/// Log retention period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionDays {
    OneWeek,
}

impl RetentionDays {
    pub fn days(&self) -> u32 {
        match self {
            RetentionDays::OneWeek => 7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogGroup {
    resource: ResourceRef,
}

impl LogGroup {
    pub fn create(
        stack: &mut Stack,
        id: &str,
        name: Value,
        retention: RetentionDays,
        removal_policy: RemovalPolicy,
    ) -> Result<Self> {
        let resource = stack.add(
            Resource::new(
                id,
                "AWS::Logs::LogGroup",
                json!({
                    "LogGroupName": name,
                    "RetentionInDays": retention.days()
                }),
            )
            .with_removal_policy(removal_policy),
        )?;
        Ok(Self { resource })
    }

    pub fn logical_id(&self) -> &str {
        self.resource.logical_id()
    }

    pub fn name(&self) -> Value {
        self.resource.ref_token()
    }

    pub fn arn(&self) -> Value {
        self.resource.att("Arn")
    }
}
