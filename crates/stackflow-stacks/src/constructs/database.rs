//! Aurora database cluster

use crate::constructs::logs::{LogGroup, RetentionDays};
use crate::constructs::network::{ImportedSubnet, SecurityGroup, subnet_ids};
use crate::error::{Result, StackError};
use serde_json::{Value, json};
use stackflow_cloud::token::fn_join;
use stackflow_cloud::{RemovalPolicy, Resource, ResourceRef, Stack};

const MASTER_USERNAME: &str = "postgres";
const PASSWORD_EXCLUDE_CHARACTERS: &str = " %+~`#$&*()|[]{}:;<>?!'/@\"\\";

/// Cluster settings
#[derive(Debug, Clone)]
pub struct DatabaseClusterProps<'a> {
    pub engine: &'a str,
    pub engine_version: &'a str,
    pub instance_class: &'a str,
    pub instances: usize,
    pub subnet_group_description: &'a str,
    pub subnets: &'a [ImportedSubnet],
    pub security_group: &'a SecurityGroup,
    pub storage_encrypted: bool,
    pub cloudwatch_logs_exports: &'a [&'a str],
    pub cloudwatch_logs_retention: RetentionDays,
    pub removal_policy: RemovalPolicy,
}

#[derive(Debug, Clone)]
pub struct DatabaseCluster {
    resource: ResourceRef,
}

impl DatabaseCluster {
    /// Emits `SubnetGroup`, `{id}Secret`, `{id}`, `{id}Instance1..n` and one
    /// log group per exported log
    pub fn create(stack: &mut Stack, id: &str, props: DatabaseClusterProps<'_>) -> Result<Self> {
        if props.instances == 0 {
            return Err(StackError::InvalidConstruct {
                id: id.to_string(),
                message: "a cluster needs at least one instance".to_string(),
            });
        }

        let subnet_group = stack.add(Resource::new(
            "SubnetGroup",
            "AWS::RDS::DBSubnetGroup",
            json!({
                "DBSubnetGroupDescription": props.subnet_group_description,
                "SubnetIds": subnet_ids(props.subnets)
            }),
        ))?;

        let secret_description = format!("Generated by stackflow for stack: {}", stack.name());
        let secret = stack.add(
            Resource::new(
                format!("{}Secret", id),
                "AWS::SecretsManager::Secret",
                json!({
                    "Description": secret_description,
                    "GenerateSecretString": {
                        "ExcludeCharacters": PASSWORD_EXCLUDE_CHARACTERS,
                        "GenerateStringKey": "password",
                        "PasswordLength": 30,
                        "SecretStringTemplate": json!({ "username": MASTER_USERNAME }).to_string()
                    }
                }),
            )
            .with_removal_policy(props.removal_policy),
        )?;

        let resource = stack.add(
            Resource::new(
                id,
                "AWS::RDS::DBCluster",
                json!({
                    "Engine": props.engine,
                    "EngineVersion": props.engine_version,
                    "DBSubnetGroupName": subnet_group.ref_token(),
                    "VpcSecurityGroupIds": [props.security_group.group_id()],
                    "MasterUsername": secret_field(&secret, "username"),
                    "MasterUserPassword": secret_field(&secret, "password"),
                    "StorageEncrypted": props.storage_encrypted,
                    "EnableCloudwatchLogsExports": props.cloudwatch_logs_exports,
                    "CopyTagsToSnapshot": true
                }),
            )
            .with_removal_policy(props.removal_policy),
        )?;

        stack.add(Resource::new(
            format!("{}SecretAttachment", id),
            "AWS::SecretsManager::SecretTargetAttachment",
            json!({
                "SecretId": secret.ref_token(),
                "TargetId": resource.ref_token(),
                "TargetType": "AWS::RDS::DBCluster"
            }),
        ))?;

        for index in 1..=props.instances {
            stack.add(
                Resource::new(
                    format!("{}Instance{}", id, index),
                    "AWS::RDS::DBInstance",
                    json!({
                        "DBClusterIdentifier": resource.ref_token(),
                        "DBInstanceClass": props.instance_class,
                        "DBSubnetGroupName": subnet_group.ref_token(),
                        "Engine": props.engine,
                        "PubliclyAccessible": false
                    }),
                )
                .with_removal_policy(props.removal_policy),
            )?;
        }

        for log in props.cloudwatch_logs_exports {
            let log_id = format!("{}LogGroup{}", id, capitalize(log));
            let name = fn_join(
                "",
                vec![
                    json!("/aws/rds/cluster/"),
                    resource.ref_token(),
                    json!(format!("/{}", log)),
                ],
            );
            LogGroup::create(
                stack,
                &log_id,
                name,
                props.cloudwatch_logs_retention,
                RemovalPolicy::Retain,
            )?;
        }

        tracing::debug!(
            stack = %stack.name(),
            cluster = %id,
            instances = props.instances,
            "Database cluster declared"
        );

        Ok(Self { resource })
    }

    pub fn resource(&self) -> &ResourceRef {
        &self.resource
    }

    /// Cluster identifier
    pub fn identifier(&self) -> Value {
        self.resource.ref_token()
    }
}

/// Dynamic reference to one key of the generated secret
fn secret_field(secret: &ResourceRef, key: &str) -> Value {
    fn_join(
        "",
        vec![
            json!("{{resolve:secretsmanager:"),
            secret.ref_token(),
            json!(format!(":SecretString:{}::}}}}", key)),
        ],
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
