//! environment node parsing

use super::{first_string, string_args};
use crate::error::{ContextError, Result};
use kdl::KdlNode;
use serde_json::{Map, Value};

/// Parses an `environment "<name>" { ... }` node into its raw entry.
///
/// The entry is produced in the same camelCase shape as the JSON context
/// tree so both formats go through one validation path.
pub fn parse_environment(node: &KdlNode) -> Result<(String, Value)> {
    let name = first_string(node)
        .ok_or_else(|| ContextError::InvalidConfig("environment requires a name".to_string()))?;

    let mut entry = Map::new();
    let mut env = Map::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "vpc-id" | "vpc_id" | "vpcId" => {
                    if let Some(v) = first_string(child) {
                        entry.insert("vpcId".to_string(), Value::String(v));
                    }
                }
                "subnet-ids" | "subnet_ids" | "subnetIds" => {
                    entry.insert("subnetIds".to_string(), string_list(child));
                }
                "public-subnet-ids" | "public_subnet_ids" | "publicSubnetIds" => {
                    entry.insert("publicSubnetIds".to_string(), string_list(child));
                }
                "route-table-id" | "route_table_id" | "routeTableId" => {
                    if let Some(v) = first_string(child) {
                        entry.insert("routeTableId".to_string(), Value::String(v));
                    }
                }
                "account" | "region" => {
                    if let Some(v) = first_string(child) {
                        env.insert(child.name().value().to_string(), Value::String(v));
                    }
                }
                "env" => {
                    // env { account "..."; region "..." }
                    if let Some(env_children) = child.children() {
                        for env_child in env_children.nodes() {
                            let key = env_child.name().value();
                            if (key == "account" || key == "region")
                                && let Some(v) = first_string(env_child)
                            {
                                env.insert(key.to_string(), Value::String(v));
                            }
                        }
                    }
                }
                other => {
                    return Err(ContextError::MalformedEntry {
                        env: name,
                        message: format!("unknown field '{}'", other),
                    });
                }
            }
        }
    }

    if !env.is_empty() {
        entry.insert("env".to_string(), Value::Object(env));
    }

    Ok((name, Value::Object(entry)))
}

fn string_list(node: &KdlNode) -> Value {
    Value::Array(string_args(node).into_iter().map(Value::String).collect())
}
