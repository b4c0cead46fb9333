//! Environment context
//!
//! A deployment environment (`dev`, `prod`, ...) maps to a bundle of static
//! identifiers looked up from the configuration tree. The resolved
//! [`EnvironmentContext`] is built once at startup and only read afterwards.

use crate::error::{ContextError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Number of private subnets every environment entry must list.
const SUBNET_COUNT: usize = 2;

/// Deployment tier selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvType {
    Test,
    Dev,
    Stage,
    Prod,
    Common,
}

impl EnvType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvType::Test => "test",
            EnvType::Dev => "dev",
            EnvType::Stage => "stage",
            EnvType::Prod => "prod",
            EnvType::Common => "common",
        }
    }
}

impl fmt::Display for EnvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvType {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "test" => Ok(EnvType::Test),
            "dev" => Ok(EnvType::Dev),
            "stage" => Ok(EnvType::Stage),
            "prod" => Ok(EnvType::Prod),
            "common" => Ok(EnvType::Common),
            other => Err(ContextError::UnknownEnvType(other.to_string())),
        }
    }
}

/// Account/region pair a stack is pinned to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl Environment {
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: Some(account.into()),
            region: Some(region.into()),
        }
    }

    /// Neither account nor region is set.
    pub fn is_agnostic(&self) -> bool {
        self.account.is_none() && self.region.is_none()
    }

    /// Fills unset fields from `fallback`.
    pub fn or(self, fallback: Environment) -> Environment {
        Environment {
            account: self.account.or(fallback.account),
            region: self.region.or(fallback.region),
        }
    }
}

/// One environment's entry in the configuration tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextEntry {
    pub vpc_id: String,
    pub subnet_ids: Vec<String>,
    pub route_table_id: String,
    /// Subnets for internet-facing load balancers. Falls back to `subnet_ids`.
    #[serde(default)]
    pub public_subnet_ids: Vec<String>,
    #[serde(default)]
    pub env: Option<Environment>,
}

/// Configuration tree: top-level selectors plus one raw entry per environment
///
/// Entries are kept as raw JSON values and only deserialized when an
/// environment is resolved, so that unrelated keys in the tree (feature
/// flags and the like) never break loading.
#[derive(Debug, Clone, Default)]
pub struct ContextTree {
    pub system_name: Option<String>,
    pub env_type: Option<String>,
    pub entries: HashMap<String, serde_json::Value>,
}

impl ContextTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_entry(&mut self, env: impl Into<String>, entry: serde_json::Value) {
        self.entries.insert(env.into(), entry);
    }

    /// Deserializes and validates the entry for `env_type`.
    pub fn entry(&self, env_type: EnvType) -> Result<ContextEntry> {
        let key = env_type.as_str();
        let raw = self
            .entries
            .get(key)
            .ok_or_else(|| ContextError::EnvironmentNotFound(key.to_string()))?;

        let entry: ContextEntry =
            serde_json::from_value(raw.clone()).map_err(|e| ContextError::MalformedEntry {
                env: key.to_string(),
                message: e.to_string(),
            })?;

        validate_entry(key, &entry)?;
        Ok(entry)
    }
}

fn validate_entry(env: &str, entry: &ContextEntry) -> Result<()> {
    let malformed = |message: String| ContextError::MalformedEntry {
        env: env.to_string(),
        message,
    };

    if entry.vpc_id.is_empty() {
        return Err(malformed("vpcId is empty".to_string()));
    }
    if entry.route_table_id.is_empty() {
        return Err(malformed("routeTableId is empty".to_string()));
    }
    if entry.subnet_ids.len() != SUBNET_COUNT {
        return Err(malformed(format!(
            "subnetIds must list exactly {} subnets, got {}",
            SUBNET_COUNT,
            entry.subnet_ids.len()
        )));
    }
    if entry.subnet_ids.iter().any(|s| s.is_empty()) {
        return Err(malformed("subnetIds contains an empty id".to_string()));
    }
    Ok(())
}

/// Resolved, immutable view of one deployment environment
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentContext {
    env_type: EnvType,
    system_name: String,
    vpc_id: String,
    subnet_ids: Vec<String>,
    route_table_id: String,
    public_subnet_ids: Vec<String>,
    env: Option<Environment>,
}

impl EnvironmentContext {
    /// Looks up `env_type` in `tree`. Fails when the entry is absent or
    /// malformed; there is no default environment.
    #[tracing::instrument(skip(tree, system_name))]
    pub fn new(env_type: EnvType, system_name: impl Into<String>, tree: &ContextTree) -> Result<Self> {
        let system_name = system_name.into();
        if system_name.is_empty() {
            return Err(ContextError::MissingSelector("systemName"));
        }

        let entry = tree.entry(env_type)?;
        tracing::debug!(vpc_id = %entry.vpc_id, "Resolved environment context");

        Ok(Self {
            env_type,
            system_name,
            vpc_id: entry.vpc_id,
            subnet_ids: entry.subnet_ids,
            route_table_id: entry.route_table_id,
            public_subnet_ids: entry.public_subnet_ids,
            env: entry.env.filter(|e| !e.is_agnostic()),
        })
    }

    pub fn env_type(&self) -> EnvType {
        self.env_type
    }

    pub fn system_name(&self) -> &str {
        &self.system_name
    }

    pub fn vpc_id(&self) -> &str {
        &self.vpc_id
    }

    pub fn subnet_ids(&self) -> &[String] {
        &self.subnet_ids
    }

    pub fn route_table_id(&self) -> &str {
        &self.route_table_id
    }

    /// Subnets for internet-facing resources; the private subnets when the
    /// entry does not list any.
    pub fn public_subnet_ids(&self) -> &[String] {
        if self.public_subnet_ids.is_empty() {
            &self.subnet_ids
        } else {
            &self.public_subnet_ids
        }
    }

    pub fn env(&self) -> Option<&Environment> {
        self.env.as_ref()
    }

    pub fn is_development(&self) -> bool {
        self.env_type == EnvType::Dev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dummy_tree() -> ContextTree {
        let mut tree = ContextTree::new();
        tree.insert_entry(
            "test",
            json!({
                "vpcId": "vpc-dummy",
                "subnetIds": ["subnet-dummy1", "subnet-dummy2"],
                "routeTableId": "rtb-dummy",
                "env": { "account": "dummy-account", "region": "dummy-region" }
            }),
        );
        tree.insert_entry(
            "dev",
            json!({
                "vpcId": "vpc-dev",
                "subnetIds": ["subnet-dev1", "subnet-dev2"],
                "routeTableId": "rtb-dev"
            }),
        );
        tree
    }

    #[test]
    fn test_context_fields_are_taken_verbatim() {
        let ctx = EnvironmentContext::new(EnvType::Test, "myCdk", &dummy_tree()).unwrap();

        assert_eq!(ctx.env_type(), EnvType::Test);
        assert_eq!(ctx.system_name(), "myCdk");
        assert_eq!(ctx.vpc_id(), "vpc-dummy");
        assert_eq!(ctx.subnet_ids(), ["subnet-dummy1", "subnet-dummy2"]);
        assert_eq!(ctx.route_table_id(), "rtb-dummy");
        assert_eq!(
            ctx.env(),
            Some(&Environment::new("dummy-account", "dummy-region"))
        );
        assert!(!ctx.is_development());
    }

    #[test]
    fn test_is_development() {
        let ctx = EnvironmentContext::new(EnvType::Dev, "myCdk", &dummy_tree()).unwrap();
        assert!(ctx.is_development());
        assert!(ctx.env().is_none());
    }

    #[test]
    fn test_missing_environment_fails() {
        let result = EnvironmentContext::new(EnvType::Prod, "myCdk", &dummy_tree());
        match result {
            Err(ContextError::EnvironmentNotFound(env)) => assert_eq!(env, "prod"),
            other => panic!("expected EnvironmentNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_entry_fails() {
        let mut tree = ContextTree::new();
        tree.insert_entry("stage", json!({ "vpcId": "vpc-1", "routeTableId": "rtb-1" }));

        let result = EnvironmentContext::new(EnvType::Stage, "myCdk", &tree);
        assert!(matches!(result, Err(ContextError::MalformedEntry { .. })));
    }

    #[test]
    fn test_wrong_subnet_count_fails() {
        let mut tree = ContextTree::new();
        tree.insert_entry(
            "stage",
            json!({
                "vpcId": "vpc-1",
                "subnetIds": ["subnet-1"],
                "routeTableId": "rtb-1"
            }),
        );

        let err = EnvironmentContext::new(EnvType::Stage, "myCdk", &tree).unwrap_err();
        assert!(err.to_string().contains("exactly 2 subnets"));
    }

    #[test]
    fn test_empty_system_name_fails() {
        let result = EnvironmentContext::new(EnvType::Test, "", &dummy_tree());
        assert!(matches!(result, Err(ContextError::MissingSelector("systemName"))));
    }

    #[test]
    fn test_public_subnets_fall_back_to_private() {
        let ctx = EnvironmentContext::new(EnvType::Dev, "myCdk", &dummy_tree()).unwrap();
        assert_eq!(ctx.public_subnet_ids(), ctx.subnet_ids());
    }

    #[test]
    fn test_env_type_parse() {
        assert_eq!("prod".parse::<EnvType>().unwrap(), EnvType::Prod);
        assert_eq!(EnvType::Common.to_string(), "common");
        assert!(matches!(
            "qa".parse::<EnvType>(),
            Err(ContextError::UnknownEnvType(_))
        ));
    }

    #[test]
    fn test_environment_fallback() {
        let partial = Environment {
            account: Some("111".to_string()),
            region: None,
        };
        let merged = partial.or(Environment::new("222", "us-east-1"));
        assert_eq!(merged, Environment::new("111", "us-east-1"));
    }
}
