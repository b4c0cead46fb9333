//! Context loading
//!
//! Reads the configuration tree from disk, applies command-line overrides
//! and resolves the single [`EnvironmentContext`] for the process.

use crate::context::{ContextTree, EnvType, EnvironmentContext};
use crate::error::{ContextError, Result};
use crate::parser::parse_kdl_string;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, instrument};

const SYSTEM_NAME_KEY: &str = "systemName";
const ENV_TYPE_KEY: &str = "envType";

/// Loads a context tree, choosing the format by file extension
///
/// `.kdl` files use the native format; `.json` files are read as a
/// `cdk.json`-style context object (with or without the `context` wrapper).
#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_context_tree(path: &Path) -> Result<ContextTree> {
    let content = std::fs::read_to_string(path).map_err(|e| ContextError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let tree = match path.extension().and_then(|e| e.to_str()) {
        Some("kdl") => parse_kdl_string(&content)?,
        Some("json") => parse_json_string(&content)?,
        _ => return Err(ContextError::UnsupportedFormat(path.to_path_buf())),
    };

    info!(environments = tree.entries.len(), "Context tree loaded");
    Ok(tree)
}

/// Parses a JSON context tree
pub fn parse_json_string(content: &str) -> Result<ContextTree> {
    let root: Value = serde_json::from_str(content)?;

    let context = match root {
        Value::Object(mut map) => match map.remove("context") {
            Some(Value::Object(inner)) => inner,
            Some(_) => {
                return Err(ContextError::InvalidConfig(
                    "'context' must be an object".to_string(),
                ));
            }
            None => map,
        },
        _ => {
            return Err(ContextError::InvalidConfig(
                "context tree must be a JSON object".to_string(),
            ));
        }
    };

    let mut tree = ContextTree::new();
    for (key, value) in context {
        match key.as_str() {
            SYSTEM_NAME_KEY => tree.system_name = value.as_str().map(|s| s.to_string()),
            ENV_TYPE_KEY => tree.env_type = value.as_str().map(|s| s.to_string()),
            _ if value.is_object() => tree.insert_entry(key, value),
            _ => debug!(key = %key, "Ignoring non-environment context value"),
        }
    }

    Ok(tree)
}

/// Selector overrides taken from the command line
#[derive(Debug, Clone, Default)]
pub struct ContextOverrides {
    pub system_name: Option<String>,
    pub env_type: Option<String>,
}

impl ContextOverrides {
    /// Parses `key=value` pairs as given to `-c/--context`.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = Self::default();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                ContextError::InvalidConfig(format!("expected key=value, got '{}'", pair))
            })?;
            match key.trim() {
                "systemName" | "system-name" => {
                    overrides.system_name = Some(value.trim().to_string())
                }
                "envType" | "env-type" => overrides.env_type = Some(value.trim().to_string()),
                other => {
                    return Err(ContextError::InvalidConfig(format!(
                        "unsupported context key '{}'",
                        other
                    )));
                }
            }
        }
        Ok(overrides)
    }

    /// Later overrides win over earlier ones.
    pub fn merge(self, other: ContextOverrides) -> ContextOverrides {
        ContextOverrides {
            system_name: other.system_name.or(self.system_name),
            env_type: other.env_type.or(self.env_type),
        }
    }
}

/// Resolves the environment context selected by the tree and the overrides
pub fn resolve_context(tree: &ContextTree, overrides: &ContextOverrides) -> Result<EnvironmentContext> {
    let system_name = overrides
        .system_name
        .as_deref()
        .or(tree.system_name.as_deref())
        .ok_or(ContextError::MissingSelector(SYSTEM_NAME_KEY))?;

    let env_type: EnvType = overrides
        .env_type
        .as_deref()
        .or(tree.env_type.as_deref())
        .ok_or(ContextError::MissingSelector(ENV_TYPE_KEY))?
        .parse()?;

    EnvironmentContext::new(env_type, system_name, tree)
}
