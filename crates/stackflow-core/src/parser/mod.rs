//! KDL parser
//!
//! Parses `stackflow.kdl` into a [`ContextTree`]:
//!
//! ```kdl
//! system-name "myCdk"
//! env-type "dev"
//! environment "dev" {
//!     vpc-id "vpc-0123"
//!     subnet-ids "subnet-a" "subnet-b"
//!     route-table-id "rtb-0123"
//!     account "123456789012"
//!     region "ap-northeast-1"
//! }
//! ```

mod environment;

use environment::parse_environment;

use crate::context::ContextTree;
use crate::error::Result;
use kdl::{KdlDocument, KdlNode};
use std::fs;
use std::path::Path;

/// Parses a KDL file into a context tree
pub fn parse_kdl_file<P: AsRef<Path>>(path: P) -> Result<ContextTree> {
    let content = fs::read_to_string(path.as_ref())?;
    parse_kdl_string(&content)
}

/// Parses a KDL string into a context tree
pub fn parse_kdl_string(content: &str) -> Result<ContextTree> {
    let doc: KdlDocument = content.parse()?;
    let mut tree = ContextTree::new();

    for node in doc.nodes() {
        match node.name().value() {
            "system-name" | "system_name" | "systemName" => {
                tree.system_name = first_string(node);
            }
            "env-type" | "env_type" | "envType" => {
                tree.env_type = first_string(node);
            }
            "environment" => {
                let (env_name, entry) = parse_environment(node)?;
                tree.insert_entry(env_name, entry);
            }
            other => {
                tracing::debug!(node = other, "Skipping unknown node");
            }
        }
    }

    Ok(tree)
}

/// First positional argument of a node as a string
pub(crate) fn first_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// All positional string arguments of a node
pub(crate) fn string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string().map(|s| s.to_string()))
        .collect()
}

#[cfg(test)]
mod tests;
