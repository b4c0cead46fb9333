//! StackFlow core
//!
//! Resolves the deployment environment a stack graph is built for and
//! provides the naming rule shared by every stack.
//!
//! The configuration tree is read from either a `stackflow.kdl` file or a
//! `cdk.json`-style JSON context object. Both produce a [`ContextTree`],
//! from which exactly one [`EnvironmentContext`] is resolved per process.

pub mod context;
pub mod error;
pub mod loader;
pub mod naming;
pub mod parser;

pub use context::{ContextEntry, ContextTree, EnvType, Environment, EnvironmentContext};
pub use error::{ContextError, Result};
pub use loader::{ContextOverrides, load_context_tree, resolve_context};
pub use naming::{COMMON_NAMESPACE, create_resource_name};
pub use parser::{parse_kdl_file, parse_kdl_string};
