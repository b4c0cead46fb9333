//! Configuration loading shared by the commands

use anyhow::Context;
use stackflow_core::{ContextOverrides, Environment, EnvironmentContext};
use stackflow_stacks::{Deployment, deploy_env};
use std::path::PathBuf;

pub const DEFAULT_ACCOUNT_ENV: &str = "STACKFLOW_DEFAULT_ACCOUNT";
pub const DEFAULT_REGION_ENV: &str = "STACKFLOW_DEFAULT_REGION";

/// Options every command shares
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub context: Vec<String>,
    pub env_type: Option<String>,
    pub system_name: Option<String>,
}

/// A resolved configuration and the stack graph built from it
pub struct Project {
    pub config_path: PathBuf,
    pub context: EnvironmentContext,
    pub deployment: Deployment,
}

impl GlobalArgs {
    /// `--system-name`/`--env-type` win over `-c` pairs, which win over the file.
    fn overrides(&self) -> anyhow::Result<ContextOverrides> {
        let from_pairs = ContextOverrides::from_pairs(&self.context)
            .context("Invalid --context value")?;
        Ok(from_pairs.merge(ContextOverrides {
            system_name: self.system_name.clone(),
            env_type: self.env_type.clone(),
        }))
    }
}

pub fn load(args: &GlobalArgs) -> anyhow::Result<Project> {
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => stackflow_config::find_config_file()
            .context("No configuration found (looked for stackflow.kdl, stackflow.json, cdk.json)")?,
    };
    tracing::debug!(path = %config_path.display(), "Loading configuration");

    let tree = stackflow_core::load_context_tree(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let context = stackflow_core::resolve_context(&tree, &args.overrides()?)
        .context("Failed to resolve the environment context")?;

    let env = deploy_env(&context, default_env());
    let deployment =
        Deployment::build(&context, env).context("Failed to build the stack graph")?;

    Ok(Project {
        config_path,
        context,
        deployment,
    })
}

/// Fallback account/region from the process environment
fn default_env() -> Environment {
    Environment {
        account: std::env::var(DEFAULT_ACCOUNT_ENV).ok().filter(|v| !v.is_empty()),
        region: std::env::var(DEFAULT_REGION_ENV).ok().filter(|v| !v.is_empty()),
    }
}
