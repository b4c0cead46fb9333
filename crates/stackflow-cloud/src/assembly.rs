//! Cloud assembly
//!
//! The synthesized output handed to the provisioning engine: one
//! `<stack>.template.json` per stack and a `manifest.json` describing the
//! stacks, their target environments and their dependencies.

use crate::error::Result;
use crate::stack::Stack;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const MANIFEST_VERSION: &str = "1";
const MANIFEST_FILE: &str = "manifest.json";
const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";
const UNKNOWN_ACCOUNT: &str = "unknown-account";
const UNKNOWN_REGION: &str = "unknown-region";

/// Synthesized template of one stack
#[derive(Debug, Clone)]
pub struct StackArtifact {
    pub stack_name: String,
    pub template: Value,
    /// `aws://{account}/{region}`
    pub environment: String,
    pub termination_protection: bool,
    /// Stacks this one imports values from
    pub dependencies: Vec<String>,
}

impl StackArtifact {
    pub(crate) fn new(stack: &Stack, template: Value, dependencies: Vec<String>) -> Self {
        let env = stack.props().env.as_ref();
        let account = env
            .and_then(|e| e.account.as_deref())
            .unwrap_or(UNKNOWN_ACCOUNT);
        let region = env
            .and_then(|e| e.region.as_deref())
            .unwrap_or(UNKNOWN_REGION);

        Self {
            stack_name: stack.name().to_string(),
            template,
            environment: format!("aws://{}/{}", account, region),
            termination_protection: stack.props().termination_protection,
            dependencies,
        }
    }

    pub fn template_file(&self) -> String {
        format!("{}.template.json", self.stack_name)
    }

    /// Rendered resource by logical id
    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.template.get("Resources")?.get(logical_id)
    }

    /// Rendered resources of one type, as (logical id, body) pairs
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<(&str, &Value)> {
        self.template
            .get("Resources")
            .and_then(|r| r.as_object())
            .map(|resources| {
                resources
                    .iter()
                    .filter(|(_, body)| body["Type"] == resource_type)
                    .map(|(id, body)| (id.as_str(), body))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn resource_count(&self) -> usize {
        self.template
            .get("Resources")
            .and_then(|r| r.as_object())
            .map_or(0, |r| r.len())
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.template)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.template)?)
    }
}

/// `manifest.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub artifacts: BTreeMap<String, ArtifactManifest>,
}

/// Manifest entry for one stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub environment: String,
    pub properties: ArtifactProperties,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactProperties {
    pub template_file: String,
    pub stack_name: String,
    #[serde(default)]
    pub termination_protection: bool,
}

/// All synthesized stacks, in build order
#[derive(Debug, Clone)]
pub struct CloudAssembly {
    stacks: Vec<StackArtifact>,
}

impl CloudAssembly {
    pub(crate) fn new(stacks: Vec<StackArtifact>) -> Self {
        Self { stacks }
    }

    pub fn stacks(&self) -> &[StackArtifact] {
        &self.stacks
    }

    pub fn stack(&self, name: &str) -> Option<&StackArtifact> {
        self.stacks.iter().find(|s| s.stack_name == name)
    }

    pub fn manifest(&self) -> Manifest {
        let artifacts = self
            .stacks
            .iter()
            .map(|artifact| {
                (
                    artifact.stack_name.clone(),
                    ArtifactManifest {
                        artifact_type: STACK_ARTIFACT_TYPE.to_string(),
                        environment: artifact.environment.clone(),
                        properties: ArtifactProperties {
                            template_file: artifact.template_file(),
                            stack_name: artifact.stack_name.clone(),
                            termination_protection: artifact.termination_protection,
                        },
                        dependencies: artifact.dependencies.clone(),
                    },
                )
            })
            .collect();

        Manifest {
            version: MANIFEST_VERSION.to_string(),
            artifacts,
        }
    }

    /// Writes every template and the manifest into `out_dir`
    pub fn write(&self, out_dir: &Path) -> Result<()> {
        if !out_dir.exists() {
            fs::create_dir_all(out_dir)?;
            tracing::debug!("Created assembly directory: {}", out_dir.display());
        }

        for artifact in &self.stacks {
            let path = out_dir.join(artifact.template_file());
            fs::write(&path, artifact.to_json_pretty()?)?;
            tracing::debug!("Wrote {}", path.display());
        }

        let manifest = serde_json::to_string_pretty(&self.manifest())?;
        fs::write(out_dir.join(MANIFEST_FILE), manifest)?;

        tracing::info!(
            stacks = self.stacks.len(),
            out_dir = %out_dir.display(),
            "Cloud assembly written"
        );
        Ok(())
    }
}
