//! Application root and synthesis
//!
//! The [`App`] owns every stack in the order it was added. Synthesis walks
//! the stacks in that order and rewrites reference tokens:
//!
//! - same stack: `Ref` / `Fn::GetAtt`
//! - earlier stack: `Fn::ImportValue`, plus an exported output on the producer
//! - later or unknown stack: error (the graph must stay acyclic)

use crate::assembly::{CloudAssembly, StackArtifact};
use crate::error::{CloudError, Result};
use crate::stack::Stack;
use crate::token::{Reference, import_value, resolve_tokens};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, info, instrument};

/// Root of the stack graph
#[derive(Debug, Default)]
pub struct App {
    stacks: Vec<Stack>,
}

/// Output a producer stack has to export for later stacks
struct Export {
    name: String,
    value: Value,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fully built stack. Stacks are synthesized in this order.
    pub fn add_stack(&mut self, stack: Stack) {
        info!(
            stack = %stack.name(),
            resources = stack.resources().len(),
            "Stack registered"
        );
        self.stacks.push(stack);
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn stack(&self, name: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.name() == name)
    }

    /// Builds one template per stack and the manifest describing them
    #[instrument(skip(self), fields(stacks = self.stacks.len()))]
    pub fn synth(&self) -> Result<CloudAssembly> {
        let positions = self.stack_positions()?;

        let mut exports: Vec<BTreeMap<String, Export>> =
            self.stacks.iter().map(|_| BTreeMap::new()).collect();
        let mut dependencies: Vec<BTreeSet<String>> =
            self.stacks.iter().map(|_| BTreeSet::new()).collect();
        let mut resources: Vec<Map<String, Value>> = Vec::with_capacity(self.stacks.len());

        for (index, stack) in self.stacks.iter().enumerate() {
            let local_ids: HashSet<&str> = stack
                .resources()
                .iter()
                .map(|r| r.logical_id.as_str())
                .collect();
            let mut rendered = Map::new();

            for resource in stack.resources() {
                let mut resolver = |reference: &Reference| -> Result<Value> {
                    if reference.stack == stack.name() {
                        if !local_ids.contains(reference.logical_id.as_str()) {
                            return Err(CloudError::UnknownResource {
                                stack: stack.name().to_string(),
                                logical_id: resource.logical_id.clone(),
                                referenced: reference.logical_id.clone(),
                            });
                        }
                        return Ok(reference.local_value());
                    }

                    let producer = *positions.get(reference.stack.as_str()).ok_or_else(|| {
                        CloudError::UnknownStack {
                            stack: stack.name().to_string(),
                            referenced: reference.stack.clone(),
                        }
                    })?;
                    if producer >= index {
                        return Err(CloudError::ForwardReference {
                            consumer: stack.name().to_string(),
                            producer: reference.stack.clone(),
                        });
                    }
                    if self.stacks[producer].resource(&reference.logical_id).is_none() {
                        return Err(CloudError::UnknownResource {
                            stack: stack.name().to_string(),
                            logical_id: resource.logical_id.clone(),
                            referenced: format!("{}/{}", reference.stack, reference.logical_id),
                        });
                    }

                    let export_name = reference.export_name();
                    exports[producer]
                        .entry(reference.output_id())
                        .or_insert_with(|| Export {
                            name: export_name.clone(),
                            value: reference.local_value(),
                        });
                    dependencies[index].insert(reference.stack.clone());
                    debug!(
                        consumer = %stack.name(),
                        export = %export_name,
                        "Wiring cross-stack reference"
                    );
                    Ok(import_value(&export_name))
                };

                let properties = resolve_tokens(&resource.properties, &mut resolver)?;

                for dep in &resource.depends_on {
                    if !local_ids.contains(dep.as_str()) {
                        return Err(CloudError::UnknownDependency {
                            stack: stack.name().to_string(),
                            logical_id: resource.logical_id.clone(),
                            depends_on: dep.clone(),
                        });
                    }
                }

                let mut body = Map::new();
                body.insert("Type".to_string(), json!(resource.resource_type));
                if properties.as_object().is_some_and(|p| !p.is_empty()) {
                    body.insert("Properties".to_string(), properties);
                }
                if !resource.depends_on.is_empty() {
                    body.insert("DependsOn".to_string(), json!(resource.depends_on));
                }
                if let Some(policy) = resource.removal_policy {
                    body.insert("DeletionPolicy".to_string(), json!(policy.as_policy()));
                    body.insert("UpdateReplacePolicy".to_string(), json!(policy.as_policy()));
                }
                rendered.insert(resource.logical_id.clone(), Value::Object(body));
            }

            resources.push(rendered);
        }

        let artifacts = self
            .stacks
            .iter()
            .zip(resources)
            .zip(exports.into_iter().zip(dependencies))
            .map(|((stack, resources), (exports, dependencies))| {
                StackArtifact::new(
                    stack,
                    render_template(stack, resources, exports),
                    dependencies.into_iter().collect(),
                )
            })
            .collect::<Vec<_>>();

        info!(artifacts = artifacts.len(), "Synthesis complete");
        Ok(CloudAssembly::new(artifacts))
    }

    /// Stack name → position, rejecting duplicate names
    fn stack_positions(&self) -> Result<HashMap<&str, usize>> {
        let mut positions = HashMap::with_capacity(self.stacks.len());
        for (index, stack) in self.stacks.iter().enumerate() {
            if positions.insert(stack.name(), index).is_some() {
                return Err(CloudError::DuplicateStack(stack.name().to_string()));
            }
        }
        Ok(positions)
    }
}

fn render_template(
    stack: &Stack,
    resources: Map<String, Value>,
    exports: BTreeMap<String, Export>,
) -> Value {
    let mut template = Map::new();
    if let Some(description) = &stack.props().description {
        template.insert("Description".to_string(), json!(description));
    }
    template.insert("Resources".to_string(), Value::Object(resources));

    if !exports.is_empty() {
        let outputs: Map<String, Value> = exports
            .into_iter()
            .map(|(output_id, export)| {
                (
                    output_id,
                    json!({
                        "Value": export.value,
                        "Export": { "Name": export.name }
                    }),
                )
            })
            .collect();
        template.insert("Outputs".to_string(), Value::Object(outputs));
    }

    Value::Object(template)
}
