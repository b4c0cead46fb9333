use crate::project::{self, GlobalArgs};
use anyhow::Context;
use colored::Colorize;
use stackflow_cloud::{CloudAssembly, StackArtifact};
use std::path::Path;

pub fn handle(
    args: &GlobalArgs,
    stack: Option<&str>,
    output: &Path,
    json: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let project = project::load(args)?;
    let assembly = project.deployment.synth().context("Synthesis failed")?;

    let selected = select_stacks(&assembly, stack)?;

    assembly
        .write(output)
        .with_context(|| format!("Failed to write assembly to {}", output.display()))?;

    if !quiet {
        for (index, artifact) in selected.iter().enumerate() {
            if json {
                println!("{}", artifact.to_json_pretty()?);
            } else {
                if index > 0 {
                    println!("---");
                }
                print!("{}", artifact.to_yaml()?);
            }
        }
    }

    eprintln!(
        "{} {} stack(s) synthesized to {}",
        "✓".green().bold(),
        assembly.stacks().len(),
        output.display().to_string().cyan()
    );
    Ok(())
}

/// Every stack, or the one named by its qualified name or local id
fn select_stacks<'a>(
    assembly: &'a CloudAssembly,
    name: Option<&str>,
) -> anyhow::Result<Vec<&'a StackArtifact>> {
    let Some(name) = name else {
        return Ok(assembly.stacks().iter().collect());
    };

    if let Some(artifact) = assembly.stack(name) {
        return Ok(vec![artifact]);
    }

    let suffix = format!("-{}", name);
    let matches: Vec<&StackArtifact> = assembly
        .stacks()
        .iter()
        .filter(|s| s.stack_name.ends_with(&suffix))
        .collect();

    match matches.len() {
        1 => Ok(matches),
        0 => anyhow::bail!(
            "Stack '{}' not found. Available: {}",
            name,
            stack_names(assembly)
        ),
        _ => anyhow::bail!(
            "Stack id '{}' is ambiguous; use one of: {}",
            name,
            matches
                .iter()
                .map(|s| s.stack_name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn stack_names(assembly: &CloudAssembly) -> String {
    assembly
        .stacks()
        .iter()
        .map(|s| s.stack_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
