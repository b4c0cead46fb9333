use crate::project::{self, GlobalArgs};
use anyhow::Context;
use colored::Colorize;

pub fn handle(args: &GlobalArgs) -> anyhow::Result<()> {
    println!("{}", "Validating configuration...".blue());

    let project = project::load(args)?;
    println!(
        "Configuration: {}",
        project.config_path.display().to_string().cyan()
    );

    let assembly = project
        .deployment
        .synth()
        .context("Stack graph does not synthesize")?;

    let context = &project.context;
    println!("{}", "✓ Configuration is valid".green().bold());
    println!();
    println!("Summary:");
    println!("  System: {}", context.system_name().cyan());
    println!("  Environment: {}", context.env_type().to_string().cyan());
    println!("  VPC: {}", context.vpc_id());
    println!("  Subnets: {}", context.subnet_ids().join(", "));
    println!("  Stacks: {}", assembly.stacks().len());
    for artifact in assembly.stacks() {
        let protection = if artifact.termination_protection {
            ", termination protection"
        } else {
            ""
        };
        println!(
            "    - {} ({} resources{})",
            artifact.stack_name.cyan(),
            artifact.resource_count(),
            protection
        );
    }

    Ok(())
}
