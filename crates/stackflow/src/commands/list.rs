use crate::project::{self, GlobalArgs};
use anyhow::Context;
use colored::Colorize;

pub fn handle(args: &GlobalArgs) -> anyhow::Result<()> {
    let project = project::load(args)?;
    let assembly = project.deployment.synth().context("Synthesis failed")?;

    for artifact in assembly.stacks() {
        if artifact.dependencies.is_empty() {
            println!("{}", artifact.stack_name.cyan());
        } else {
            println!(
                "{} {} {}",
                artifact.stack_name.cyan(),
                "<-".dimmed(),
                artifact.dependencies.join(", ")
            );
        }
    }
    Ok(())
}
