mod commands;
mod project;

use clap::{Parser, Subcommand};
use colored::Colorize;
use project::GlobalArgs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stackflow")]
#[command(about = "Declare cloud stacks, synthesize deployment templates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (stackflow.kdl or cdk.json style JSON)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Context override, repeatable (systemName=..., envType=...)
    #[arg(short = 'c', long = "context", global = true, value_name = "KEY=VALUE")]
    context: Vec<String>,

    /// Environment to build (test, dev, stage, prod)
    #[arg(long, global = true, env = "STACKFLOW_ENV_TYPE")]
    env_type: Option<String>,

    /// System name used as the prefix of every stack and resource name
    #[arg(long, global = true, env = "STACKFLOW_SYSTEM_NAME")]
    system_name: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize templates and write the cloud assembly
    Synth {
        /// Stack to print (qualified name or local id); all stacks if omitted
        stack: Option<String>,
        /// Assembly output directory
        #[arg(short, long, default_value = "stackflow.out")]
        output: PathBuf,
        /// Print JSON instead of YAML
        #[arg(long)]
        json: bool,
        /// Do not print templates
        #[arg(short, long)]
        quiet: bool,
    },
    /// List stacks in build order
    #[command(alias = "ls")]
    List,
    /// Validate configuration and the stack graph
    Validate,
    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so synthesized templates on stdout stay clean.
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "✗ Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if matches!(cli.command, Commands::Version) {
        println!("stackflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let args = GlobalArgs {
        config: cli.config,
        context: cli.context,
        env_type: cli.env_type,
        system_name: cli.system_name,
    };

    match cli.command {
        Commands::Synth {
            stack,
            output,
            json,
            quiet,
        } => commands::synth::handle(&args, stack.as_deref(), &output, json, quiet),
        Commands::List => commands::list::handle(&args),
        Commands::Validate => commands::validate::handle(&args),
        Commands::Version => unreachable!("Version is handled before config loading"),
    }
}
