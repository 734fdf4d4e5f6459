use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

/// kiln - recipe-driven image provisioner
#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Show the invocations a recipe would execute, without running anything
  Plan {
    /// Path to the recipe file
    recipe: PathBuf,
  },

  /// Provision a build root from a recipe
  Build {
    /// Path to the recipe file
    recipe: PathBuf,

    /// Build root directory
    #[arg(long, default_value = "build-root")]
    root: PathBuf,

    /// Rebuild a root that already holds a manifest
    #[arg(long)]
    force: bool,

    /// Shell to run command steps with (default: /bin/sh)
    #[arg(long)]
    shell: Option<String>,
  },

  /// Resolve and launch a provisioned image's entrypoint
  Run {
    /// Build root directory, or a recipe file
    target: PathBuf,

    /// Print the resolved command instead of executing it
    #[arg(long)]
    print: bool,

    /// Arguments replacing the entrypoint defaults
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
  },

  /// Show host platform and version information
  Info,
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  let cli = Cli::parse();

  let result: Result<()> = match cli.command {
    Commands::Plan { recipe } => cmd::cmd_plan(&recipe),
    Commands::Build { recipe, root, force, shell } => cmd::cmd_build(&recipe, &root, force, shell),
    Commands::Run { target, print, args } => cmd::cmd_run(&target, print, &args),
    Commands::Info => cmd::cmd_info(),
  };

  if let Err(err) = result {
    output::print_error(&format!("{:#}", err));
    std::process::exit(1);
  }
}
