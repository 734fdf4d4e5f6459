//! Implementation of the `kiln run` command.
//!
//! Resolves the entrypoint command of a provisioned root (or, for
//! convenience, of a recipe file) and either prints it or executes it.
//! Override arguments replace the entrypoint defaults, they never append.

use std::path::Path;

use anyhow::{Context, Result};

use kiln_core::{ImageManifest, Recipe};

pub fn cmd_run(target: &Path, print: bool, args: &[String]) -> Result<()> {
  let manifest = if target.is_dir() {
    ImageManifest::load(target)
      .with_context(|| format!("failed to load manifest from {}", target.display()))?
  } else {
    let recipe = Recipe::load(target)
      .with_context(|| format!("failed to load recipe {}", target.display()))?;
    ImageManifest::from_recipe(&recipe)
  };

  let command = manifest.resolve_command(args);

  if print {
    println!("{}", command.join(" "));
    return Ok(());
  }

  let status = std::process::Command::new(&command[0])
    .args(&command[1..])
    .status()
    .with_context(|| format!("failed to launch {}", command[0]))?;

  // Propagate the entrypoint's exit status.
  std::process::exit(status.code().unwrap_or(1));
}
