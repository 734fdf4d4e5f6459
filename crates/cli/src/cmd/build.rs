//! Implementation of the `kiln build` command.
//!
//! Runs the Provisioner against a build root. Any step failure aborts the
//! run with a non-zero exit and no manifest; a successful run prints a
//! summary and the manifest location.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use kiln_core::{ProvisionOptions, Provisioner, Recipe};

use crate::output;

pub fn cmd_build(
  recipe_path: &Path,
  root: &Path,
  force: bool,
  shell: Option<String>,
) -> Result<()> {
  let recipe = Recipe::load(recipe_path)
    .with_context(|| format!("failed to load recipe {}", recipe_path.display()))?;

  output::print_info(&format!(
    "Provisioning {} against {}",
    root.display(),
    recipe.base
  ));

  let unit_count = recipe.units.len();
  let provisioner = Provisioner::new(recipe, root, ProvisionOptions { force, shell });

  let rt = tokio::runtime::Runtime::new().context("failed to create async runtime")?;
  let report = rt.block_on(provisioner.run()).context("build failed")?;

  output::print_success(&format!(
    "Build complete in {}",
    output::format_duration(report.duration)
  ));
  output::print_stat("Units", &unit_count.to_string());
  output::print_stat("Steps", &report.steps.len().to_string());
  if let Some(path) = &report.manifest_path {
    output::print_stat("Manifest", &path.display().to_string());
    info!(path = %path.display(), "manifest written");
  }

  Ok(())
}
