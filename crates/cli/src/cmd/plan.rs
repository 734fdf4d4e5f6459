//! Implementation of the `kiln plan` command.
//!
//! Lowering is pure, so the plan is exactly what `kiln build` would
//! execute. Nothing here touches the filesystem beyond reading the recipe.

use std::path::Path;

use anyhow::{Context, Result};

use kiln_core::Recipe;
use kiln_core::lower::lower_unit;

use crate::output;

/// Print every invocation the recipe would execute, grouped by unit.
pub fn cmd_plan(recipe_path: &Path) -> Result<()> {
  let recipe = Recipe::load(recipe_path)
    .with_context(|| format!("failed to load recipe {}", recipe_path.display()))?;

  output::print_info(&format!("Base image: {}", recipe.base));
  println!();

  let mut total = 0;
  for unit in &recipe.units {
    println!("unit {}", unit.name);
    for invocation in lower_unit(unit) {
      output::print_step(&invocation.describe());
      total += 1;
    }
    println!();
  }

  let entrypoint = &recipe.entrypoint;
  output::print_stat("Entrypoint", &entrypoint.exec.display().to_string());
  if !entrypoint.args.is_empty() {
    output::print_stat("Default args", &entrypoint.args.join(" "));
  }
  println!();

  output::print_info(&format!(
    "Would execute {} invocation(s) across {} unit(s)",
    total,
    recipe.units.len()
  ));

  Ok(())
}
