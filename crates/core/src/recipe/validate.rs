//! Recipe validation.
//!
//! Validation runs before anything touches the filesystem, so a rejected
//! recipe never starts a build. The load-bearing check is link ordering: a
//! symlink alias must exist in the staged filesystem before any step that
//! resolves through it, so a step referencing an alias that only a *later*
//! symlink step creates is an error.

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::RecipeError;
use crate::recipe::{Recipe, Step};

impl Recipe {
  /// Check structural invariants. Called by [`Recipe::parse`].
  pub fn validate(&self) -> Result<(), RecipeError> {
    if self.units.is_empty() {
      return Err(RecipeError::NoUnits);
    }

    let mut names = BTreeSet::new();
    for unit in &self.units {
      if unit.steps.is_empty() {
        return Err(RecipeError::EmptyUnit(unit.name.clone()));
      }
      if !names.insert(unit.name.as_str()) {
        return Err(RecipeError::DuplicateUnit(unit.name.clone()));
      }
      for step in &unit.steps {
        if let Step::Packages { names } = step {
          if names.is_empty() {
            return Err(RecipeError::EmptyPackageSet(unit.name.clone()));
          }
        }
      }
    }

    if !self.entrypoint.exec.is_absolute() {
      return Err(RecipeError::RelativeEntrypoint(
        self.entrypoint.exec.display().to_string(),
      ));
    }

    self.check_link_ordering()
  }

  /// Reject steps that reference a symlink alias before it is created.
  fn check_link_ordering(&self) -> Result<(), RecipeError> {
    // Global declaration order across units: position of every alias.
    let mut aliases: Vec<(usize, &Path)> = Vec::new();
    for (pos, (_, _, step)) in self.indexed_steps().enumerate() {
      if let Step::Symlink { link, .. } = step {
        aliases.push((pos, link.as_path()));
      }
    }

    for (pos, (unit, index, step)) in self.indexed_steps().enumerate() {
      for (link_pos, alias) in &aliases {
        if pos < *link_pos && references_alias(step, alias) {
          return Err(RecipeError::LinkOrdering {
            unit: unit.to_string(),
            step: index,
            alias: alias.display().to_string(),
          });
        }
      }
    }

    Ok(())
  }

  /// Iterate steps in global order, tagged with unit name and step index.
  fn indexed_steps(&self) -> impl Iterator<Item = (&str, usize, &Step)> {
    self
      .units
      .iter()
      .flat_map(|u| u.steps.iter().enumerate().map(|(i, s)| (u.name.as_str(), i, s)))
  }
}

/// Does this step resolve through the given symlink alias?
fn references_alias(step: &Step, alias: &Path) -> bool {
  match step {
    Step::Run { cmd, .. } => cmd.contains(alias.to_string_lossy().as_ref()),
    Step::Fetch { dest, .. } => dest.starts_with(alias),
    Step::Copy { dest, .. } => dest.starts_with(alias),
    Step::Symlink { .. } | Step::Packages { .. } => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn wrap(units: &str) -> String {
    format!(
      r#"
      base = "ubuntu:24.04"
      {units}
      [entrypoint]
      exec = "/bin/true"
      "#
    )
  }

  #[test]
  fn no_units_is_rejected() {
    let text = wrap("");
    assert!(matches!(Recipe::parse(&text), Err(RecipeError::NoUnits)));
  }

  #[test]
  fn empty_unit_is_rejected() {
    let text = r#"
      base = "ubuntu:24.04"

      [[unit]]
      name = "hollow"
      step = []

      [entrypoint]
      exec = "/bin/true"
    "#;
    assert!(matches!(
      Recipe::parse(text),
      Err(RecipeError::EmptyUnit(name)) if name == "hollow"
    ));
  }

  #[test]
  fn duplicate_unit_names_are_rejected() {
    let text = wrap(
      r#"
      [[unit]]
      name = "twice"

      [[unit.step]]
      kind = "run"
      cmd = "echo one"

      [[unit]]
      name = "twice"

      [[unit.step]]
      kind = "run"
      cmd = "echo two"
      "#,
    );
    assert!(matches!(
      Recipe::parse(&text),
      Err(RecipeError::DuplicateUnit(name)) if name == "twice"
    ));
  }

  #[test]
  fn relative_entrypoint_is_rejected() {
    let text = r#"
      base = "ubuntu:24.04"

      [[unit]]
      name = "hello"

      [[unit.step]]
      kind = "run"
      cmd = "echo hello"

      [entrypoint]
      exec = "bin/tool"
    "#;
    assert!(matches!(
      Recipe::parse(text),
      Err(RecipeError::RelativeEntrypoint(_))
    ));
  }

  #[test]
  fn link_created_before_use_is_accepted() {
    let text = wrap(
      r#"
      [[unit]]
      name = "python"

      [[unit.step]]
      kind = "symlink"
      link = "/usr/bin/python3"
      target = "python3.8"

      [[unit.step]]
      kind = "run"
      cmd = "/usr/bin/python3 --version"
      "#,
    );
    assert!(Recipe::parse(&text).is_ok());
  }

  #[test]
  fn link_used_before_creation_is_rejected() {
    let text = wrap(
      r#"
      [[unit]]
      name = "python"

      [[unit.step]]
      kind = "run"
      cmd = "/usr/bin/python3 --version"

      [[unit.step]]
      kind = "symlink"
      link = "/usr/bin/python3"
      target = "python3.8"
      "#,
    );
    assert!(matches!(
      Recipe::parse(&text),
      Err(RecipeError::LinkOrdering { unit, step: 0, .. }) if unit == "python"
    ));
  }

  #[test]
  fn link_ordering_is_checked_across_units() {
    let text = wrap(
      r#"
      [[unit]]
      name = "bootstrap"

      [[unit.step]]
      kind = "fetch"
      url = "https://example.com/get-pip.py"
      dest = "/usr/bin/python3/get-pip.py"

      [[unit]]
      name = "python"

      [[unit.step]]
      kind = "symlink"
      link = "/usr/bin/python3"
      target = "python3.8"
      "#,
    );
    assert!(matches!(
      Recipe::parse(&text),
      Err(RecipeError::LinkOrdering { unit, .. }) if unit == "bootstrap"
    ));
  }

  #[test]
  fn empty_package_set_is_rejected() {
    let text = wrap(
      r#"
      [[unit]]
      name = "pkgs"

      [[unit.step]]
      kind = "packages"
      names = []
      "#,
    );
    assert!(matches!(
      Recipe::parse(&text),
      Err(RecipeError::EmptyPackageSet(_))
    ));
  }
}
