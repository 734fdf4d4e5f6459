//! Image manifest: metadata recorded after a fully successful run.
//!
//! The manifest is the only artifact that outlives the build: the base
//! image identifier, the installed package set (sorted, order-independent),
//! the entrypoint spec, and a creation timestamp. It is what `kiln run`
//! consumes to start the provisioned image.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProvisionError;
use crate::recipe::{EntrypointSpec, Recipe};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageManifest {
  /// Base image the root was provisioned against.
  pub base: String,

  /// Every package the recipe installed, as a sorted set.
  pub packages: BTreeSet<String>,

  /// Default process of the produced image.
  pub entrypoint: EntrypointSpec,

  /// When the manifest was written.
  pub created_at: DateTime<Utc>,
}

impl ImageManifest {
  /// Directory under the build root holding kiln state.
  pub const STATE_DIR: &'static str = ".kiln";

  const MANIFEST_FILE: &'static str = "manifest.json";

  /// Manifest location for a given build root.
  pub fn path(root: &Path) -> PathBuf {
    root.join(Self::STATE_DIR).join(Self::MANIFEST_FILE)
  }

  /// Build the manifest a successful run of this recipe would record.
  pub fn from_recipe(recipe: &Recipe) -> Self {
    Self {
      base: recipe.base.clone(),
      packages: recipe.package_set(),
      entrypoint: recipe.entrypoint.clone(),
      created_at: Utc::now(),
    }
  }

  /// Write the manifest under the build root. Returns the manifest path.
  pub fn write(&self, root: &Path) -> Result<PathBuf, ProvisionError> {
    let path = Self::path(root);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
    debug!(path = %path.display(), "manifest written");
    Ok(path)
  }

  /// Load the manifest of a previously provisioned root.
  pub fn load(root: &Path) -> Result<Self, ProvisionError> {
    let path = Self::path(root);
    if !path.exists() {
      return Err(ProvisionError::ManifestMissing(root.to_path_buf()));
    }
    let text = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&text)?)
  }

  /// Resolve the command the image runs.
  ///
  /// Overrides replace the default arguments, they never append: an empty
  /// override list yields `exec` plus the declared defaults, anything else
  /// yields `exec` plus exactly the overrides.
  pub fn resolve_command(&self, overrides: &[String]) -> Vec<String> {
    let mut command = vec![self.entrypoint.exec.display().to_string()];
    if overrides.is_empty() {
      command.extend(self.entrypoint.args.iter().cloned());
    } else {
      command.extend(overrides.iter().cloned());
    }
    command
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::recipe::Recipe;
  use tempfile::TempDir;

  const RECIPE: &str = r#"
    base = "ubuntu:20.04"

    [[unit]]
    name = "runtime"

    [[unit.step]]
    kind = "packages"
    names = ["python3.8", "ca-certificates", "curl"]

    [entrypoint]
    exec = "/usr/local/bin/trader"
    args = ["--mode", "paper"]
  "#;

  #[test]
  fn default_args_are_used_without_overrides() {
    let manifest = ImageManifest::from_recipe(&Recipe::parse(RECIPE).unwrap());

    assert_eq!(
      manifest.resolve_command(&[]),
      vec!["/usr/local/bin/trader", "--mode", "paper"]
    );
  }

  #[test]
  fn overrides_replace_defaults_entirely() {
    let manifest = ImageManifest::from_recipe(&Recipe::parse(RECIPE).unwrap());

    let command = manifest.resolve_command(&["--help".to_string()]);

    assert_eq!(command, vec!["/usr/local/bin/trader", "--help"]);
    assert!(!command.contains(&"--mode".to_string()));
  }

  #[test]
  fn package_set_is_sorted_and_reproducible() {
    let a = ImageManifest::from_recipe(&Recipe::parse(RECIPE).unwrap());
    let b = ImageManifest::from_recipe(&Recipe::parse(RECIPE).unwrap());

    assert_eq!(a.packages, b.packages);
    let ordered: Vec<_> = a.packages.iter().cloned().collect();
    assert_eq!(ordered, vec!["ca-certificates", "curl", "python3.8"]);
  }

  #[test]
  fn write_then_load_preserves_entrypoint() {
    let temp = TempDir::new().unwrap();
    let manifest = ImageManifest::from_recipe(&Recipe::parse(RECIPE).unwrap());

    manifest.write(temp.path()).unwrap();
    let loaded = ImageManifest::load(temp.path()).unwrap();

    assert_eq!(loaded, manifest);
  }

  #[test]
  fn load_without_manifest_is_an_error() {
    let temp = TempDir::new().unwrap();

    let err = ImageManifest::load(temp.path()).unwrap_err();

    assert!(matches!(err, ProvisionError::ManifestMissing(_)));
  }
}
