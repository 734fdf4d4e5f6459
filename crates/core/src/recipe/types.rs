//! Recipe types and parsing.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RecipeError;

/// A complete image build recipe.
///
/// Uses `BTreeMap` for the environment table so serialization order is
/// deterministic, which keeps manifests reproducible across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
  /// Base image identifier the recipe provisions against (e.g. `ubuntu:24.04`).
  pub base: String,

  /// Build-time environment merged into every shell step.
  #[serde(default)]
  pub env: BTreeMap<String, String>,

  /// Ordered build units, executed exactly as declared.
  #[serde(default, rename = "unit")]
  pub units: Vec<BuildUnit>,

  /// The process the produced image runs by default.
  pub entrypoint: EntrypointSpec,
}

impl Recipe {
  /// Load and validate a recipe from a TOML file.
  pub fn load(path: &Path) -> Result<Self, RecipeError> {
    debug!(path = %path.display(), "loading recipe");
    let text = std::fs::read_to_string(path)?;
    Self::parse(&text)
  }

  /// Parse and validate a recipe from TOML text.
  pub fn parse(text: &str) -> Result<Self, RecipeError> {
    let mut recipe: Recipe = toml::from_str(text)?;
    recipe.normalize();
    recipe.validate()?;
    Ok(recipe)
  }

  /// Collapse duplicate package names within each packages step.
  ///
  /// Duplicates are declared no-ops: first occurrence wins, order of the
  /// survivors is preserved.
  fn normalize(&mut self) {
    for unit in &mut self.units {
      for step in &mut unit.steps {
        if let Step::Packages { names } = step {
          let mut seen = BTreeSet::new();
          names.retain(|name| seen.insert(name.clone()));
        }
      }
    }
  }

  /// The union of all packages the recipe installs, as an ordered set.
  pub fn package_set(&self) -> BTreeSet<String> {
    self
      .units
      .iter()
      .flat_map(|u| u.steps.iter())
      .filter_map(|s| match s {
        Step::Packages { names } => Some(names.iter().cloned()),
        _ => None,
      })
      .flatten()
      .collect()
  }

  /// Total number of steps across all units.
  pub fn step_count(&self) -> usize {
    self.units.iter().map(|u| u.steps.len()).sum()
  }
}

/// A named group of steps treated as one atomic failure domain.
///
/// A failure inside a unit aborts the entire run; no partial-success state
/// is recorded in the image manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildUnit {
  /// Unit name, unique within the recipe.
  pub name: String,

  /// Steps in execution order.
  #[serde(rename = "step")]
  pub steps: Vec<Step>,
}

/// A single typed provisioning step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
  /// Create a symlink alias in the staged filesystem.
  Symlink { link: PathBuf, target: PathBuf },

  /// Install OS packages. Duplicate names collapse; final installed-set
  /// equality is order-independent.
  Packages { names: Vec<String> },

  /// Download a remote artifact to a staged path. Fetched once per build,
  /// failure is fatal, no retries.
  Fetch {
    url: String,
    dest: PathBuf,
    /// Expected SHA-256 of the downloaded bytes (lowercase hex).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sha256: Option<String>,
    /// Mark the downloaded file executable.
    #[serde(default)]
    executable: bool,
    /// Unpack the artifact (tar / tar.gz) into its destination directory.
    #[serde(default)]
    unpack: bool,
  },

  /// Run a shell command with the recipe environment merged over a
  /// scrubbed base environment.
  Run {
    cmd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cwd: Option<PathBuf>,
  },

  /// Copy a local source tree wholesale into the staged filesystem.
  Copy { source: PathBuf, dest: PathBuf },
}

/// The process a produced image runs by default.
///
/// Default arguments are overridable at container-run time: overrides
/// replace the defaults, they never append to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrypointSpec {
  /// Absolute path of the executable inside the image.
  pub exec: PathBuf,

  /// Default arguments.
  #[serde(default)]
  pub args: Vec<String>,
}
