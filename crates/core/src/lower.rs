//! Lowering: translation of recipe steps into executable invocations.
//!
//! Lowering is pure and deterministic, so `kiln plan` output is exactly
//! what `kiln build` will execute. Each step becomes zero or more
//! [`Invocation`]s; the provisioner executes them in order and stops on the
//! first failure.

use std::path::PathBuf;

use crate::recipe::{BuildUnit, Step};

/// A single executable operation produced by lowering a step.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
  /// Run a command through the shell.
  Shell { cmd: String, cwd: Option<PathBuf> },

  /// Create a symlink in the staged filesystem.
  Link { link: PathBuf, target: PathBuf },

  /// Download a remote artifact.
  FetchFile {
    url: String,
    dest: PathBuf,
    sha256: Option<String>,
    executable: bool,
    unpack: bool,
  },

  /// Copy a local tree into the staged filesystem.
  CopyTree { source: PathBuf, dest: PathBuf },
}

impl Invocation {
  /// One-line human description, used by `kiln plan` and run logs.
  pub fn describe(&self) -> String {
    match self {
      Invocation::Shell { cmd, .. } => format!("sh: {}", cmd),
      Invocation::Link { link, target } => {
        format!("link {} -> {}", link.display(), target.display())
      }
      Invocation::FetchFile { url, dest, unpack, .. } => {
        if *unpack {
          format!("fetch {} -> {} (unpack)", url, dest.display())
        } else {
          format!("fetch {} -> {}", url, dest.display())
        }
      }
      Invocation::CopyTree { source, dest } => {
        format!("copy {} -> {}", source.display(), dest.display())
      }
    }
  }
}

/// Package manager invocations emitted for a packages step.
///
/// The trailing cleanup keeps transient package-manager state out of the
/// final image; it is a size discipline, not a correctness requirement, and
/// is always emitted.
const APT_UPDATE: &str = "apt-get update";
const APT_CLEAN: &str = "apt-get clean";
const APT_PURGE_LISTS: &str = "rm -rf /var/lib/apt/lists/*";

/// Lower a single step.
pub fn lower_step(step: &Step) -> Vec<Invocation> {
  match step {
    Step::Symlink { link, target } => vec![Invocation::Link {
      link: link.clone(),
      target: target.clone(),
    }],

    Step::Packages { names } => {
      let install = format!(
        "apt-get install -y --no-install-recommends {}",
        names.join(" ")
      );
      vec![
        Invocation::Shell { cmd: APT_UPDATE.to_string(), cwd: None },
        Invocation::Shell { cmd: install, cwd: None },
        Invocation::Shell { cmd: APT_CLEAN.to_string(), cwd: None },
        Invocation::Shell { cmd: APT_PURGE_LISTS.to_string(), cwd: None },
      ]
    }

    Step::Fetch { url, dest, sha256, executable, unpack } => vec![Invocation::FetchFile {
      url: url.clone(),
      dest: dest.clone(),
      sha256: sha256.clone(),
      executable: *executable,
      unpack: *unpack,
    }],

    Step::Run { cmd, cwd } => vec![Invocation::Shell {
      cmd: cmd.clone(),
      cwd: cwd.clone(),
    }],

    Step::Copy { source, dest } => vec![Invocation::CopyTree {
      source: source.clone(),
      dest: dest.clone(),
    }],
  }
}

/// Lower every step of a unit, in declared order.
pub fn lower_unit(unit: &BuildUnit) -> Vec<Invocation> {
  unit.steps.iter().flat_map(lower_step).collect()
}
