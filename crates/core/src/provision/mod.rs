//! The Provisioner: sequential fail-fast execution of a recipe.
//!
//! Units run strictly in declared order; every invocation blocks until its
//! underlying operation completes. The first failure aborts the whole run
//! with no retries and no rollback, and no manifest is written, so a failed
//! build never looks like an image. Absolute destination paths are
//! re-rooted under the build root, DESTDIR-style.

pub mod fetch;
pub mod shell;
pub mod unpack;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{ProvisionError, StepError};
use crate::image::ImageManifest;
use crate::lower::{Invocation, lower_step};
use crate::recipe::{Recipe, Step};

/// Options for a provisioning run.
#[derive(Debug, Clone, Default)]
pub struct ProvisionOptions {
  /// Rebuild a root that already holds a manifest.
  pub force: bool,
  /// Shell override for command steps (defaults to `/bin/sh`).
  pub shell: Option<String>,
}

/// Execution phase, derived from the kind of work in flight.
///
/// `Done` and `Failed` are the only terminal phases; there is no branch
/// back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Init,
  Linking,
  PackageInstall,
  ArtifactFetch,
  ArtifactInstall,
  EntrypointFinalize,
  Done,
  Failed,
}

impl Phase {
  fn of_step(step: &Step) -> Self {
    match step {
      Step::Symlink { .. } => Phase::Linking,
      Step::Packages { .. } => Phase::PackageInstall,
      Step::Fetch { .. } => Phase::ArtifactFetch,
      Step::Run { .. } | Step::Copy { .. } => Phase::ArtifactInstall,
    }
  }
}

impl std::fmt::Display for Phase {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Phase::Init => "init",
      Phase::Linking => "linking",
      Phase::PackageInstall => "package-install",
      Phase::ArtifactFetch => "artifact-fetch",
      Phase::ArtifactInstall => "artifact-install",
      Phase::EntrypointFinalize => "entrypoint-finalize",
      Phase::Done => "done",
      Phase::Failed => "failed",
    };
    write!(f, "{}", name)
  }
}

/// Outcome of a single executed step.
#[derive(Debug, Clone)]
pub struct StepReport {
  pub unit: String,
  pub index: usize,
  pub phase: Phase,
  pub detail: String,
  pub duration: Duration,
}

/// Outcome of a full provisioning run.
#[derive(Debug, Default)]
pub struct ProvisionReport {
  pub steps: Vec<StepReport>,
  pub manifest_path: Option<PathBuf>,
  pub duration: Duration,
}

/// Executes a recipe against a build root.
pub struct Provisioner {
  recipe: Recipe,
  root: PathBuf,
  options: ProvisionOptions,
}

impl Provisioner {
  pub fn new(recipe: Recipe, root: impl Into<PathBuf>, options: ProvisionOptions) -> Self {
    Self {
      recipe,
      root: root.into(),
      options,
    }
  }

  /// Run every unit in order. Returns the report on full success.
  pub async fn run(&self) -> Result<ProvisionReport, ProvisionError> {
    let started = Instant::now();

    let manifest_path = ImageManifest::path(&self.root);
    if manifest_path.exists() {
      if !self.options.force {
        return Err(ProvisionError::AlreadyProvisioned(self.root.clone()));
      }
      warn!(root = %self.root.display(), "discarding previous manifest");
      std::fs::remove_dir_all(self.root.join(ImageManifest::STATE_DIR))?;
    }
    std::fs::create_dir_all(&self.root)?;

    let mut report = ProvisionReport::default();
    let mut phase = Phase::Init;

    for unit in &self.recipe.units {
      info!(unit = %unit.name, "entering unit");
      for (index, step) in unit.steps.iter().enumerate() {
        let step_phase = Phase::of_step(step);
        if step_phase != phase {
          info!(phase = %step_phase, "phase transition");
          phase = step_phase;
        }

        let step_started = Instant::now();
        let detail = self
          .execute_step(step)
          .await
          .map_err(|source| ProvisionError::Step {
            unit: unit.name.clone(),
            step: index,
            source,
          })?;

        report.steps.push(StepReport {
          unit: unit.name.clone(),
          index,
          phase: step_phase,
          detail,
          duration: step_started.elapsed(),
        });
      }
    }

    info!(phase = %Phase::EntrypointFinalize, "phase transition");
    let manifest = ImageManifest::from_recipe(&self.recipe);
    report.manifest_path = Some(manifest.write(&self.root)?);
    report.duration = started.elapsed();

    info!(phase = %Phase::Done, steps = report.steps.len(), "provisioning complete");
    Ok(report)
  }

  async fn execute_step(&self, step: &Step) -> Result<String, StepError> {
    let invocations = lower_step(step);
    let mut details = Vec::with_capacity(invocations.len());
    for invocation in &invocations {
      debug!(invocation = %invocation.describe(), "executing invocation");
      self.execute_invocation(invocation).await?;
      details.push(invocation.describe());
    }
    Ok(details.join("; "))
  }

  async fn execute_invocation(&self, invocation: &Invocation) -> Result<(), StepError> {
    match invocation {
      Invocation::Shell { cmd, cwd } => {
        let staged_cwd = cwd.as_deref().map(|p| self.stage(p));
        shell::run_shell(
          cmd,
          &self.recipe.env,
          staged_cwd.as_deref(),
          &self.root,
          self.options.shell.as_deref(),
        )
        .await?;
        Ok(())
      }

      Invocation::Link { link, target } => {
        let staged = self.stage(link);
        if let Some(parent) = staged.parent() {
          std::fs::create_dir_all(parent)?;
        }
        make_symlink(target, &staged)?;
        Ok(())
      }

      Invocation::FetchFile { url, dest, sha256, executable, unpack } => {
        if *unpack {
          // Land the archive next to the manifest state, then unpack into
          // the staged destination directory.
          let archive = self
            .root
            .join(ImageManifest::STATE_DIR)
            .join("fetch")
            .join(artifact_filename(url));
          fetch::fetch_url(url, &archive, sha256.as_deref()).await?;
          unpack::unpack_archive(&archive, &self.stage(dest))?;
        } else {
          let staged = self.stage(dest);
          fetch::fetch_url(url, &staged, sha256.as_deref()).await?;
          if *executable {
            fetch::mark_executable(&staged)?;
          }
        }
        Ok(())
      }

      Invocation::CopyTree { source, dest } => copy_tree(source, &self.stage(dest)),
    }
  }

  /// Map an image path onto the build root (DESTDIR-style staging).
  fn stage(&self, path: &Path) -> PathBuf {
    match path.strip_prefix("/") {
      Ok(relative) => self.root.join(relative),
      Err(_) => self.root.join(path),
    }
  }
}

/// Create a symlink, preserving a relative target as-is.
fn make_symlink(target: &Path, link: &Path) -> Result<(), StepError> {
  #[cfg(unix)]
  std::os::unix::fs::symlink(target, link)?;

  #[cfg(windows)]
  std::os::windows::fs::symlink_file(target, link)?;

  Ok(())
}

/// Copy a local tree into the staged destination.
fn copy_tree(source: &Path, dest: &Path) -> Result<(), StepError> {
  if !source.exists() {
    return Err(StepError::CopySourceMissing(source.to_path_buf()));
  }

  for entry in walkdir::WalkDir::new(source) {
    let entry = entry.map_err(std::io::Error::other)?;
    let relative = entry
      .path()
      .strip_prefix(source)
      .map_err(std::io::Error::other)?;
    let target = dest.join(relative);

    let file_type = entry.file_type();
    if file_type.is_dir() {
      std::fs::create_dir_all(&target)?;
    } else if file_type.is_symlink() {
      let link_target = std::fs::read_link(entry.path())?;
      if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
      }
      make_symlink(&link_target, &target)?;
    } else {
      if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
      }
      std::fs::copy(entry.path(), &target)?;
    }
  }

  Ok(())
}

/// Derive a filename for a fetched artifact from its URL.
fn artifact_filename(url: &str) -> String {
  url
    .rsplit('/')
    .next()
    .map(|name| name.split('?').next().unwrap_or(name))
    .filter(|name| !name.is_empty())
    .unwrap_or("artifact")
    .to_string()
}
