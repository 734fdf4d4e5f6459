//! Error types for kiln-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating a recipe.
#[derive(Debug, Error)]
pub enum RecipeError {
  /// Recipe file could not be read.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// Recipe file is not valid TOML or does not match the schema.
  #[error("recipe parse error: {0}")]
  Parse(#[from] toml::de::Error),

  /// Recipe declares no build units.
  #[error("recipe has no build units")]
  NoUnits,

  /// A build unit declares no steps.
  #[error("unit '{0}' has no steps")]
  EmptyUnit(String),

  /// Two build units share a name.
  #[error("duplicate unit name: '{0}'")]
  DuplicateUnit(String),

  /// A packages step names no packages.
  #[error("unit '{0}' has a packages step with no names")]
  EmptyPackageSet(String),

  /// A step references a symlink alias that only a later step creates.
  #[error("step {step} in unit '{unit}' references '{alias}' before the symlink that creates it")]
  LinkOrdering {
    unit: String,
    step: usize,
    alias: String,
  },

  /// Entrypoint executables are image paths and must be absolute.
  #[error("entrypoint exec must be an absolute path: '{0}'")]
  RelativeEntrypoint(String),
}

/// Errors raised while fetching or unpacking a remote artifact.
#[derive(Debug, Error)]
pub enum FetchError {
  /// The HTTP request failed or returned a non-success status.
  #[error("fetch failed for {url}: {message}")]
  Failed { url: String, message: String },

  /// Downloaded bytes did not match the declared SHA-256.
  #[error("hash mismatch for {url}: expected {expected}, got {actual}")]
  HashMismatch {
    url: String,
    expected: String,
    actual: String,
  },

  /// Archive extension is not one of the supported tar flavors.
  #[error("unsupported archive format: {0}")]
  UnsupportedArchive(String),

  /// I/O error while writing or unpacking the artifact.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Failure of a single step's underlying operation.
#[derive(Debug, Error)]
pub enum StepError {
  /// Shell command exited non-zero.
  #[error("command exited with code {code:?}: {cmd}")]
  CommandFailed { cmd: String, code: Option<i32> },

  /// Artifact download or unpack failed.
  #[error(transparent)]
  Fetch(#[from] FetchError),

  /// Copy step source does not exist.
  #[error("copy source does not exist: {0}")]
  CopySourceMissing(PathBuf),

  /// I/O error during a native filesystem operation.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Errors raised by a provisioning run.
#[derive(Debug, Error)]
pub enum ProvisionError {
  /// A step failed; the whole run aborts with no manifest written.
  #[error("step {step} in unit '{unit}' failed: {source}")]
  Step {
    unit: String,
    step: usize,
    #[source]
    source: StepError,
  },

  /// The build root already holds a manifest from a previous run.
  #[error("build root already provisioned: {0} (pass --force to rebuild)")]
  AlreadyProvisioned(PathBuf),

  /// No manifest was found where one was expected.
  #[error("no image manifest found under {0}")]
  ManifestMissing(PathBuf),

  /// I/O error outside any single step (root setup, manifest write).
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// Manifest could not be serialized or deserialized.
  #[error("manifest error: {0}")]
  Manifest(#[from] serde_json::Error),
}
