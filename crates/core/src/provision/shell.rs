//! Shell step execution.
//!
//! Commands run with a scrubbed environment so a build cannot observe the
//! host user's configuration: everything is cleared, a fixed PATH and a
//! minimal locale are set, and the recipe's environment table is merged on
//! top. `KILN_ROOT` points at the build root.

use std::collections::BTreeMap;
use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::StepError;

/// Fixed PATH for build commands. Matches what container base images ship.
const BUILD_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Run a command through the shell against the given build root.
///
/// `cwd` defaults to the build root. Returns trimmed stdout on success.
pub async fn run_shell(
  cmd: &str,
  env: &BTreeMap<String, String>,
  cwd: Option<&Path>,
  root: &Path,
  shell_override: Option<&str>,
) -> Result<String, StepError> {
  info!(cmd = %cmd, "executing shell step");

  let (shell, flag) = shell_for(shell_override);
  let working_dir = cwd.unwrap_or(root);

  let mut command = Command::new(&shell);
  command
    .arg(flag)
    .arg(cmd)
    .current_dir(working_dir)
    .env_clear()
    .env("PATH", BUILD_PATH)
    .env("LANG", "C")
    .env("LC_ALL", "C")
    .env("KILN_ROOT", root);

  for (key, value) in env {
    command.env(key, value);
  }

  debug!(shell = %shell, working_dir = %working_dir.display(), "spawning process");

  let output = command.output().await?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }
    return Err(StepError::CommandFailed {
      cmd: cmd.to_string(),
      code: output.status.code(),
    });
  }

  Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Shell binary and command flag for this platform.
///
/// `/bin/sh` by default rather than the user's `$SHELL`: interactive shells
/// source profile files that would leak host environment into the build.
fn shell_for(shell_override: Option<&str>) -> (String, &'static str) {
  if let Some(shell) = shell_override {
    return (shell.to_string(), "-c");
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), "-c")
  }

  #[cfg(windows)]
  {
    ("cmd.exe".to_string(), "/C")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[tokio::test]
  async fn runs_simple_command() {
    let root = TempDir::new().unwrap();
    let env = BTreeMap::new();

    let out = run_shell("echo hello", &env, None, root.path(), None).await.unwrap();

    assert_eq!(out, "hello");
  }

  #[tokio::test]
  async fn merges_recipe_env() {
    let root = TempDir::new().unwrap();
    let mut env = BTreeMap::new();
    env.insert("FRONTEND".to_string(), "noninteractive".to_string());

    let out = run_shell("echo $FRONTEND", &env, None, root.path(), None).await.unwrap();

    assert_eq!(out, "noninteractive");
  }

  #[tokio::test]
  async fn scrubs_host_env() {
    let root = TempDir::new().unwrap();
    let env = BTreeMap::new();

    // HOME is always set for a host process; a scrubbed build must not see it.
    let out = run_shell("echo ${HOME:-unset}", &env, None, root.path(), None)
      .await
      .unwrap();

    assert_eq!(out, "unset");
  }

  #[tokio::test]
  async fn exposes_build_root() {
    let root = TempDir::new().unwrap();
    let env = BTreeMap::new();

    let out = run_shell("echo $KILN_ROOT", &env, None, root.path(), None).await.unwrap();

    assert_eq!(out, root.path().to_string_lossy());
  }

  #[tokio::test]
  async fn defaults_cwd_to_root() {
    let root = TempDir::new().unwrap();
    let env = BTreeMap::new();

    run_shell("touch marker", &env, None, root.path(), None).await.unwrap();

    assert!(root.path().join("marker").exists());
  }

  #[tokio::test]
  async fn honors_explicit_cwd() {
    let root = TempDir::new().unwrap();
    let sub = root.path().join("sub");
    std::fs::create_dir(&sub).unwrap();
    let env = BTreeMap::new();

    run_shell("touch marker", &env, Some(&sub), root.path(), None).await.unwrap();

    assert!(sub.join("marker").exists());
  }

  #[tokio::test]
  async fn nonzero_exit_is_an_error() {
    let root = TempDir::new().unwrap();
    let env = BTreeMap::new();

    let err = run_shell("exit 3", &env, None, root.path(), None).await.unwrap_err();

    assert!(matches!(err, StepError::CommandFailed { code: Some(3), .. }));
  }

  #[test]
  fn shell_override_is_used() {
    let (shell, flag) = shell_for(Some("/bin/bash"));
    assert_eq!(shell, "/bin/bash");
    assert_eq!(flag, "-c");
  }

  #[test]
  #[cfg(unix)]
  fn default_shell_is_sh() {
    let (shell, flag) = shell_for(None);
    assert_eq!(shell, "/bin/sh");
    assert_eq!(flag, "-c");
  }
}
