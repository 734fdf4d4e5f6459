//! Host platform snapshot, used by `kiln info`.

use serde::Serialize;

/// A snapshot of the host kiln is running on.
#[derive(Debug, Clone, Serialize)]
pub struct Platform {
  pub os: &'static str,
  pub arch: &'static str,
  pub hostname: String,
  pub username: String,
}

impl Platform {
  /// Probe the current host.
  pub fn detect() -> Self {
    Self {
      os: std::env::consts::OS,
      arch: std::env::consts::ARCH,
      hostname: whoami::fallible::hostname().unwrap_or_else(|_| "unknown".to_string()),
      username: whoami::username(),
    }
  }
}

impl std::fmt::Display for Platform {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}-{}", self.arch, self.os)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn detect_does_not_panic() {
    let platform = Platform::detect();
    assert!(!platform.os.is_empty());
    assert!(!platform.arch.is_empty());
  }

  #[test]
  fn display_is_arch_dash_os() {
    let platform = Platform::detect();
    let display = platform.to_string();
    assert!(display.contains('-'));
    assert!(display.ends_with(platform.os));
  }
}
