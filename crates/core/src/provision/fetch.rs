//! Remote artifact fetching.
//!
//! Artifacts are retrieved once per build. Any failure (connection, HTTP
//! status, hash mismatch) is fatal to the run; there is no cache and no
//! retry.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::FetchError;

/// Download a URL to `dest`, optionally verifying a SHA-256 hash.
///
/// Parent directories are created as needed. Returns the number of bytes
/// written.
pub async fn fetch_url(
  url: &str,
  dest: &Path,
  expected_sha256: Option<&str>,
) -> Result<u64, FetchError> {
  info!(url = %url, dest = %dest.display(), "fetching artifact");

  let response = reqwest::get(url).await.map_err(|e| FetchError::Failed {
    url: url.to_string(),
    message: e.to_string(),
  })?;

  if !response.status().is_success() {
    return Err(FetchError::Failed {
      url: url.to_string(),
      message: format!("HTTP {}", response.status()),
    });
  }

  let bytes = response.bytes().await.map_err(|e| FetchError::Failed {
    url: url.to_string(),
    message: e.to_string(),
  })?;

  if let Some(expected) = expected_sha256 {
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let actual = hex::encode(hasher.finalize());
    if actual != expected {
      return Err(FetchError::HashMismatch {
        url: url.to_string(),
        expected: expected.to_string(),
        actual,
      });
    }
    debug!(sha256 = %expected, "hash verified");
  }

  if let Some(parent) = dest.parent() {
    fs::create_dir_all(parent).await?;
  }

  let mut file = fs::File::create(dest).await?;
  file.write_all(&bytes).await?;
  file.flush().await?;

  info!(size = bytes.len(), "download complete");
  Ok(bytes.len() as u64)
}

/// Mark a fetched file executable (0o755). No-op on non-Unix hosts.
pub fn mark_executable(path: &Path) -> Result<(), FetchError> {
  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
  }
  #[cfg(not(unix))]
  {
    let _ = path;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
  }

  #[tokio::test]
  async fn fetches_to_dest() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/installer.bin")
      .with_status(200)
      .with_body(b"binary payload")
      .create_async()
      .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("downloads/installer.bin");

    let size = fetch_url(&format!("{}/installer.bin", server.url()), &dest, None)
      .await
      .unwrap();

    mock.assert_async().await;
    assert_eq!(size, 14);
    assert_eq!(std::fs::read(&dest).unwrap(), b"binary payload");
  }

  #[tokio::test]
  async fn http_error_status_is_fatal() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/missing.bin")
      .with_status(404)
      .create_async()
      .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("missing.bin");

    let err = fetch_url(&format!("{}/missing.bin", server.url()), &dest, None)
      .await
      .unwrap_err();

    assert!(matches!(err, FetchError::Failed { .. }));
    assert!(!dest.exists());
  }

  #[tokio::test]
  async fn verifies_matching_hash() {
    let body = b"trusted payload";
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/trusted.bin")
      .with_status(200)
      .with_body(body)
      .create_async()
      .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("trusted.bin");

    fetch_url(
      &format!("{}/trusted.bin", server.url()),
      &dest,
      Some(&sha256_hex(body)),
    )
    .await
    .unwrap();

    assert!(dest.exists());
  }

  #[tokio::test]
  async fn hash_mismatch_is_fatal_and_writes_nothing() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/tampered.bin")
      .with_status(200)
      .with_body(b"tampered payload")
      .create_async()
      .await;

    let temp = TempDir::new().unwrap();
    let dest = temp.path().join("tampered.bin");

    let err = fetch_url(
      &format!("{}/tampered.bin", server.url()),
      &dest,
      Some(&sha256_hex(b"expected payload")),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, FetchError::HashMismatch { .. }));
    assert!(!dest.exists());
  }

  #[test]
  #[cfg(unix)]
  fn mark_executable_sets_mode() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tool");
    std::fs::write(&path, "#!/bin/sh\n").unwrap();

    mark_executable(&path).unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
  }
}
