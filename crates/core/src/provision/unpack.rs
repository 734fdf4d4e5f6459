//! Tarball unpacking for fetched artifacts.
//!
//! Supports `.tar.gz` / `.tgz` / `.tar`. The leading path component of
//! every entry is stripped, so `tool-1.2.0/bin/tool` lands at `bin/tool`
//! under the destination.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::info;

use crate::error::FetchError;

/// Unpack a tar archive into `dest`, stripping the leading component.
pub fn unpack_archive(archive_path: &Path, dest: &Path) -> Result<(), FetchError> {
  let name = archive_path.to_string_lossy();
  fs::create_dir_all(dest)?;

  let file = BufReader::new(File::open(archive_path)?);
  if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
    unpack_entries(Archive::new(GzDecoder::new(file)), dest)?;
  } else if name.ends_with(".tar") {
    unpack_entries(Archive::new(file), dest)?;
  } else {
    return Err(FetchError::UnsupportedArchive(name.to_string()));
  }

  info!(dest = %dest.display(), "unpacked archive");
  Ok(())
}

fn unpack_entries<R: Read>(mut archive: Archive<R>, dest: &Path) -> Result<(), FetchError> {
  for entry in archive.entries()? {
    let mut entry = entry?;
    let path = entry.path()?;

    // Strip the leading component (e.g. tool-1.2.0/).
    let stripped: PathBuf = path.components().skip(1).collect();
    if stripped.as_os_str().is_empty() {
      continue;
    }

    let dest_path = dest.join(&stripped);
    if let Some(parent) = dest_path.parent() {
      fs::create_dir_all(parent)?;
    }
    entry.unpack(&dest_path)?;
  }
  Ok(())
}
