//! Artifact files: naming, atomic writes, and full reads.
//!
//! An artifact is named `<app>_<kind>_<YYYYMMDD_HHMMSS>.json`. Two artifacts
//! created within the same second get a `_1`, `_2`, ... suffix. A written
//! artifact is never overwritten.

use std::{
  io::{self, Write as _},
  path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use loopin_core::snapshot::{Snapshot, SnapshotKind, file_label};
use tokio::fs;
use tracing::debug;

use crate::error::{Error, Result};

pub const EXTENSION: &str = "json";

/// A written artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
  /// File name inside the backup directory.
  pub name: String,
  pub path: PathBuf,
  pub size: u64,
}

/// `<app>_<kind>_<YYYYMMDD_HHMMSS>`, without extension. Both labels are
/// reduced to file-name-safe characters.
pub fn file_stem(app_name: &str, kind: &SnapshotKind, at: DateTime<Utc>) -> String {
  format!("{}_{}_{}", file_label(app_name), kind.file_label(), at.format("%Y%m%d_%H%M%S"))
}

fn candidate(stem: &str, n: u32) -> String {
  match n {
    0 => format!("{stem}.{EXTENSION}"),
    n => format!("{stem}_{n}.{EXTENSION}"),
  }
}

/// Write `bytes` to a new artifact named after `stem` in `dir`.
///
/// The bytes go to a uniquely named `.json.tmp` sibling first. Once synced,
/// it is linked into place under the first free name of `<stem>.json`,
/// `<stem>_1.json`, ... without ever replacing an existing artifact.
pub async fn write(dir: &Path, stem: &str, bytes: &[u8]) -> Result<ArtifactRef> {
  let dir = dir.to_path_buf();
  let stem = stem.to_owned();
  let bytes = bytes.to_vec();
  tokio::task::spawn_blocking(move || write_blocking(&dir, &stem, &bytes)).await?
}

fn write_blocking(dir: &Path, stem: &str, bytes: &[u8]) -> Result<ArtifactRef> {
  std::fs::create_dir_all(dir).map_err(Error::io(dir))?;

  let mut tmp = tempfile::Builder::new()
    .prefix(&format!(".{stem}."))
    .suffix(".json.tmp")
    .tempfile_in(dir)
    .map_err(Error::io(dir))?;
  tmp.write_all(bytes).map_err(Error::io(tmp.path()))?;
  tmp.as_file().sync_all().map_err(Error::io(tmp.path()))?;

  let mut n = 0u32;
  loop {
    let name = candidate(stem, n);
    let path = dir.join(&name);
    // Dropping the temp file on any error below removes it.
    match tmp.persist_noclobber(&path) {
      Ok(_) => {
        debug!(artifact = %name, bytes = bytes.len(), "artifact written");
        return Ok(ArtifactRef { name, path, size: bytes.len() as u64 });
      }
      Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
        tmp = e.file;
        n += 1;
      }
      Err(e) => return Err(Error::io(&path)(e.error)),
    }
  }
}

/// Read and fully parse an artifact.
pub async fn read(path: &Path) -> Result<Snapshot> {
  let bytes = fs::read(path).await.map_err(Error::io(path))?;
  serde_json::from_slice(&bytes).map_err(|e| Error::ArtifactCorrupt {
    name:   display_name(path),
    reason: e.to_string(),
  })
}

pub(crate) fn display_name(path: &Path) -> String {
  path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string())
}
