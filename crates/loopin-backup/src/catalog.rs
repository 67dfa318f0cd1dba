//! The snapshot catalog: enumerate artifacts, expire old ones.
//!
//! A damaged artifact never hides the others. Anything that fails to read or
//! parse is skipped with a warning.

use std::{
  fs::File,
  io::{BufReader, Read as _, Seek as _, SeekFrom},
  path::{Path, PathBuf},
  time::{Duration, SystemTime},
};

use chrono::{DateTime, Utc};
use loopin_core::snapshot::SnapshotKind;
use serde::{Deserialize, de::IgnoredAny};
use sha2::{Digest as _, Sha256};
use tokio::fs;
use tracing::{info, warn};

use crate::{
  artifact::{EXTENSION, display_name},
  error::{Error, Result},
};

const SECS_PER_DAY: u64 = 24 * 60 * 60;
const HASH_CHUNK: usize = 64 * 1024;

/// One listed artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
  pub name:      String,
  pub path:      PathBuf,
  /// `metadata.timestamp` from the artifact.
  pub timestamp: DateTime<Utc>,
  pub kind:      SnapshotKind,
  pub version:   Option<String>,
  pub app_name:  Option<String>,
  pub size:      u64,
  pub modified:  DateTime<Utc>,
  /// Lowercase hex SHA-256 of the file contents.
  pub sha256:    String,
}

/// The parts of an artifact the catalog needs. `data` must be present but
/// is not materialised.
#[derive(Deserialize)]
struct Header {
  metadata: HeaderMetadata,
  #[serde(rename = "data")]
  _data:    IgnoredAny,
}

#[derive(Deserialize)]
struct HeaderMetadata {
  timestamp: DateTime<Utc>,
  #[serde(rename = "type")]
  kind:      SnapshotKind,
  #[serde(default)]
  version:   Option<String>,
  #[serde(default)]
  app_name:  Option<String>,
}

fn is_artifact(path: &Path) -> bool {
  path.extension().is_some_and(|ext| ext == EXTENSION)
}

/// Paths of every `*.json` file in `dir`. A missing directory is empty.
async fn artifact_paths(dir: &Path) -> Result<Vec<PathBuf>> {
  let mut entries = match fs::read_dir(dir).await {
    Ok(entries) => entries,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
    Err(e) => return Err(Error::io(dir)(e)),
  };

  let mut paths = Vec::new();
  while let Some(entry) = entries.next_entry().await.map_err(Error::io(dir))? {
    let path = entry.path();
    if is_artifact(&path) && entry.file_type().await.is_ok_and(|t| t.is_file()) {
      paths.push(path);
    }
  }
  Ok(paths)
}

/// Hash the file, then parse its header, both streaming from disk.
fn read_entry(path: PathBuf) -> Result<CatalogEntry> {
  let name = display_name(&path);
  let mut file = File::open(&path).map_err(Error::io(&path))?;
  let meta = file.metadata().map_err(Error::io(&path))?;
  let modified = meta.modified().map_err(Error::io(&path))?;

  let mut hasher = Sha256::new();
  let mut buf = vec![0u8; HASH_CHUNK];
  loop {
    let n = file.read(&mut buf).map_err(Error::io(&path))?;
    if n == 0 {
      break;
    }
    hasher.update(&buf[..n]);
  }

  file.seek(SeekFrom::Start(0)).map_err(Error::io(&path))?;
  let header: Header =
    serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::ArtifactCorrupt {
      name:   name.clone(),
      reason: e.to_string(),
    })?;

  Ok(CatalogEntry {
    name,
    path,
    timestamp: header.metadata.timestamp,
    kind: header.metadata.kind,
    version: header.metadata.version,
    app_name: header.metadata.app_name,
    size: meta.len(),
    modified: modified.into(),
    sha256: hex::encode(hasher.finalize()),
  })
}

/// Every readable artifact in `dir`, newest first by metadata timestamp.
pub async fn list(dir: &Path) -> Result<Vec<CatalogEntry>> {
  let mut entries = Vec::new();
  for path in artifact_paths(dir).await? {
    match tokio::task::spawn_blocking(move || read_entry(path)).await? {
      Ok(entry) => entries.push(entry),
      Err(e) => warn!(error = %e, "skipping unreadable artifact"),
    }
  }
  entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.name.cmp(&a.name)));
  Ok(entries)
}

/// Delete artifacts whose modification time is more than `keep_days` days
/// ago. Returns how many were removed.
pub async fn cleanup(dir: &Path, keep_days: u32) -> Result<usize> {
  let max_age = Duration::from_secs(u64::from(keep_days) * SECS_PER_DAY);
  let cutoff = SystemTime::now()
    .checked_sub(max_age)
    .unwrap_or(SystemTime::UNIX_EPOCH);

  let mut removed = 0;
  for path in artifact_paths(dir).await? {
    let modified = match fs::metadata(&path).await.and_then(|m| m.modified()) {
      Ok(t) => t,
      Err(e) => {
        warn!(artifact = %display_name(&path), error = %e, "cannot read modification time");
        continue;
      }
    };
    if modified >= cutoff {
      continue;
    }
    match fs::remove_file(&path).await {
      Ok(()) => {
        info!(artifact = %display_name(&path), "expired artifact removed");
        removed += 1;
      }
      Err(e) => warn!(artifact = %display_name(&path), error = %e, "failed to remove expired artifact"),
    }
  }
  Ok(removed)
}

/// Map a bare artifact name to its path in `dir`.
///
/// Rejects anything that could address a file outside `dir`, and names that
/// do not exist.
pub async fn resolve(dir: &Path, name: &str) -> Result<PathBuf> {
  let unsafe_name = name.is_empty()
    || name.contains(['/', '\\'])
    || name.contains("..")
    || !is_artifact(Path::new(name));
  if unsafe_name {
    return Err(Error::InvalidName(name.to_owned()));
  }

  let path = dir.join(name);
  match fs::metadata(&path).await {
    Ok(m) if m.is_file() => Ok(path),
    Ok(_) => Err(Error::NotFound(name.to_owned())),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(name.to_owned())),
    Err(e) => Err(Error::io(&path)(e)),
  }
}

pub async fn delete(dir: &Path, name: &str) -> Result<()> {
  let path = resolve(dir, name).await?;
  fs::remove_file(&path).await.map_err(Error::io(&path))?;
  info!(artifact = %name, "artifact deleted");
  Ok(())
}
