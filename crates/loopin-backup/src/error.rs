//! Error types for the backup layer.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("io error on {path:?}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
  #[error("artifact {name} is corrupt: {reason}")]
  ArtifactCorrupt { name: String, reason: String },
  #[error("backup not found: {0}")]
  NotFound(String),
  #[error("invalid backup name: {0:?}")]
  InvalidName(String),
  #[error("restore did not finish within {0:?}; outcome unknown")]
  Timeout(std::time::Duration),
  #[error("background task aborted: {0}")]
  Join(#[from] tokio::task::JoinError),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
    let path = path.into();
    move |source| Self::Io { path, source }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
