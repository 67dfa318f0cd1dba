//! Error type for `loopin-store-sqlite`.

use loopin_core::content::ContentRef;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] loopin_core::Error),

  /// The connection thread failed or a statement failed outside a guarded
  /// operation.
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A statement inside a guarded multi-step operation failed; the
  /// transaction was rolled back.
  #[error("transaction failed: {0}")]
  Transaction(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("{0} not found")]
  NotFound(ContentRef),

  /// A twin with this identity exists but holds different content.
  #[error("{0} already has an archive twin with different content")]
  ArchiveConflict(ContentRef),

  /// The identity is held by a live row, or by a twin awaiting restoration.
  #[error("{0} is already in use")]
  IdentityInUse(ContentRef),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
