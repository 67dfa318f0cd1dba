//! Error types for `loopin-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The archival target carries no usable identity.
  #[error("invalid entity: {0}")]
  InvalidEntity(String),

  #[error("invalid {kind} identity: {value:?}")]
  InvalidIdentity { kind: &'static str, value: String },

  #[error("unknown role: {0:?}")]
  UnknownRole(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
