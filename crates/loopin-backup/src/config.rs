//! Runtime configuration for the backup layer, deserialised from
//! `loopin.toml` and `LOOPIN_*` environment variables.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::warn;

const GIB: u64 = 1024 * 1024 * 1024;

/// Deployment environment. Production tightens the retention and size
/// limits; development loosens the minimum retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
  #[default]
  Development,
  Production,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
  /// SQLite database file. A leading `~/` is expanded by the binary.
  pub database_path:        PathBuf,
  /// Directory holding artifacts; created on first use.
  pub backup_dir:           PathBuf,
  /// File name prefix and `metadata.app_name`.
  pub app_name:             String,
  pub retention_days:       u32,
  /// Artifacts larger than this many bytes are discarded.
  pub max_backup_size:      u64,
  pub restore_timeout_secs: u64,
  pub environment:          Environment,
}

impl Default for BackupConfig {
  fn default() -> Self {
    Self {
      database_path:        "loopin.db".into(),
      backup_dir:           "backups".into(),
      app_name:             "loopin".into(),
      retention_days:       30,
      max_backup_size:      500 * 1024 * 1024,
      restore_timeout_secs: 90,
      environment:          Environment::Development,
    }
  }
}

impl BackupConfig {
  /// Load from an optional TOML file layered with `LOOPIN_*` variables, then
  /// apply the environment limits.
  pub fn load(file: impl Into<PathBuf>) -> Result<Self, config::ConfigError> {
    let cfg: Self = config::Config::builder()
      .add_source(config::File::from(file.into()).required(false))
      .add_source(config::Environment::with_prefix("LOOPIN"))
      .build()?
      .try_deserialize()?;
    Ok(cfg.with_environment_limits())
  }

  /// Clamp retention and size limits to what `environment` allows.
  pub fn with_environment_limits(mut self) -> Self {
    match self.environment {
      Environment::Production => {
        if self.retention_days > 90 {
          warn!(requested = self.retention_days, "retention capped at 90 days in production");
          self.retention_days = 90;
        }
        if self.max_backup_size > GIB {
          warn!(requested = self.max_backup_size, "backup size capped at 1 GiB in production");
          self.max_backup_size = GIB;
        }
      }
      Environment::Development => {
        self.retention_days = self.retention_days.max(7);
      }
    }
    self
  }

  pub fn restore_timeout(&self) -> Duration { Duration::from_secs(self.restore_timeout_secs) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn production_clamps_limits() {
    let cfg = BackupConfig {
      retention_days: 365,
      max_backup_size: 4 * GIB,
      environment: Environment::Production,
      ..Default::default()
    }
    .with_environment_limits();
    assert_eq!(cfg.retention_days, 90);
    assert_eq!(cfg.max_backup_size, GIB);
  }

  #[test]
  fn development_keeps_a_week_minimum() {
    let cfg = BackupConfig { retention_days: 1, ..Default::default() }.with_environment_limits();
    assert_eq!(cfg.retention_days, 7);

    let cfg = BackupConfig::default().with_environment_limits();
    assert_eq!(cfg.retention_days, 30);
    assert_eq!(cfg.restore_timeout(), Duration::from_secs(90));
  }

  #[test]
  fn missing_file_yields_defaults() {
    let cfg = BackupConfig::load("/nonexistent/loopin.toml").unwrap();
    assert_eq!(cfg.app_name, "loopin");
    assert_eq!(cfg.max_backup_size, 524_288_000);
  }
}
