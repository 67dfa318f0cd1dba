//! Snapshot backups for LoopIn.
//!
//! [`BackupManager`] ties a [`BoardStore`] to a backup directory: it writes
//! point-in-time artifacts, lists and expires them, and replays one back into
//! the store.

pub mod artifact;
pub mod catalog;
pub mod config;
pub mod error;
pub mod restore;

pub use artifact::ArtifactRef;
pub use catalog::CatalogEntry;
pub use config::{BackupConfig, Environment};
pub use error::{Error, Result};
pub use restore::RestoreOutcome;

use std::path::PathBuf;

use loopin_core::{
  entity::NewActivity,
  snapshot::{Snapshot, SnapshotKind, SnapshotMetadata},
  store::BoardStore,
};
use tracing::{error, info, warn};


/// Backup operations over one store and one backup directory.
#[derive(Clone)]
pub struct BackupManager<S> {
  store:  S,
  config: BackupConfig,
}

impl<S> BackupManager<S>
where
  S: BoardStore + Clone + 'static,
{
  pub fn new(store: S, config: BackupConfig) -> Self { Self { store, config } }

  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &BackupConfig { &self.config }

  // ── Snapshot engine ───────────────────────────────────────────────────────

  /// Export every live collection to a new artifact.
  ///
  /// Returns `None` if anything goes wrong; the cause is logged.
  pub async fn create_backup(&self, kind: SnapshotKind) -> Option<ArtifactRef> {
    match self.try_create_backup(kind.clone()).await {
      Ok(artifact) => artifact,
      Err(e) => {
        error!(%kind, error = %e, "backup failed");
        None
      }
    }
  }

  async fn try_create_backup(&self, kind: SnapshotKind) -> Result<Option<ArtifactRef>> {
    let data = self
      .store
      .export_snapshot()
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;

    let snapshot = Snapshot {
      metadata: SnapshotMetadata::new(kind, &self.config.app_name),
      data,
    };
    let bytes = serde_json::to_vec_pretty(&snapshot)?;

    if bytes.len() as u64 > self.config.max_backup_size {
      error!(
        kind = %snapshot.metadata.kind,
        size = bytes.len(),
        limit = self.config.max_backup_size,
        "backup exceeds size limit; discarded"
      );
      return Ok(None);
    }

    let stem = artifact::file_stem(
      &self.config.app_name,
      &snapshot.metadata.kind,
      snapshot.metadata.timestamp,
    );
    let artifact = artifact::write(&self.config.backup_dir, &stem, &bytes).await?;
    info!(
      artifact = %artifact.name,
      kind = %snapshot.metadata.kind,
      records = snapshot.data.total_records(),
      size = artifact.size,
      "backup created"
    );
    self
      .audit("created", "system", format!("Database backup: {}", snapshot.metadata.kind))
      .await;
    Ok(Some(artifact))
  }

  // ── Catalog ───────────────────────────────────────────────────────────────

  /// Every readable artifact, newest first.
  pub async fn list_backups(&self) -> Result<Vec<CatalogEntry>> {
    catalog::list(&self.config.backup_dir).await
  }

  /// Remove artifacts older than `keep_days`, or the configured retention
  /// when `None`.
  pub async fn cleanup_old_backups(&self, keep_days: Option<u32>) -> Result<usize> {
    let keep_days = keep_days.unwrap_or(self.config.retention_days);
    let removed = catalog::cleanup(&self.config.backup_dir, keep_days).await?;
    info!(keep_days, removed, "backup cleanup finished");
    if removed > 0 {
      self
        .audit("cleanup", "system", format!("Cleaned up {removed} old backup files"))
        .await;
    }
    Ok(removed)
  }

  pub async fn resolve_backup(&self, name: &str) -> Result<PathBuf> {
    catalog::resolve(&self.config.backup_dir, name).await
  }

  pub async fn delete_backup(&self, name: &str) -> Result<()> {
    catalog::delete(&self.config.backup_dir, name).await?;
    self
      .audit("deleted", name, format!("Backup file deleted: {name}"))
      .await;
    Ok(())
  }

  // ── Audit trail ───────────────────────────────────────────────────────────

  /// Append a `backup` entry to the activity log. Best effort: a failure is
  /// logged and the backup operation still succeeds.
  async fn audit(&self, action: &str, entity_id: &str, title: String) {
    let entry = NewActivity {
      action: action.to_owned(),
      entity_type: "backup".to_owned(),
      entity_id: entity_id.to_owned(),
      entity_title: Some(title),
      ..Default::default()
    };
    if let Err(e) = self.store.log_activity(entry).await {
      warn!(action, entity_id, error = %e, "failed to record backup activity");
    }
  }

  // ── Restore engine ────────────────────────────────────────────────────────

  /// `true` if the named artifact parses and holds at least one user.
  pub async fn verify_backup(&self, name: &str) -> bool {
    match self.resolve_backup(name).await {
      Ok(path) => restore::verify(&path).await,
      Err(e) => {
        error!(artifact = %name, error = %e, "cannot verify backup");
        false
      }
    }
  }

  /// Replace the store's live data with the named artifact.
  pub async fn restore_backup(&self, name: &str) -> Result<()> {
    let path = self.resolve_backup(name).await?;
    restore::restore(&self.store, &path).await
  }

  /// [`restore_backup`](Self::restore_backup) bounded by the configured
  /// restore timeout.
  pub async fn restore_with_timeout(&self, name: &str) -> RestoreOutcome {
    let path = match self.resolve_backup(name).await {
      Ok(path) => path,
      Err(e) => return RestoreOutcome::Failed(e),
    };
    restore::restore_with_timeout(self.store.clone(), &path, self.config.restore_timeout()).await
  }
}
