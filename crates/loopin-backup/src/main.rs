//! loopin-backup command-line tool.
//!
//! Reads `loopin.toml` (or the path given with `--config`) layered with
//! `LOOPIN_*` environment variables, opens the SQLite store, and runs one
//! backup or archive operation.
//!
//! ```sh
//! cargo run -p loopin-backup -- create --kind scheduled
//! cargo run -p loopin-backup -- restore loopin_manual_20240307_140509.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use loopin_backup::{BackupConfig, BackupManager};
use loopin_core::{
  content::{ContentKind, ContentRef},
  snapshot::SnapshotKind,
  store::BoardStore,
};
use loopin_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "LoopIn backup and archive tool")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "loopin.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Write a snapshot of every live table.
  Create {
    #[arg(long, default_value = "manual")]
    kind: SnapshotKind,
  },
  /// List artifacts, newest first.
  List,
  /// Check that an artifact is restorable.
  Verify { name: String },
  /// Replace all live data with an artifact.
  Restore { name: String },
  /// Delete artifacts older than the retention period.
  Cleanup {
    /// Overrides `retention_days`.
    #[arg(long)]
    keep_days: Option<u32>,
  },
  /// Delete one artifact.
  Delete { name: String },
  /// List archived content of one kind (`update`, `sop`, `lesson`).
  Archived { kind: ContentKind },
  /// Move archived content back to its live table.
  Unarchive { kind: ContentKind, id: String },
  /// Permanently delete archived content.
  Purge { kind: ContentKind, id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut cfg = BackupConfig::load(&cli.config).context("failed to load configuration")?;
  cfg.database_path = expand_tilde(&cfg.database_path);
  cfg.backup_dir = expand_tilde(&cfg.backup_dir);

  let store = SqliteStore::open(&cfg.database_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.database_path))?;
  let manager = BackupManager::new(store, cfg);

  match cli.command {
    Command::Create { kind } => match manager.create_backup(kind).await {
      Some(artifact) => println!("{}\t{} bytes", artifact.name, artifact.size),
      None => bail!("backup failed; see log"),
    },

    Command::List => {
      for entry in manager.list_backups().await.context("failed to list backups")? {
        println!(
          "{}\t{}\t{}\t{} bytes\t{}",
          entry.name,
          entry.timestamp.to_rfc3339(),
          entry.kind,
          entry.size,
          entry.sha256,
        );
      }
    }

    Command::Verify { name } => {
      if !manager.verify_backup(&name).await {
        bail!("{name} is not a restorable backup");
      }
      println!("{name}: ok");
    }

    Command::Restore { name } => {
      manager
        .restore_with_timeout(&name)
        .await
        .into_result()
        .with_context(|| format!("restore from {name} failed"))?;
      println!("restored from {name}");
    }

    Command::Cleanup { keep_days } => {
      let removed = manager
        .cleanup_old_backups(keep_days)
        .await
        .context("cleanup failed")?;
      println!("removed {removed} backup(s)");
    }

    Command::Delete { name } => {
      manager
        .delete_backup(&name)
        .await
        .with_context(|| format!("failed to delete {name}"))?;
      println!("deleted {name}");
    }

    Command::Archived { kind } => {
      for twin in manager.store().list_archived(kind).await? {
        let archived_at = twin.archived_at().to_rfc3339();
        let archived_by = twin
          .archived_by()
          .map_or_else(|| "system".to_owned(), |id| id.to_string());
        let content = twin.into_content();
        println!(
          "{}\t{}\t{archived_at}\t{archived_by}",
          content.id_ref(),
          content.title()
        );
      }
    }

    Command::Unarchive { kind, id } => {
      let id = ContentRef::parse(kind, &id)?;
      let restored = manager
        .store()
        .restore_archived(id.clone())
        .await
        .with_context(|| format!("failed to restore {id}"))?;
      println!("restored {id} as {}", restored.id_ref());
    }

    Command::Purge { kind, id } => {
      let id = ContentRef::parse(kind, &id)?;
      manager
        .store()
        .purge_archived(id.clone())
        .await
        .with_context(|| format!("failed to purge {id}"))?;
      println!("purged {id}");
    }
  }

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
