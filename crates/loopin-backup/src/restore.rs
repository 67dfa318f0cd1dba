//! The restore engine: validate an artifact and replay it into a store.

use std::{path::Path, time::Duration};

use loopin_core::{
  snapshot::{FORMAT_VERSION, Snapshot},
  store::BoardStore,
};
use tracing::{error, info, warn};

use crate::{
  artifact::{self, display_name},
  error::{Error, Result},
};

/// Result of a restore bounded by a timeout.
#[derive(Debug)]
pub enum RestoreOutcome {
  Restored,
  Failed(Error),
  /// The worker did not finish within `after`. It keeps running; the store
  /// may or may not end up restored.
  TimedOut { after: Duration },
}

impl RestoreOutcome {
  pub fn is_restored(&self) -> bool { matches!(self, Self::Restored) }

  pub fn into_result(self) -> Result<()> {
    match self {
      Self::Restored => Ok(()),
      Self::Failed(e) => Err(e),
      Self::TimedOut { after } => Err(Error::Timeout(after)),
    }
  }
}

/// Check that a parsed artifact is fit to restore.
pub fn validate(name: &str, snapshot: &Snapshot) -> Result<()> {
  if snapshot.data.users.is_empty() {
    return Err(Error::ArtifactCorrupt {
      name:   name.to_owned(),
      reason: "artifact contains no users".into(),
    });
  }
  if snapshot.metadata.version != FORMAT_VERSION {
    warn!(
      artifact = %name,
      version = %snapshot.metadata.version,
      expected = FORMAT_VERSION,
      "artifact format version differs"
    );
  }
  Ok(())
}

/// `true` if the artifact at `path` parses and holds at least one user.
pub async fn verify(path: &Path) -> bool {
  let name = display_name(path);
  match artifact::read(path).await.and_then(|s| validate(&name, &s)) {
    Ok(()) => {
      info!(artifact = %name, "artifact verified");
      true
    }
    Err(e) => {
      warn!(artifact = %name, error = %e, "artifact failed verification");
      false
    }
  }
}

/// Replay the artifact at `path` into `store`.
///
/// The store applies the whole artifact in one transaction; on any error it
/// is left as it was.
pub async fn restore<S>(store: &S, path: &Path) -> Result<()>
where
  S: BoardStore,
{
  let name = display_name(path);
  let snapshot = artifact::read(path).await?;
  validate(&name, &snapshot)?;

  let records = snapshot.data.total_records();
  store
    .replay_snapshot(snapshot.data)
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;

  info!(artifact = %name, records, "restored from artifact");
  Ok(())
}

/// Run [`restore`] on its own task and wait at most `timeout` for it.
pub async fn restore_with_timeout<S>(store: S, path: &Path, timeout: Duration) -> RestoreOutcome
where
  S: BoardStore + 'static,
{
  let name = display_name(path);
  let path = path.to_path_buf();
  let worker = tokio::spawn(async move { restore(&store, &path).await });

  match tokio::time::timeout(timeout, worker).await {
    Ok(Ok(Ok(()))) => RestoreOutcome::Restored,
    Ok(Ok(Err(e))) => {
      error!(artifact = %name, error = %e, "restore failed");
      RestoreOutcome::Failed(e)
    }
    Ok(Err(join)) => {
      error!(artifact = %name, error = %join, "restore worker aborted");
      RestoreOutcome::Failed(Error::Join(join))
    }
    Err(_) => {
      error!(artifact = %name, ?timeout, "restore timed out; outcome unknown");
      RestoreOutcome::TimedOut { after: timeout }
    }
  }
}
