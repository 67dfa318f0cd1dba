//! Whole-store export and replay.

use loopin_core::{content::ContentKind, snapshot::SnapshotData};
use rusqlite::{Connection, Transaction};
use tracing::{debug, info, warn};

use crate::{
  Result,
  tables::{
    all_activity, all_lessons, all_read_logs, all_sops, all_updates, all_users, archive_table,
    insert_activity, insert_lesson, insert_read_log, insert_sop, insert_update, insert_user,
    live_table,
  },
};

/// Live tables in the order rows must be removed before a replay: children
/// before the rows they reference.
const CLEAR_ORDER: [&str; 6] = [
  "read_logs",
  "activity_logs",
  "updates",
  "sop_summaries",
  "lessons_learned",
  "users",
];

/// Read every live collection inside one read transaction, so the result
/// reflects a single point in time.
pub fn export(conn: &mut Connection) -> Result<SnapshotData> {
  let tx = conn.transaction()?;
  let data = SnapshotData {
    users:           all_users(&tx)?,
    updates:         all_updates(&tx)?,
    read_logs:       all_read_logs(&tx)?,
    sop_summaries:   all_sops(&tx)?,
    lessons_learned: all_lessons(&tx)?,
    activity_logs:   all_activity(&tx)?,
  };
  tx.commit()?;
  debug!(records = data.total_records(), "exported live collections");
  Ok(data)
}

/// Replace all live rows with `data`. Identities are preserved exactly, and
/// archive twins of rows the snapshot brings back are dropped.
///
/// The caller owns the transaction; any error here leaves it uncommitted.
pub fn replay(tx: &Transaction<'_>, data: &SnapshotData) -> Result<()> {
  for table in CLEAR_ORDER {
    let n = tx.execute(&format!("DELETE FROM {table}"), [])?;
    debug!(table, removed = n, "cleared before replay");
  }

  for u in &data.users {
    insert_user(tx, Some(u.id), u)?;
  }
  for u in &data.updates {
    insert_update(tx, u)?;
  }
  for r in &data.read_logs {
    insert_read_log(tx, Some(r.id), r)?;
  }
  for s in &data.sop_summaries {
    insert_sop(tx, Some(s.id), s)?;
  }
  for l in &data.lessons_learned {
    insert_lesson(tx, Some(l.id), l)?;
  }
  for a in &data.activity_logs {
    insert_activity(tx, Some(a.id), a)?;
  }

  // A twin exists only while its live row is absent.
  for kind in [ContentKind::Update, ContentKind::Sop, ContentKind::Lesson] {
    let (live, twins) = (live_table(kind), archive_table(kind));
    let sql = format!("DELETE FROM {twins} WHERE id IN (SELECT id FROM {live})");
    let n = tx.execute(&sql, [])?;
    if n > 0 {
      warn!(%kind, dropped = n, "snapshot revived archived content; twins dropped");
    }
  }

  info!(records = data.total_records(), "replayed snapshot");
  Ok(())
}
