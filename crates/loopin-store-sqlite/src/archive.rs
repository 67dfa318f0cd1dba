//! The archival and restoration gates.
//!
//! Each function here runs against a caller-provided transaction; the store
//! opens it, calls in, and commits only on `Ok`. Dropping an uncommitted
//! `rusqlite::Transaction` rolls it back.

use chrono::Utc;
use loopin_core::{
  archive::{ArchiveOutcome, ArchivedContent, DeleteOutcome},
  content::{Content, ContentKind, ContentRef},
  entity::{ActivityLog, Update},
};
use rusqlite::{Connection, OptionalExtension as _, Transaction};
use tracing::{error, info, warn};

use crate::{
  Error, Result,
  encode::{RawLesson, RawSop, RawStamp, RawUpdate, encode_dt, encode_tags},
  tables::{
    archive_table, collect, delete_by_ref, exists_by_ref, insert_activity, insert_lesson,
    insert_sop, insert_update, is_constraint_violation, live_table,
  },
};

/// Run `f` inside a transaction on `conn`, committing only if it succeeds.
pub fn in_transaction<T>(
  conn: &mut Connection,
  f: impl FnOnce(&Transaction<'_>) -> Result<T>,
) -> Result<T> {
  let tx = conn.transaction()?;
  let out = f(&tx)?;
  tx.commit()?;
  Ok(out)
}

// ─── Admission ───────────────────────────────────────────────────────────────

/// Insert a new live update. Its key must be free in both the live and the
/// archive table.
pub fn admit_update(tx: &Transaction<'_>, update: &Update) -> Result<()> {
  let id = ContentRef::Update(update.id.clone());
  if exists_by_ref(tx, archive_table(ContentKind::Update), &id)? {
    return Err(Error::IdentityInUse(id));
  }
  insert_update(tx, update).map_err(|e| match e {
    Error::Transaction(ref inner) if is_constraint_violation(inner) => Error::IdentityInUse(id),
    other => other,
  })
}

// ─── Archival ────────────────────────────────────────────────────────────────

/// Write the archive twin for `content`, unless an identical one already
/// exists.
pub fn archive(
  tx: &Transaction<'_>,
  content: &Content,
  actor: Option<i64>,
) -> Result<ArchiveOutcome> {
  let id = content.id_ref();
  if !id.is_valid() {
    return Err(
      loopin_core::Error::InvalidEntity(format!("{} has no identity", id.kind())).into(),
    );
  }

  // Only an identical twin counts as already archived.
  if let Some(twin) = get_archived(tx, &id)? {
    if twin.into_content() != *content {
      return Err(Error::ArchiveConflict(id));
    }
    warn!(%id, "already archived; skipping duplicate twin");
    return Ok(ArchiveOutcome::AlreadyArchived);
  }

  if actor.is_none() {
    warn!(%id, "archiving without user context");
  }

  insert_twin(tx, &ArchivedContent::stamp(content.clone(), actor))?;
  info!(%id, archived_by = ?actor, "archived");
  Ok(ArchiveOutcome::Archived)
}

fn insert_twin(conn: &Connection, twin: &ArchivedContent) -> Result<()> {
  match twin {
    ArchivedContent::Update(a) => {
      let u = &a.item;
      conn.execute(
        "INSERT INTO archived_updates (
           id, name, process, message, timestamp, archived_at, archived_by
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
          u.id,
          u.name,
          u.process,
          u.message,
          encode_dt(u.timestamp),
          encode_dt(a.archived_at),
          a.archived_by,
        ],
      )?;
    }
    ArchivedContent::Sop(a) => {
      let s = &a.item;
      conn.execute(
        "INSERT INTO archived_sop_summaries (
           id, title, summary_text, department, tags, created_at, archived_at, archived_by
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
          s.id,
          s.title,
          s.summary_text,
          s.department,
          encode_tags(s.tags.as_deref())?,
          encode_dt(s.created_at),
          encode_dt(a.archived_at),
          a.archived_by,
        ],
      )?;
    }
    ArchivedContent::Lesson(a) => {
      let l = &a.item;
      conn.execute(
        "INSERT INTO archived_lessons_learned (
           id, title, content, summary, author, department, tags,
           created_at, updated_at, archived_at, archived_by
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
          l.id,
          l.title,
          l.content,
          l.summary,
          l.author,
          l.department,
          encode_tags(l.tags.as_deref())?,
          encode_dt(l.created_at),
          l.updated_at.map(encode_dt),
          encode_dt(a.archived_at),
          a.archived_by,
        ],
      )?;
    }
  }
  Ok(())
}

/// Delete the live row for `id`. Only called after [`archive`] succeeded in
/// the same transaction.
pub fn delete_live(tx: &Transaction<'_>, id: &ContentRef) -> Result<usize> {
  delete_by_ref(tx, live_table(id.kind()), id)
}

/// The gated delete: archive, and only if that succeeded, delete the live
/// row and append a `deleted` activity entry. All three happen in one
/// transaction, so a failed delete also discards the twin it would have left
/// behind.
pub fn archive_then_delete(
  conn: &mut Connection,
  content: &Content,
  actor: Option<i64>,
) -> Result<DeleteOutcome> {
  let id = content.id_ref();
  let tx = conn.transaction()?;

  let archived = match archive(&tx, content, actor) {
    Ok(outcome) => outcome,
    Err(e) => {
      error!(%id, error = %e, "archival failed; deletion cancelled");
      return Ok(DeleteOutcome::ArchivalFailed { reason: e.to_string() });
    }
  };

  // A retried delete finds the twin already present and the live row gone.
  match delete_live(&tx, &id)? {
    0 if archived == ArchiveOutcome::Archived => return Err(Error::NotFound(id)),
    0 => {}
    _ => record_deletion(&tx, content, actor)?,
  }

  tx.commit()?;
  info!(%id, "archived and deleted");
  Ok(DeleteOutcome::ArchivedAndDeleted)
}

/// Append the `deleted` audit entry for `content`. An actor that is not a
/// known user is recorded as the system.
fn record_deletion(tx: &Transaction<'_>, content: &Content, actor: Option<i64>) -> Result<()> {
  let user_id = match actor {
    Some(uid) if known_user(tx, uid)? => Some(uid),
    _ => None,
  };
  let entry = ActivityLog {
    id: 0,
    user_id,
    action: "deleted".into(),
    entity_type: content.kind().to_string(),
    entity_id: content.id_ref().key(),
    entity_title: Some(content.title().to_owned()),
    timestamp: Utc::now(),
    ip_address: None,
    user_agent: None,
    details: None,
  };
  insert_activity(tx, None, &entry)?;
  Ok(())
}

fn known_user(conn: &Connection, id: i64) -> Result<bool> {
  let found = conn
    .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |_| Ok(()))
    .optional()?;
  Ok(found.is_some())
}

// ─── Lookup ──────────────────────────────────────────────────────────────────

pub fn get_archived(conn: &Connection, id: &ContentRef) -> Result<Option<ArchivedContent>> {
  let twin = match id {
    ContentRef::Update(key) => conn
      .query_row(
        &format!(
          "SELECT {}, {} FROM archived_updates WHERE id = ?1",
          RawUpdate::COLUMNS,
          RawStamp::COLUMNS
        ),
        [key],
        |row| Ok((RawUpdate::from_row(row)?, RawStamp::from_row(row, RawUpdate::WIDTH)?)),
      )
      .optional()?
      .map(|(raw, stamp)| stamp.wrap(raw.into_update()?).map(ArchivedContent::Update))
      .transpose()?,
    ContentRef::Sop(key) => conn
      .query_row(
        &format!(
          "SELECT {}, {} FROM archived_sop_summaries WHERE id = ?1",
          RawSop::COLUMNS,
          RawStamp::COLUMNS
        ),
        [key],
        |row| Ok((RawSop::from_row(row)?, RawStamp::from_row(row, RawSop::WIDTH)?)),
      )
      .optional()?
      .map(|(raw, stamp)| stamp.wrap(raw.into_sop()?).map(ArchivedContent::Sop))
      .transpose()?,
    ContentRef::Lesson(key) => conn
      .query_row(
        &format!(
          "SELECT {}, {} FROM archived_lessons_learned WHERE id = ?1",
          RawLesson::COLUMNS,
          RawStamp::COLUMNS
        ),
        [key],
        |row| Ok((RawLesson::from_row(row)?, RawStamp::from_row(row, RawLesson::WIDTH)?)),
      )
      .optional()?
      .map(|(raw, stamp)| stamp.wrap(raw.into_lesson()?).map(ArchivedContent::Lesson))
      .transpose()?,
  };
  Ok(twin)
}

pub fn list_archived(conn: &Connection, kind: ContentKind) -> Result<Vec<ArchivedContent>> {
  let table = archive_table(kind);
  let twins = match kind {
    ContentKind::Update => collect(
      conn,
      &format!(
        "SELECT {}, {} FROM {table} ORDER BY archived_at DESC, id",
        RawUpdate::COLUMNS,
        RawStamp::COLUMNS
      ),
      [],
      |row| Ok((RawUpdate::from_row(row)?, RawStamp::from_row(row, RawUpdate::WIDTH)?)),
      |(raw, stamp)| stamp.wrap(raw.into_update()?).map(ArchivedContent::Update),
    )?,
    ContentKind::Sop => collect(
      conn,
      &format!(
        "SELECT {}, {} FROM {table} ORDER BY archived_at DESC, id",
        RawSop::COLUMNS,
        RawStamp::COLUMNS
      ),
      [],
      |row| Ok((RawSop::from_row(row)?, RawStamp::from_row(row, RawSop::WIDTH)?)),
      |(raw, stamp)| stamp.wrap(raw.into_sop()?).map(ArchivedContent::Sop),
    )?,
    ContentKind::Lesson => collect(
      conn,
      &format!(
        "SELECT {}, {} FROM {table} ORDER BY archived_at DESC, id",
        RawLesson::COLUMNS,
        RawStamp::COLUMNS
      ),
      [],
      |row| Ok((RawLesson::from_row(row)?, RawStamp::from_row(row, RawLesson::WIDTH)?)),
      |(raw, stamp)| stamp.wrap(raw.into_lesson()?).map(ArchivedContent::Lesson),
    )?,
  };
  Ok(twins)
}

// ─── Restoration ─────────────────────────────────────────────────────────────

/// Re-insert the twin for `id` into its live table, then drop the twin.
///
/// Updates keep their key. SOP summaries and lessons are inserted without an
/// id so the live table issues a fresh one: the archived number may belong to
/// unrelated content by now.
pub fn restore(tx: &Transaction<'_>, id: &ContentRef) -> Result<Content> {
  let twin = get_archived(tx, id)?.ok_or_else(|| Error::NotFound(id.clone()))?;

  let conflict = |e: Error| match e {
    Error::Transaction(ref inner) if is_constraint_violation(inner) => {
      Error::IdentityInUse(id.clone())
    }
    other => other,
  };

  let restored = match twin.into_content() {
    Content::Update(u) => {
      insert_update(tx, &u).map_err(conflict)?;
      Content::Update(u)
    }
    Content::Sop(mut s) => {
      s.id = insert_sop(tx, None, &s)?;
      Content::Sop(s)
    }
    Content::Lesson(mut l) => {
      l.id = insert_lesson(tx, None, &l)?;
      Content::Lesson(l)
    }
  };

  delete_by_ref(tx, archive_table(id.kind()), id)?;
  info!(%id, restored = %restored.id_ref(), "restored from archive");
  Ok(restored)
}

/// Permanently drop the twin for `id`, bypassing restoration.
pub fn purge(tx: &Transaction<'_>, id: &ContentRef) -> Result<()> {
  if delete_by_ref(tx, archive_table(id.kind()), id)? == 0 {
    return Err(Error::NotFound(id.clone()));
  }
  warn!(%id, "archived content permanently deleted");
  Ok(())
}
