//! Row-level reads and writes shared by the store, the gates, and snapshot
//! replay.
//!
//! Everything here is synchronous and takes a plain `rusqlite::Connection`,
//! so callers decide the transaction scope. A `Transaction` derefs to a
//! `Connection`, so the same helpers run inside or outside one.

use loopin_core::{
  content::{Content, ContentKind, ContentRef},
  entity::{ActivityLog, LessonLearned, ReadLog, SopSummary, Update, User},
};
use rusqlite::{Connection, OptionalExtension as _, Params, Row};

use crate::{
  Result,
  encode::{
    RawActivity, RawLesson, RawReadLog, RawSop, RawUpdate, RawUser, encode_dt, encode_role,
    encode_tags,
  },
};

// ─── Table names ─────────────────────────────────────────────────────────────

pub fn live_table(kind: ContentKind) -> &'static str {
  match kind {
    ContentKind::Update => "updates",
    ContentKind::Sop => "sop_summaries",
    ContentKind::Lesson => "lessons_learned",
  }
}

pub fn archive_table(kind: ContentKind) -> &'static str {
  match kind {
    ContentKind::Update => "archived_updates",
    ContentKind::Sop => "archived_sop_summaries",
    ContentKind::Lesson => "archived_lessons_learned",
  }
}

/// `true` if `err` is a UNIQUE / PRIMARY KEY / FOREIGN KEY violation.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

/// Run `sql`, map each row with `from_row`, then decode each raw row.
pub fn collect<P, R, T>(
  conn: &Connection,
  sql: &str,
  params: P,
  from_row: fn(&Row<'_>) -> rusqlite::Result<R>,
  decode: fn(R) -> Result<T>,
) -> Result<Vec<T>>
where
  P: Params,
{
  let mut stmt = conn.prepare(sql)?;
  let raws = stmt
    .query_map(params, from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(decode).collect()
}

// ─── Inserts ─────────────────────────────────────────────────────────────────
//
// Integer-keyed inserts take the id separately: `Some(id)` preserves an
// existing identity, `None` lets SQLite assign the next one. The assigned (or
// preserved) id is returned.

pub fn insert_user(conn: &Connection, id: Option<i64>, u: &User) -> Result<i64> {
  conn.execute(
    "INSERT INTO users (id, username, display_name, email, password_hash, role, created_at, is_active)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    rusqlite::params![
      id,
      u.username,
      u.display_name,
      u.email,
      u.password_hash,
      encode_role(u.role),
      u.created_at.map(encode_dt),
      u.is_active,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn insert_update(conn: &Connection, u: &Update) -> Result<()> {
  conn.execute(
    "INSERT INTO updates (id, name, process, message, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
    rusqlite::params![u.id, u.name, u.process, u.message, encode_dt(u.timestamp)],
  )?;
  Ok(())
}

pub fn insert_sop(conn: &Connection, id: Option<i64>, s: &SopSummary) -> Result<i64> {
  conn.execute(
    "INSERT INTO sop_summaries (id, title, summary_text, department, tags, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      id,
      s.title,
      s.summary_text,
      s.department,
      encode_tags(s.tags.as_deref())?,
      encode_dt(s.created_at),
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn insert_lesson(conn: &Connection, id: Option<i64>, l: &LessonLearned) -> Result<i64> {
  conn.execute(
    "INSERT INTO lessons_learned (
       id, title, content, summary, author, department, tags, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    rusqlite::params![
      id,
      l.title,
      l.content,
      l.summary,
      l.author,
      l.department,
      encode_tags(l.tags.as_deref())?,
      encode_dt(l.created_at),
      l.updated_at.map(encode_dt),
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn insert_read_log(conn: &Connection, id: Option<i64>, r: &ReadLog) -> Result<i64> {
  conn.execute(
    "INSERT INTO read_logs (id, update_id, user_id, guest_name, timestamp, ip_address, user_agent)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      id,
      r.update_id,
      r.user_id,
      r.guest_name,
      encode_dt(r.timestamp),
      r.ip_address,
      r.user_agent,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

pub fn insert_activity(conn: &Connection, id: Option<i64>, a: &ActivityLog) -> Result<i64> {
  conn.execute(
    "INSERT INTO activity_logs (
       id, user_id, action, entity_type, entity_id, entity_title,
       timestamp, ip_address, user_agent, details
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    rusqlite::params![
      id,
      a.user_id,
      a.action,
      a.entity_type,
      a.entity_id,
      a.entity_title,
      encode_dt(a.timestamp),
      a.ip_address,
      a.user_agent,
      a.details,
    ],
  )?;
  Ok(conn.last_insert_rowid())
}

// ─── Full-table reads ────────────────────────────────────────────────────────
//
// Ordered by primary key so exports are deterministic.

pub fn all_users(conn: &Connection) -> Result<Vec<User>> {
  let sql = format!("SELECT {} FROM users ORDER BY id", RawUser::COLUMNS);
  collect(conn, &sql, [], RawUser::from_row, RawUser::into_user)
}

pub fn all_updates(conn: &Connection) -> Result<Vec<Update>> {
  let sql = format!("SELECT {} FROM updates ORDER BY id", RawUpdate::COLUMNS);
  collect(conn, &sql, [], RawUpdate::from_row, RawUpdate::into_update)
}

pub fn all_read_logs(conn: &Connection) -> Result<Vec<ReadLog>> {
  let sql = format!("SELECT {} FROM read_logs ORDER BY id", RawReadLog::COLUMNS);
  collect(conn, &sql, [], RawReadLog::from_row, RawReadLog::into_read_log)
}

pub fn all_sops(conn: &Connection) -> Result<Vec<SopSummary>> {
  let sql = format!("SELECT {} FROM sop_summaries ORDER BY id", RawSop::COLUMNS);
  collect(conn, &sql, [], RawSop::from_row, RawSop::into_sop)
}

pub fn all_lessons(conn: &Connection) -> Result<Vec<LessonLearned>> {
  let sql = format!("SELECT {} FROM lessons_learned ORDER BY id", RawLesson::COLUMNS);
  collect(conn, &sql, [], RawLesson::from_row, RawLesson::into_lesson)
}

pub fn all_activity(conn: &Connection) -> Result<Vec<ActivityLog>> {
  let sql = format!("SELECT {} FROM activity_logs ORDER BY id", RawActivity::COLUMNS);
  collect(conn, &sql, [], RawActivity::from_row, RawActivity::into_activity)
}

// ─── Content by kind ─────────────────────────────────────────────────────────

pub fn get_content(conn: &Connection, id: &ContentRef) -> Result<Option<Content>> {
  let content = match id {
    ContentRef::Update(key) => conn
      .query_row(
        &format!("SELECT {} FROM updates WHERE id = ?1", RawUpdate::COLUMNS),
        [key],
        RawUpdate::from_row,
      )
      .optional()?
      .map(RawUpdate::into_update)
      .transpose()?
      .map(Content::Update),
    ContentRef::Sop(key) => conn
      .query_row(
        &format!("SELECT {} FROM sop_summaries WHERE id = ?1", RawSop::COLUMNS),
        [key],
        RawSop::from_row,
      )
      .optional()?
      .map(RawSop::into_sop)
      .transpose()?
      .map(Content::Sop),
    ContentRef::Lesson(key) => conn
      .query_row(
        &format!("SELECT {} FROM lessons_learned WHERE id = ?1", RawLesson::COLUMNS),
        [key],
        RawLesson::from_row,
      )
      .optional()?
      .map(RawLesson::into_lesson)
      .transpose()?
      .map(Content::Lesson),
  };
  Ok(content)
}

pub fn list_content(conn: &Connection, kind: ContentKind) -> Result<Vec<Content>> {
  let content = match kind {
    ContentKind::Update => collect(
      conn,
      &format!("SELECT {} FROM updates ORDER BY timestamp DESC, id", RawUpdate::COLUMNS),
      [],
      RawUpdate::from_row,
      RawUpdate::into_update,
    )?
    .into_iter()
    .map(Content::Update)
    .collect(),
    ContentKind::Sop => collect(
      conn,
      &format!("SELECT {} FROM sop_summaries ORDER BY created_at DESC, id", RawSop::COLUMNS),
      [],
      RawSop::from_row,
      RawSop::into_sop,
    )?
    .into_iter()
    .map(Content::Sop)
    .collect(),
    ContentKind::Lesson => collect(
      conn,
      &format!(
        "SELECT {} FROM lessons_learned ORDER BY created_at DESC, id",
        RawLesson::COLUMNS
      ),
      [],
      RawLesson::from_row,
      RawLesson::into_lesson,
    )?
    .into_iter()
    .map(Content::Lesson)
    .collect(),
  };
  Ok(content)
}

/// Delete the row `id` addresses in `table`. Returns the number of rows
/// removed (0 or 1).
pub fn delete_by_ref(conn: &Connection, table: &str, id: &ContentRef) -> Result<usize> {
  let sql = format!("DELETE FROM {table} WHERE id = ?1");
  let n = match id {
    ContentRef::Update(key) => conn.execute(&sql, [key])?,
    ContentRef::Sop(key) | ContentRef::Lesson(key) => conn.execute(&sql, [key])?,
  };
  Ok(n)
}

/// `true` if `table` holds a row for `id`.
pub fn exists_by_ref(conn: &Connection, table: &str, id: &ContentRef) -> Result<bool> {
  let sql = format!("SELECT 1 FROM {table} WHERE id = ?1");
  let found = match id {
    ContentRef::Update(key) => conn.query_row(&sql, [key], |_| Ok(())).optional()?,
    ContentRef::Sop(key) | ContentRef::Lesson(key) => {
      conn.query_row(&sql, [key], |_| Ok(())).optional()?
    }
  };
  Ok(found.is_some())
}
