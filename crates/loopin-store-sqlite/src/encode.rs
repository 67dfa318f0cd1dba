//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings in UTC. Tag lists are stored
//! as compact JSON arrays, or NULL when absent. Roles are stored by name.

use chrono::{DateTime, SecondsFormat, Utc};
use loopin_core::{
  archive::Archived,
  entity::{ActivityLog, LessonLearned, ReadLog, Role, SopSummary, Update, User},
};
use rusqlite::Row;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Fixed-width RFC 3339 (nanoseconds, `Z`), so text order is time order.
pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Nanos, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn decode_opt_dt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── Role ────────────────────────────────────────────────────────────────────

pub fn encode_role(r: Role) -> &'static str {
  match r {
    Role::Admin => "admin",
    Role::Editor => "editor",
    Role::User => "user",
  }
}

pub fn decode_role(s: &str) -> Result<Role> {
  s.parse()
    .map_err(|_| Error::Core(loopin_core::Error::UnknownRole(s.to_owned())))
}

// ─── Tags ────────────────────────────────────────────────────────────────────

pub fn encode_tags(tags: Option<&[String]>) -> Result<Option<String>> {
  Ok(tags.map(serde_json::to_string).transpose()?)
}

pub fn decode_tags(s: Option<&str>) -> Result<Option<Vec<String>>> {
  Ok(s.map(serde_json::from_str).transpose()?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:            i64,
  pub username:      String,
  pub display_name:  String,
  pub email:         Option<String>,
  pub password_hash: String,
  pub role:          String,
  pub created_at:    Option<String>,
  pub is_active:     bool,
}

impl RawUser {
  pub const COLUMNS: &'static str =
    "id, username, display_name, email, password_hash, role, created_at, is_active";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      username:      row.get(1)?,
      display_name:  row.get(2)?,
      email:         row.get(3)?,
      password_hash: row.get(4)?,
      role:          row.get(5)?,
      created_at:    row.get(6)?,
      is_active:     row.get(7)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:            self.id,
      username:      self.username,
      display_name:  self.display_name,
      email:         self.email,
      password_hash: self.password_hash,
      role:          decode_role(&self.role)?,
      created_at:    decode_opt_dt(self.created_at.as_deref())?,
      is_active:     self.is_active,
    })
  }
}

/// Raw values read from an `updates` or `archived_updates` row.
pub struct RawUpdate {
  pub id:        String,
  pub name:      String,
  pub process:   String,
  pub message:   String,
  pub timestamp: String,
}

impl RawUpdate {
  pub const COLUMNS: &'static str = "id, name, process, message, timestamp";
  pub const WIDTH: usize = 5;

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:        row.get(0)?,
      name:      row.get(1)?,
      process:   row.get(2)?,
      message:   row.get(3)?,
      timestamp: row.get(4)?,
    })
  }

  pub fn into_update(self) -> Result<Update> {
    Ok(Update {
      id:        self.id,
      name:      self.name,
      process:   self.process,
      message:   self.message,
      timestamp: decode_dt(&self.timestamp)?,
    })
  }
}

/// Raw values read from a `sop_summaries` or `archived_sop_summaries` row.
pub struct RawSop {
  pub id:           i64,
  pub title:        String,
  pub summary_text: String,
  pub department:   Option<String>,
  pub tags:         Option<String>,
  pub created_at:   String,
}

impl RawSop {
  pub const COLUMNS: &'static str = "id, title, summary_text, department, tags, created_at";
  pub const WIDTH: usize = 6;

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      title:        row.get(1)?,
      summary_text: row.get(2)?,
      department:   row.get(3)?,
      tags:         row.get(4)?,
      created_at:   row.get(5)?,
    })
  }

  pub fn into_sop(self) -> Result<SopSummary> {
    Ok(SopSummary {
      id:           self.id,
      title:        self.title,
      summary_text: self.summary_text,
      department:   self.department,
      tags:         decode_tags(self.tags.as_deref())?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read from a `lessons_learned` or `archived_lessons_learned` row.
pub struct RawLesson {
  pub id:         i64,
  pub title:      String,
  pub content:    String,
  pub summary:    Option<String>,
  pub author:     Option<String>,
  pub department: Option<String>,
  pub tags:       Option<String>,
  pub created_at: String,
  pub updated_at: Option<String>,
}

impl RawLesson {
  pub const COLUMNS: &'static str =
    "id, title, content, summary, author, department, tags, created_at, updated_at";
  pub const WIDTH: usize = 9;

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      title:      row.get(1)?,
      content:    row.get(2)?,
      summary:    row.get(3)?,
      author:     row.get(4)?,
      department: row.get(5)?,
      tags:       row.get(6)?,
      created_at: row.get(7)?,
      updated_at: row.get(8)?,
    })
  }

  pub fn into_lesson(self) -> Result<LessonLearned> {
    Ok(LessonLearned {
      id:         self.id,
      title:      self.title,
      content:    self.content,
      summary:    self.summary,
      author:     self.author,
      department: self.department,
      tags:       decode_tags(self.tags.as_deref())?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_opt_dt(self.updated_at.as_deref())?,
    })
  }
}

/// Raw values read directly from a `read_logs` row.
pub struct RawReadLog {
  pub id:         i64,
  pub update_id:  String,
  pub user_id:    Option<i64>,
  pub guest_name: Option<String>,
  pub timestamp:  String,
  pub ip_address: Option<String>,
  pub user_agent: Option<String>,
}

impl RawReadLog {
  pub const COLUMNS: &'static str =
    "id, update_id, user_id, guest_name, timestamp, ip_address, user_agent";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      update_id:  row.get(1)?,
      user_id:    row.get(2)?,
      guest_name: row.get(3)?,
      timestamp:  row.get(4)?,
      ip_address: row.get(5)?,
      user_agent: row.get(6)?,
    })
  }

  pub fn into_read_log(self) -> Result<ReadLog> {
    Ok(ReadLog {
      id:         self.id,
      update_id:  self.update_id,
      user_id:    self.user_id,
      guest_name: self.guest_name,
      timestamp:  decode_dt(&self.timestamp)?,
      ip_address: self.ip_address,
      user_agent: self.user_agent,
    })
  }
}

/// Raw values read directly from an `activity_logs` row.
pub struct RawActivity {
  pub id:           i64,
  pub user_id:      Option<i64>,
  pub action:       String,
  pub entity_type:  String,
  pub entity_id:    String,
  pub entity_title: Option<String>,
  pub timestamp:    String,
  pub ip_address:   Option<String>,
  pub user_agent:   Option<String>,
  pub details:      Option<String>,
}

impl RawActivity {
  pub const COLUMNS: &'static str = "id, user_id, action, entity_type, entity_id, \
                                     entity_title, timestamp, ip_address, user_agent, details";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      user_id:      row.get(1)?,
      action:       row.get(2)?,
      entity_type:  row.get(3)?,
      entity_id:    row.get(4)?,
      entity_title: row.get(5)?,
      timestamp:    row.get(6)?,
      ip_address:   row.get(7)?,
      user_agent:   row.get(8)?,
      details:      row.get(9)?,
    })
  }

  pub fn into_activity(self) -> Result<ActivityLog> {
    Ok(ActivityLog {
      id:           self.id,
      user_id:      self.user_id,
      action:       self.action,
      entity_type:  self.entity_type,
      entity_id:    self.entity_id,
      entity_title: self.entity_title,
      timestamp:    decode_dt(&self.timestamp)?,
      ip_address:   self.ip_address,
      user_agent:   self.user_agent,
      details:      self.details,
    })
  }
}

/// The two archival columns that trail every archive-table row.
pub struct RawStamp {
  pub archived_at: String,
  pub archived_by: Option<i64>,
}

impl RawStamp {
  pub const COLUMNS: &'static str = "archived_at, archived_by";

  /// Read the stamp from the columns following the first `offset` content
  /// columns.
  pub fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      archived_at: row.get(offset)?,
      archived_by: row.get(offset + 1)?,
    })
  }

  pub fn wrap<T>(self, item: T) -> Result<Archived<T>> {
    Ok(Archived {
      item,
      archived_at: decode_dt(&self.archived_at)?,
      archived_by: self.archived_by,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn dt_round_trips_sub_second_precision() {
    let dt = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
    assert_eq!(decode_dt(&encode_dt(dt)).unwrap(), dt);
  }

  #[test]
  fn encoded_dt_sorts_as_text() {
    let a = encode_dt(Utc.timestamp_opt(1_700_000_005, 0).unwrap());
    let b = encode_dt(Utc.timestamp_opt(1_700_000_005, 500_000_000).unwrap());
    assert_eq!(a, "2023-11-14T22:13:25.000000000Z");
    assert!(a < b);
  }

  #[test]
  fn dt_with_offset_decodes_to_same_instant() {
    let dt = decode_dt("2024-03-01T10:30:00+05:30").unwrap();
    assert_eq!(dt, Utc.with_ymd_and_hms(2024, 3, 1, 5, 0, 0).unwrap());
  }

  #[test]
  fn tags_null_and_empty_are_distinct() {
    assert_eq!(encode_tags(None).unwrap(), None);
    let empty: Vec<String> = vec![];
    assert_eq!(encode_tags(Some(empty.as_slice())).unwrap().as_deref(), Some("[]"));
    assert_eq!(decode_tags(Some("[]")).unwrap(), Some(vec![]));
    assert_eq!(decode_tags(None).unwrap(), None);
  }

  #[test]
  fn unknown_role_is_rejected() {
    assert!(matches!(
      decode_role("superuser"),
      Err(Error::Core(loopin_core::Error::UnknownRole(_)))
    ));
    assert_eq!(decode_role(encode_role(Role::Editor)).unwrap(), Role::Editor);
  }
}
