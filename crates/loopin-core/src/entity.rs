//! Live entities: the rows owned by the surrounding board application.
//!
//! Field names match the persisted column names exactly; the snapshot
//! artifact serialises these structs directly, so renaming a field here is a
//! format change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

// ─── Users ───────────────────────────────────────────────────────────────────

/// Access level of a board user.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Admin,
  Editor,
  #[default]
  User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:            i64,
  pub username:      String,
  pub display_name:  String,
  pub email:         Option<String>,
  pub password_hash: String,
  pub role:          Role,
  pub created_at:    Option<DateTime<Utc>>,
  pub is_active:     bool,
}

/// Input for [`BoardStore::add_user`](crate::store::BoardStore::add_user).
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:      String,
  pub display_name:  String,
  pub email:         Option<String>,
  pub password_hash: String,
  pub role:          Role,
}

impl NewUser {
  pub fn new(username: impl Into<String>, display_name: impl Into<String>) -> Self {
    Self {
      username:      username.into(),
      display_name:  display_name.into(),
      email:         None,
      password_hash: String::new(),
      role:          Role::default(),
    }
  }
}

// ─── Content ─────────────────────────────────────────────────────────────────

/// A board announcement. Identity is an opaque, caller-chosen string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
  pub id:        String,
  pub name:      String,
  pub process:   String,
  pub message:   String,
  pub timestamp: DateTime<Utc>,
}

impl Update {
  /// Build an update with a fresh identity (lowercase hex UUID).
  pub fn new(
    name: impl Into<String>,
    process: impl Into<String>,
    message: impl Into<String>,
  ) -> Self {
    Self {
      id:        Uuid::new_v4().simple().to_string(),
      name:      name.into(),
      process:   process.into(),
      message:   message.into(),
      timestamp: Utc::now(),
    }
  }
}

/// A standard-operating-procedure summary. Identity is auto-assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SopSummary {
  pub id:           i64,
  pub title:        String,
  pub summary_text: String,
  pub department:   Option<String>,
  pub tags:         Option<Vec<String>>,
  pub created_at:   DateTime<Utc>,
}

/// Input for [`BoardStore::add_sop`](crate::store::BoardStore::add_sop).
#[derive(Debug, Clone, Default)]
pub struct NewSop {
  pub title:        String,
  pub summary_text: String,
  pub department:   Option<String>,
  pub tags:         Option<Vec<String>>,
}

/// A lessons-learned write-up. Identity is auto-assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonLearned {
  pub id:         i64,
  pub title:      String,
  pub content:    String,
  pub summary:    Option<String>,
  pub author:     Option<String>,
  pub department: Option<String>,
  pub tags:       Option<Vec<String>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: Option<DateTime<Utc>>,
}

/// Input for [`BoardStore::add_lesson`](crate::store::BoardStore::add_lesson).
#[derive(Debug, Clone, Default)]
pub struct NewLesson {
  pub title:      String,
  pub content:    String,
  pub summary:    Option<String>,
  pub author:     Option<String>,
  pub department: Option<String>,
  pub tags:       Option<Vec<String>>,
}

// ─── Logs ────────────────────────────────────────────────────────────────────

/// A read receipt for an update, by a user or a named guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadLog {
  pub id:         i64,
  pub update_id:  String,
  pub user_id:    Option<i64>,
  pub guest_name: Option<String>,
  pub timestamp:  DateTime<Utc>,
  pub ip_address: Option<String>,
  pub user_agent: Option<String>,
}

/// Input for [`BoardStore::record_read`](crate::store::BoardStore::record_read).
#[derive(Debug, Clone, Default)]
pub struct NewReadLog {
  pub update_id:  String,
  pub user_id:    Option<i64>,
  pub guest_name: Option<String>,
  pub ip_address: Option<String>,
  pub user_agent: Option<String>,
}

/// Audit trail entry for an action taken on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLog {
  pub id:           i64,
  pub user_id:      Option<i64>,
  /// `created`, `edited`, `deleted`, ...
  pub action:       String,
  /// `update`, `sop`, `lesson`, `backup`, ...
  pub entity_type:  String,
  pub entity_id:    String,
  pub entity_title: Option<String>,
  pub timestamp:    DateTime<Utc>,
  pub ip_address:   Option<String>,
  pub user_agent:   Option<String>,
  pub details:      Option<String>,
}

/// Input for [`BoardStore::log_activity`](crate::store::BoardStore::log_activity).
#[derive(Debug, Clone, Default)]
pub struct NewActivity {
  pub user_id:      Option<i64>,
  pub action:       String,
  pub entity_type:  String,
  pub entity_id:    String,
  pub entity_title: Option<String>,
  pub ip_address:   Option<String>,
  pub user_agent:   Option<String>,
  pub details:      Option<String>,
}
