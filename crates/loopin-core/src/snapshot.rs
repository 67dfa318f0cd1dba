//! The snapshot artifact schema.
//!
//! An artifact is one JSON document:
//!
//! ```json
//! {
//!   "metadata": { "timestamp": "...", "type": "manual", "version": "1.0", "app_name": "loopin" },
//!   "data": { "users": [...], "updates": [...], "read_logs": [...],
//!             "sop_summaries": [...], "lessons_learned": [...], "activity_logs": [...] }
//! }
//! ```
//!
//! Archive tables are not part of a snapshot. Timestamps are RFC 3339 UTC.

use std::{convert::Infallible, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{ActivityLog, LessonLearned, ReadLog, SopSummary, Update, User};

/// Artifact format written by this crate.
pub const FORMAT_VERSION: &str = "1.0";

/// Collection names in export (and replay) order.
pub const COLLECTIONS: [&str; 6] = [
  "users",
  "updates",
  "read_logs",
  "sop_summaries",
  "lessons_learned",
  "activity_logs",
];

// ─── Kind ────────────────────────────────────────────────────────────────────

/// Why a snapshot was taken. Serialised as a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SnapshotKind {
  #[default]
  Manual,
  Scheduled,
  Other(String),
}

impl SnapshotKind {
  pub fn as_str(&self) -> &str {
    match self {
      Self::Manual => "manual",
      Self::Scheduled => "scheduled",
      Self::Other(s) => s,
    }
  }

  /// The kind as it may appear inside an artifact file name.
  pub fn file_label(&self) -> String { file_label(self.as_str()) }
}

/// `s` reduced to lowercase ASCII alphanumerics and `-`, never empty.
pub fn file_label(s: &str) -> String {
  let label: String = s
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() {
        c.to_ascii_lowercase()
      } else {
        '-'
      }
    })
    .collect();
  if label.is_empty() { "unnamed".to_owned() } else { label }
}

impl From<String> for SnapshotKind {
  fn from(s: String) -> Self {
    match s.as_str() {
      "manual" => Self::Manual,
      "scheduled" => Self::Scheduled,
      _ => Self::Other(s),
    }
  }
}

impl From<SnapshotKind> for String {
  fn from(k: SnapshotKind) -> Self {
    match k {
      SnapshotKind::Other(s) => s,
      other => other.as_str().to_owned(),
    }
  }
}

impl FromStr for SnapshotKind {
  type Err = Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(s.to_owned().into()) }
}

impl fmt::Display for SnapshotKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

// ─── Document ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
  pub timestamp: DateTime<Utc>,
  #[serde(rename = "type")]
  pub kind:      SnapshotKind,
  pub version:   String,
  pub app_name:  String,
}

impl SnapshotMetadata {
  pub fn new(kind: SnapshotKind, app_name: impl Into<String>) -> Self {
    Self {
      timestamp: Utc::now(),
      kind,
      version: FORMAT_VERSION.to_owned(),
      app_name: app_name.into(),
    }
  }
}

/// Every live collection, in export order. Missing collections read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotData {
  #[serde(default)]
  pub users:           Vec<User>,
  #[serde(default)]
  pub updates:         Vec<Update>,
  #[serde(default)]
  pub read_logs:       Vec<ReadLog>,
  #[serde(default)]
  pub sop_summaries:   Vec<SopSummary>,
  #[serde(default)]
  pub lessons_learned: Vec<LessonLearned>,
  #[serde(default)]
  pub activity_logs:   Vec<ActivityLog>,
}

impl SnapshotData {
  /// Record count per collection, in [`COLLECTIONS`] order.
  pub fn counts(&self) -> [(&'static str, usize); 6] {
    [
      (COLLECTIONS[0], self.users.len()),
      (COLLECTIONS[1], self.updates.len()),
      (COLLECTIONS[2], self.read_logs.len()),
      (COLLECTIONS[3], self.sop_summaries.len()),
      (COLLECTIONS[4], self.lessons_learned.len()),
      (COLLECTIONS[5], self.activity_logs.len()),
    ]
  }

  pub fn total_records(&self) -> usize { self.counts().iter().map(|(_, n)| n).sum() }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
  pub metadata: SnapshotMetadata,
  pub data:     SnapshotData,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kind_round_trips_as_plain_string() {
    let json = serde_json::to_string(&SnapshotKind::Scheduled).unwrap();
    assert_eq!(json, "\"scheduled\"");
    let other: SnapshotKind = serde_json::from_str("\"pre-migration\"").unwrap();
    assert_eq!(other, SnapshotKind::Other("pre-migration".into()));
  }

  #[test]
  fn file_label_is_filename_safe() {
    assert_eq!(SnapshotKind::Manual.file_label(), "manual");
    assert_eq!(
      SnapshotKind::Other("Before Deploy/2".into()).file_label(),
      "before-deploy-2"
    );
    assert_eq!(SnapshotKind::Other(String::new()).file_label(), "unnamed");
  }

  #[test]
  fn metadata_uses_type_key() {
    let meta = SnapshotMetadata::new(SnapshotKind::Manual, "loopin");
    let json = serde_json::to_value(&meta).unwrap();
    assert_eq!(json["type"], "manual");
    assert_eq!(json["version"], FORMAT_VERSION);
    assert_eq!(json["app_name"], "loopin");
  }

  #[test]
  fn data_serialises_collections_in_export_order() {
    let json = serde_json::to_string(&SnapshotData::default()).unwrap();
    let positions: Vec<usize> = COLLECTIONS
      .iter()
      .map(|name| json.find(&format!("\"{name}\"")).unwrap())
      .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
  }
}
