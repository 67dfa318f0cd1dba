//! Archive twins and the outcomes of the archival gate.
//!
//! Every destructive operation on a [`Content`] row first copies it into the
//! matching archive table. A twin for identity *I* exists exactly while the
//! live row for *I* is deleted and not yet restored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  content::{Content, ContentKind, ContentRef},
  entity::{LessonLearned, SopSummary, Update},
};

// ─── Twins ───────────────────────────────────────────────────────────────────

/// A deleted content row plus the archival metadata.
///
/// Serialises flat: the content fields followed by `archived_at` and
/// `archived_by`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archived<T> {
  #[serde(flatten)]
  pub item:        T,
  /// Always UTC.
  pub archived_at: DateTime<Utc>,
  /// The acting user, or `None` when the system archived on its own behalf.
  pub archived_by: Option<i64>,
}

pub type ArchivedUpdate = Archived<Update>;
pub type ArchivedSopSummary = Archived<SopSummary>;
pub type ArchivedLessonLearned = Archived<LessonLearned>;

/// An archive twin of any of the three content kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ArchivedContent {
  Update(ArchivedUpdate),
  Sop(ArchivedSopSummary),
  Lesson(ArchivedLessonLearned),
}

impl ArchivedContent {
  /// Wrap a live row into its twin, stamped now.
  pub fn stamp(content: Content, archived_by: Option<i64>) -> Self {
    let archived_at = Utc::now();
    match content {
      Content::Update(item) => Self::Update(Archived { item, archived_at, archived_by }),
      Content::Sop(item) => Self::Sop(Archived { item, archived_at, archived_by }),
      Content::Lesson(item) => Self::Lesson(Archived { item, archived_at, archived_by }),
    }
  }

  pub fn kind(&self) -> ContentKind {
    match self {
      Self::Update(_) => ContentKind::Update,
      Self::Sop(_) => ContentKind::Sop,
      Self::Lesson(_) => ContentKind::Lesson,
    }
  }

  pub fn id_ref(&self) -> ContentRef {
    match self {
      Self::Update(a) => ContentRef::Update(a.item.id.clone()),
      Self::Sop(a) => ContentRef::Sop(a.item.id),
      Self::Lesson(a) => ContentRef::Lesson(a.item.id),
    }
  }

  pub fn archived_at(&self) -> DateTime<Utc> {
    match self {
      Self::Update(a) => a.archived_at,
      Self::Sop(a) => a.archived_at,
      Self::Lesson(a) => a.archived_at,
    }
  }

  pub fn archived_by(&self) -> Option<i64> {
    match self {
      Self::Update(a) => a.archived_by,
      Self::Sop(a) => a.archived_by,
      Self::Lesson(a) => a.archived_by,
    }
  }

  /// Drop the archival metadata, yielding the content as it was when deleted.
  pub fn into_content(self) -> Content {
    match self {
      Self::Update(a) => Content::Update(a.item),
      Self::Sop(a) => Content::Sop(a.item),
      Self::Lesson(a) => Content::Lesson(a.item),
    }
  }
}

// ─── Gate outcomes ───────────────────────────────────────────────────────────

/// Successful result of the archival gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
  /// A new twin was written.
  Archived,
  /// A twin with this identity already existed; nothing was written.
  AlreadyArchived,
}

/// Result of a gated delete. The two variants must never be conflated by a
/// caller presenting them to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
  /// The twin is committed and the live row is gone.
  ArchivedAndDeleted,
  /// Archival failed; the live row was left in place.
  ArchivalFailed { reason: String },
}

impl DeleteOutcome {
  pub fn is_deleted(&self) -> bool { matches!(self, Self::ArchivedAndDeleted) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn twin_serialises_flat() {
    let update = Update {
      id:        "abc123".into(),
      name:      "Alice".into(),
      process:   "ops".into(),
      message:   "hello".into(),
      timestamp: Utc::now(),
    };
    let twin = ArchivedContent::stamp(update.into(), Some(3));
    let ArchivedContent::Update(a) = twin else { panic!("wrong variant") };

    let json = serde_json::to_value(&a).unwrap();
    let obj = json.as_object().unwrap();
    assert_eq!(obj["id"], "abc123");
    assert_eq!(obj["archived_by"], 3);
    assert!(obj.contains_key("archived_at"));
    assert!(!obj.contains_key("item"));
  }

  #[test]
  fn into_content_drops_stamp() {
    let sop = SopSummary {
      id:           9,
      title:        "Escalation".into(),
      summary_text: "Call the lead".into(),
      department:   None,
      tags:         Some(vec!["oncall".into()]),
      created_at:   Utc::now(),
    };
    let twin = ArchivedContent::stamp(sop.clone().into(), None);
    assert_eq!(twin.id_ref(), ContentRef::Sop(9));
    assert_eq!(twin.archived_by(), None);
    assert_eq!(twin.into_content(), Content::Sop(sop));
  }
}
