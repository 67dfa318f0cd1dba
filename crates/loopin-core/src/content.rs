//! The three primary content kinds, as a sum type.
//!
//! Updates are keyed by an opaque string chosen at creation; SOP summaries and
//! lessons are keyed by a sequential integer the database assigns. The
//! variants carry their own identity type so code that restores archived
//! content cannot confuse "reuse the key" with "issue a new key".

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{
  Error, Result,
  entity::{LessonLearned, SopSummary, Update},
};

/// Discriminant of [`Content`], spelled the way the web layer spells it.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContentKind {
  Update,
  Sop,
  Lesson,
}

/// A live content row of one of the three archivable kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Content {
  Update(Update),
  Sop(SopSummary),
  Lesson(LessonLearned),
}

impl Content {
  pub fn kind(&self) -> ContentKind {
    match self {
      Self::Update(_) => ContentKind::Update,
      Self::Sop(_) => ContentKind::Sop,
      Self::Lesson(_) => ContentKind::Lesson,
    }
  }

  pub fn id_ref(&self) -> ContentRef {
    match self {
      Self::Update(u) => ContentRef::Update(u.id.clone()),
      Self::Sop(s) => ContentRef::Sop(s.id),
      Self::Lesson(l) => ContentRef::Lesson(l.id),
    }
  }

  /// Human-readable title, as recorded in activity logs.
  pub fn title(&self) -> &str {
    match self {
      Self::Update(u) => &u.name,
      Self::Sop(s) => &s.title,
      Self::Lesson(l) => &l.title,
    }
  }
}

impl From<Update> for Content {
  fn from(u: Update) -> Self { Self::Update(u) }
}

impl From<SopSummary> for Content {
  fn from(s: SopSummary) -> Self { Self::Sop(s) }
}

impl From<LessonLearned> for Content {
  fn from(l: LessonLearned) -> Self { Self::Lesson(l) }
}

/// Kind plus identity: addresses one live or archived content row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ContentRef {
  Update(String),
  Sop(i64),
  Lesson(i64),
}

impl ContentRef {
  /// Build a reference from a kind and a textual identity (as it arrives
  /// from a URL or a command line).
  pub fn parse(kind: ContentKind, id: &str) -> Result<Self> {
    let numeric = |kind: &'static str| {
      id.parse::<i64>().map_err(|_| Error::InvalidIdentity {
        kind,
        value: id.to_owned(),
      })
    };
    Ok(match kind {
      ContentKind::Update => Self::Update(id.to_owned()),
      ContentKind::Sop => Self::Sop(numeric("sop")?),
      ContentKind::Lesson => Self::Lesson(numeric("lesson")?),
    })
  }

  pub fn kind(&self) -> ContentKind {
    match self {
      Self::Update(_) => ContentKind::Update,
      Self::Sop(_) => ContentKind::Sop,
      Self::Lesson(_) => ContentKind::Lesson,
    }
  }

  /// The bare identity, as stored in `activity_logs.entity_id`.
  pub fn key(&self) -> String {
    match self {
      Self::Update(id) => id.clone(),
      Self::Sop(id) | Self::Lesson(id) => id.to_string(),
    }
  }

  /// `true` when the identity could name a persisted row: a non-blank
  /// update key or a positive sequential id.
  pub fn is_valid(&self) -> bool {
    match self {
      Self::Update(id) => !id.trim().is_empty(),
      Self::Sop(id) | Self::Lesson(id) => *id > 0,
    }
  }
}

impl fmt::Display for ContentRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Update(id) => write!(f, "update {id:?}"),
      Self::Sop(id) => write!(f, "sop {id}"),
      Self::Lesson(id) => write!(f, "lesson {id}"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kind_parses_web_spelling() {
    assert_eq!("update".parse::<ContentKind>().unwrap(), ContentKind::Update);
    assert_eq!("sop".parse::<ContentKind>().unwrap(), ContentKind::Sop);
    assert_eq!("lesson".parse::<ContentKind>().unwrap(), ContentKind::Lesson);
    assert!("article".parse::<ContentKind>().is_err());
  }

  #[test]
  fn parse_keeps_update_keys_opaque() {
    let r = ContentRef::parse(ContentKind::Update, "abc123").unwrap();
    assert_eq!(r, ContentRef::Update("abc123".into()));
  }

  #[test]
  fn parse_rejects_non_numeric_sop_id() {
    let err = ContentRef::parse(ContentKind::Sop, "abc").unwrap_err();
    assert!(matches!(err, Error::InvalidIdentity { kind: "sop", .. }));
  }

  #[test]
  fn blank_and_non_positive_ids_are_invalid() {
    assert!(!ContentRef::Update("  ".into()).is_valid());
    assert!(!ContentRef::Sop(0).is_valid());
    assert!(!ContentRef::Lesson(-4).is_valid());
    assert!(ContentRef::Lesson(7).is_valid());
  }
}
