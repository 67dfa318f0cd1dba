//! The `BoardStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `loopin-store-sqlite`).
//! The backup layer and the web layer depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use crate::{
  archive::{ArchiveOutcome, ArchivedContent, DeleteOutcome},
  content::{Content, ContentKind, ContentRef},
  entity::{
    ActivityLog, LessonLearned, NewActivity, NewLesson, NewReadLog, NewSop, NewUser,
    ReadLog, SopSummary, Update, User,
  },
  snapshot::SnapshotData,
};

/// Abstraction over the LoopIn entity store.
///
/// Live content is only ever removed through the archival gate
/// ([`archive`](Self::archive) followed by deletion, or
/// [`delete_content`](Self::delete_content) which does both). Archived
/// content returns to its live table through
/// [`restore_archived`](Self::restore_archived).
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait BoardStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Live rows ─────────────────────────────────────────────────────────

  /// Create a user; the id and `created_at` are assigned by the store.
  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Persist an update under its caller-chosen id. The id must not be held
  /// by a live update or by an archived one.
  fn add_update(
    &self,
    update: Update,
  ) -> impl Future<Output = Result<Update, Self::Error>> + Send + '_;

  /// Create a SOP summary; the id and `created_at` are assigned by the store.
  fn add_sop(
    &self,
    input: NewSop,
  ) -> impl Future<Output = Result<SopSummary, Self::Error>> + Send + '_;

  /// Create a lesson; the id and timestamps are assigned by the store.
  fn add_lesson(
    &self,
    input: NewLesson,
  ) -> impl Future<Output = Result<LessonLearned, Self::Error>> + Send + '_;

  fn record_read(
    &self,
    input: NewReadLog,
  ) -> impl Future<Output = Result<ReadLog, Self::Error>> + Send + '_;

  fn log_activity(
    &self,
    input: NewActivity,
  ) -> impl Future<Output = Result<ActivityLog, Self::Error>> + Send + '_;

  /// Load a live content row. Returns `None` if it does not exist.
  fn get_content(
    &self,
    id: ContentRef,
  ) -> impl Future<Output = Result<Option<Content>, Self::Error>> + Send + '_;

  /// All live rows of one kind, newest first.
  fn list_content(
    &self,
    kind: ContentKind,
  ) -> impl Future<Output = Result<Vec<Content>, Self::Error>> + Send + '_;

  // ── Archival gate ─────────────────────────────────────────────────────

  /// Copy `content` into its archive table, stamped with `actor`.
  ///
  /// Idempotent: an existing twin with the same identity and content yields
  /// [`ArchiveOutcome::AlreadyArchived`] and nothing is written. A twin with
  /// the same identity but different content is an error. An `Err` means
  /// nothing was committed, and the caller must not delete the live row.
  fn archive<'a>(
    &'a self,
    content: &'a Content,
    actor: Option<i64>,
  ) -> impl Future<Output = Result<ArchiveOutcome, Self::Error>> + Send + 'a;

  /// Archive `content`, delete its live row, and append a `deleted`
  /// activity entry, in one transaction.
  ///
  /// Archival failure is reported as [`DeleteOutcome::ArchivalFailed`] and
  /// leaves the live row in place.
  fn delete_content<'a>(
    &'a self,
    content: &'a Content,
    actor: Option<i64>,
  ) -> impl Future<Output = Result<DeleteOutcome, Self::Error>> + Send + 'a;

  // ── Restoration gate ──────────────────────────────────────────────────

  /// Move an archived row back to its live table and drop the twin.
  ///
  /// Updates keep their id. SOP summaries and lessons get a fresh id from
  /// the live table; the returned [`Content`] carries it.
  fn restore_archived(
    &self,
    id: ContentRef,
  ) -> impl Future<Output = Result<Content, Self::Error>> + Send + '_;

  fn get_archived(
    &self,
    id: ContentRef,
  ) -> impl Future<Output = Result<Option<ArchivedContent>, Self::Error>> + Send + '_;

  /// All twins of one kind, most recently archived first.
  fn list_archived(
    &self,
    kind: ContentKind,
  ) -> impl Future<Output = Result<Vec<ArchivedContent>, Self::Error>> + Send + '_;

  /// Permanently delete a twin. Irreversible.
  fn purge_archived(
    &self,
    id: ContentRef,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Snapshots ─────────────────────────────────────────────────────────

  /// Read every live collection (archive tables excluded).
  fn export_snapshot(
    &self,
  ) -> impl Future<Output = Result<SnapshotData, Self::Error>> + Send + '_;

  /// Replace every live collection with `data`, preserving identities.
  /// Twins whose identity is live again afterwards are dropped.
  ///
  /// All-or-nothing: on any error the store is left exactly as it was.
  fn replay_snapshot(
    &self,
    data: SnapshotData,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
