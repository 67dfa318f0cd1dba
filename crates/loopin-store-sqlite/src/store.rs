//! [`SqliteStore`], the SQLite implementation of [`BoardStore`].

use std::path::Path;

use chrono::Utc;
use loopin_core::{
  archive::{ArchiveOutcome, ArchivedContent, DeleteOutcome},
  content::{Content, ContentKind, ContentRef},
  entity::{
    ActivityLog, LessonLearned, NewActivity, NewLesson, NewReadLog, NewSop, NewUser, ReadLog,
    SopSummary, Update, User,
  },
  snapshot::SnapshotData,
  store::BoardStore,
};

use crate::{
  Error, Result, archive,
  schema::SCHEMA,
  snapshot,
  tables::{
    get_content, insert_activity, insert_lesson, insert_read_log, insert_sop, insert_user,
    list_content,
  },
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A LoopIn entity store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All clones
/// share one connection thread, so operations on the same store never
/// interleave.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }
}

// ─── BoardStore impl ─────────────────────────────────────────────────────────

impl BoardStore for SqliteStore {
  type Error = Error;

  // ── Live rows ─────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    let mut user = User {
      id:            0,
      username:      input.username,
      display_name:  input.display_name,
      email:         input.email,
      password_hash: input.password_hash,
      role:          input.role,
      created_at:    Some(Utc::now()),
      is_active:     true,
    };

    let row = user.clone();
    user.id = self
      .conn
      .call(move |conn| Ok(insert_user(conn, None, &row)))
      .await??;
    Ok(user)
  }

  async fn add_update(&self, update: Update) -> Result<Update> {
    let row = update.clone();
    self
      .conn
      .call(move |conn| Ok(archive::in_transaction(conn, |tx| archive::admit_update(tx, &row))))
      .await??;
    Ok(update)
  }

  async fn add_sop(&self, input: NewSop) -> Result<SopSummary> {
    let mut sop = SopSummary {
      id:           0,
      title:        input.title,
      summary_text: input.summary_text,
      department:   input.department,
      tags:         input.tags,
      created_at:   Utc::now(),
    };

    let row = sop.clone();
    sop.id = self
      .conn
      .call(move |conn| Ok(insert_sop(conn, None, &row)))
      .await??;
    Ok(sop)
  }

  async fn add_lesson(&self, input: NewLesson) -> Result<LessonLearned> {
    let now = Utc::now();
    let mut lesson = LessonLearned {
      id:         0,
      title:      input.title,
      content:    input.content,
      summary:    input.summary,
      author:     input.author,
      department: input.department,
      tags:       input.tags,
      created_at: now,
      updated_at: Some(now),
    };

    let row = lesson.clone();
    lesson.id = self
      .conn
      .call(move |conn| Ok(insert_lesson(conn, None, &row)))
      .await??;
    Ok(lesson)
  }

  async fn record_read(&self, input: NewReadLog) -> Result<ReadLog> {
    let mut log = ReadLog {
      id:         0,
      update_id:  input.update_id,
      user_id:    input.user_id,
      guest_name: input.guest_name,
      timestamp:  Utc::now(),
      ip_address: input.ip_address,
      user_agent: input.user_agent,
    };

    let row = log.clone();
    log.id = self
      .conn
      .call(move |conn| Ok(insert_read_log(conn, None, &row)))
      .await??;
    Ok(log)
  }

  async fn log_activity(&self, input: NewActivity) -> Result<ActivityLog> {
    let mut entry = ActivityLog {
      id:           0,
      user_id:      input.user_id,
      action:       input.action,
      entity_type:  input.entity_type,
      entity_id:    input.entity_id,
      entity_title: input.entity_title,
      timestamp:    Utc::now(),
      ip_address:   input.ip_address,
      user_agent:   input.user_agent,
      details:      input.details,
    };

    let row = entry.clone();
    entry.id = self
      .conn
      .call(move |conn| Ok(insert_activity(conn, None, &row)))
      .await??;
    Ok(entry)
  }

  async fn get_content(&self, id: ContentRef) -> Result<Option<Content>> {
    self
      .conn
      .call(move |conn| Ok(get_content(conn, &id)))
      .await?
  }

  async fn list_content(&self, kind: ContentKind) -> Result<Vec<Content>> {
    self
      .conn
      .call(move |conn| Ok(list_content(conn, kind)))
      .await?
  }

  // ── Archival gate ─────────────────────────────────────────────────────────

  async fn archive(&self, content: &Content, actor: Option<i64>) -> Result<ArchiveOutcome> {
    let content = content.clone();
    self
      .conn
      .call(move |conn| {
        Ok(archive::in_transaction(conn, |tx| {
          archive::archive(tx, &content, actor)
        }))
      })
      .await?
  }

  async fn delete_content(
    &self,
    content: &Content,
    actor: Option<i64>,
  ) -> Result<DeleteOutcome> {
    let content = content.clone();
    self
      .conn
      .call(move |conn| Ok(archive::archive_then_delete(conn, &content, actor)))
      .await?
  }

  // ── Restoration gate ──────────────────────────────────────────────────────

  async fn restore_archived(&self, id: ContentRef) -> Result<Content> {
    self
      .conn
      .call(move |conn| Ok(archive::in_transaction(conn, |tx| archive::restore(tx, &id))))
      .await?
  }

  async fn get_archived(&self, id: ContentRef) -> Result<Option<ArchivedContent>> {
    self
      .conn
      .call(move |conn| Ok(archive::get_archived(conn, &id)))
      .await?
  }

  async fn list_archived(&self, kind: ContentKind) -> Result<Vec<ArchivedContent>> {
    self
      .conn
      .call(move |conn| Ok(archive::list_archived(conn, kind)))
      .await?
  }

  async fn purge_archived(&self, id: ContentRef) -> Result<()> {
    self
      .conn
      .call(move |conn| Ok(archive::in_transaction(conn, |tx| archive::purge(tx, &id))))
      .await?
  }

  // ── Snapshots ─────────────────────────────────────────────────────────────

  async fn export_snapshot(&self) -> Result<SnapshotData> {
    self
      .conn
      .call(|conn| Ok(snapshot::export(conn)))
      .await?
  }

  async fn replay_snapshot(&self, data: SnapshotData) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        Ok(archive::in_transaction(conn, |tx| snapshot::replay(tx, &data)))
      })
      .await?
  }
}
