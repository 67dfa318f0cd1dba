//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{TimeZone as _, Utc};
use loopin_core::{
  archive::{ArchiveOutcome, ArchivedContent, DeleteOutcome},
  content::{Content, ContentKind, ContentRef},
  entity::{
    ActivityLog, NewActivity, NewLesson, NewReadLog, NewSop, NewUser, Role, Update, User,
  },
  snapshot::SnapshotData,
  store::BoardStore,
};

use crate::{Error, SqliteStore, encode::encode_dt};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn update(id: &str, name: &str, message: &str) -> Update {
  Update {
    id:        id.into(),
    name:      name.into(),
    process:   "billing".into(),
    message:   message.into(),
    timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
  }
}

fn sop(title: &str) -> NewSop {
  NewSop {
    title:        title.into(),
    summary_text: format!("{title} summary"),
    department:   Some("ops".into()),
    tags:         Some(vec!["escalation".into(), "p1".into()]),
  }
}

/// A store with two users, an update with a read receipt, a SOP, a lesson,
/// and an activity entry.
async fn populated() -> SqliteStore {
  let s = store().await;
  let admin = s
    .add_user(NewUser {
      role: Role::Admin,
      email: Some("ada@example.com".into()),
      password_hash: "pbkdf2:sha256$abc".into(),
      ..NewUser::new("ada", "Ada")
    })
    .await
    .unwrap();
  s.add_user(NewUser::new("bob", "Bob")).await.unwrap();

  let u = s.add_update(update("u-1", "Ada", "Deploy at noon")).await.unwrap();
  s.record_read(NewReadLog {
    update_id: u.id.clone(),
    user_id: Some(admin.id),
    ip_address: Some("10.0.0.1".into()),
    ..Default::default()
  })
  .await
  .unwrap();
  s.record_read(NewReadLog {
    update_id: u.id.clone(),
    guest_name: Some("visitor".into()),
    ..Default::default()
  })
  .await
  .unwrap();

  s.add_sop(sop("Pager rotation")).await.unwrap();
  s.add_lesson(NewLesson {
    title: "Outage retro".into(),
    content: "Check the cert expiry".into(),
    author: Some("Ada".into()),
    ..Default::default()
  })
  .await
  .unwrap();
  s.log_activity(NewActivity {
    user_id: Some(admin.id),
    action: "created".into(),
    entity_type: "update".into(),
    entity_id: u.id.clone(),
    entity_title: Some(u.name.clone()),
    ..Default::default()
  })
  .await
  .unwrap();
  s
}

/// Write a live update row directly, bypassing the store's admission checks.
async fn force_live_update(s: &SqliteStore, u: Update) {
  s.connection()
    .call(move |conn| {
      conn.execute(
        "INSERT INTO updates (id, name, process, message, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![u.id, u.name, u.process, u.message, encode_dt(u.timestamp)],
      )?;
      Ok(())
    })
    .await
    .unwrap();
}

async fn twin_count(s: &SqliteStore, kind: ContentKind) -> usize {
  s.list_archived(kind).await.unwrap().len()
}

// ─── Live rows ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_update() {
  let s = store().await;
  let u = s.add_update(update("abc123", "Alice", "hello")).await.unwrap();

  let fetched = s.get_content(ContentRef::Update("abc123".into())).await.unwrap();
  assert_eq!(fetched, Some(Content::Update(u)));
}

#[tokio::test]
async fn sops_get_sequential_ids() {
  let s = store().await;
  let a = s.add_sop(sop("A")).await.unwrap();
  let b = s.add_sop(sop("B")).await.unwrap();
  assert!(a.id > 0);
  assert_eq!(b.id, a.id + 1);

  let all = s.list_content(ContentKind::Sop).await.unwrap();
  assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn get_missing_content_returns_none() {
  let s = store().await;
  let got = s.get_content(ContentRef::Lesson(42)).await.unwrap();
  assert!(got.is_none());
}

// ─── Archival gate ───────────────────────────────────────────────────────────

#[tokio::test]
async fn archive_twice_writes_one_twin() {
  let s = store().await;
  let u: Content = s.add_update(update("u-1", "Ada", "hi")).await.unwrap().into();

  let first = s.archive(&u, Some(1)).await.unwrap();
  let second = s.archive(&u, Some(1)).await.unwrap();

  assert_eq!(first, ArchiveOutcome::Archived);
  assert_eq!(second, ArchiveOutcome::AlreadyArchived);
  assert_eq!(twin_count(&s, ContentKind::Update).await, 1);
}

#[tokio::test]
async fn archive_without_identity_is_invalid_and_writes_nothing() {
  let s = store().await;
  let blank = Content::Update(update("", "Ada", "hi"));

  let err = s.archive(&blank, None).await.unwrap_err();
  assert!(matches!(err, Error::Core(loopin_core::Error::InvalidEntity(_))));
  assert_eq!(twin_count(&s, ContentKind::Update).await, 0);
}

#[tokio::test]
async fn archive_copies_fields_and_stamps_actor() {
  let s = store().await;
  let lesson = s
    .add_lesson(NewLesson {
      title: "Retro".into(),
      content: "Body".into(),
      summary: Some("Short".into()),
      tags: Some(vec!["db".into()]),
      ..Default::default()
    })
    .await
    .unwrap();
  let before = Utc::now();

  s.archive(&lesson.clone().into(), Some(7)).await.unwrap();

  let twin = s
    .get_archived(ContentRef::Lesson(lesson.id))
    .await
    .unwrap()
    .unwrap();
  let ArchivedContent::Lesson(a) = twin else { panic!("wrong kind") };
  assert_eq!(a.item, lesson);
  assert_eq!(a.archived_by, Some(7));
  assert!(a.archived_at >= before);
}

#[tokio::test]
async fn delete_content_archives_then_removes_live_row() {
  let s = store().await;
  let sop: Content = s.add_sop(sop("Pager")).await.unwrap().into();

  let outcome = s.delete_content(&sop, None).await.unwrap();
  assert_eq!(outcome, DeleteOutcome::ArchivedAndDeleted);

  assert!(s.get_content(sop.id_ref()).await.unwrap().is_none());
  let twin = s.get_archived(sop.id_ref()).await.unwrap().unwrap();
  assert_eq!(twin.archived_by(), None);
  assert_eq!(twin.into_content(), sop);
}

#[tokio::test]
async fn failed_archival_keeps_live_row() {
  let s = store().await;
  let u: Content = s.add_update(update("u-1", "Ada", "keep me")).await.unwrap().into();

  // Make the archive table unusable so the twin cannot be written.
  s.connection()
    .call(|conn| {
      conn.execute_batch("DROP TABLE archived_updates")?;
      Ok(())
    })
    .await
    .unwrap();

  let outcome = s.delete_content(&u, Some(1)).await.unwrap();
  assert!(matches!(outcome, DeleteOutcome::ArchivalFailed { .. }));
  assert!(!outcome.is_deleted());
  assert_eq!(s.get_content(u.id_ref()).await.unwrap(), Some(u));
}

#[tokio::test]
async fn retried_delete_is_harmless() {
  let s = store().await;
  let u: Content = s.add_update(update("u-1", "Ada", "hi")).await.unwrap().into();

  assert!(s.delete_content(&u, Some(1)).await.unwrap().is_deleted());
  assert!(s.delete_content(&u, Some(1)).await.unwrap().is_deleted());
  assert_eq!(twin_count(&s, ContentKind::Update).await, 1);
}

#[tokio::test]
async fn concurrent_deletes_of_same_entity_leave_one_twin() {
  let s = store().await;
  let u: Content = s.add_update(update("u-1", "Ada", "hi")).await.unwrap().into();

  let (a, b) = tokio::join!(s.delete_content(&u, Some(1)), s.delete_content(&u, Some(2)));
  assert!(a.unwrap().is_deleted());
  assert!(b.unwrap().is_deleted());
  assert_eq!(twin_count(&s, ContentKind::Update).await, 1);
  assert!(s.get_content(u.id_ref()).await.unwrap().is_none());
}

#[tokio::test]
async fn add_update_rejects_key_held_by_twin() {
  let s = store().await;
  let u: Content = s.add_update(update("abc123", "Alice", "hello")).await.unwrap().into();
  s.delete_content(&u, None).await.unwrap();

  let err = s.add_update(update("abc123", "Bob", "different")).await.unwrap_err();
  assert!(matches!(err, Error::IdentityInUse(ContentRef::Update(ref k)) if k == "abc123"));
  assert!(s.get_content(u.id_ref()).await.unwrap().is_none());

  s.add_update(update("fresh", "Bob", "x")).await.unwrap();
  let err = s.add_update(update("fresh", "Bob", "again")).await.unwrap_err();
  assert!(matches!(err, Error::IdentityInUse(_)));
}

#[tokio::test]
async fn twin_with_other_content_blocks_delete() {
  let s = store().await;
  let alice: Content = s.add_update(update("abc123", "Alice", "hello")).await.unwrap().into();
  s.delete_content(&alice, None).await.unwrap();

  // A live row under the archived key, written outside the store.
  let bob = update("abc123", "Bob", "different");
  force_live_update(&s, bob.clone()).await;
  let bob: Content = bob.into();

  let err = s.archive(&bob, Some(1)).await.unwrap_err();
  assert!(matches!(err, Error::ArchiveConflict(_)));

  let outcome = s.delete_content(&bob, Some(1)).await.unwrap();
  assert!(matches!(outcome, DeleteOutcome::ArchivalFailed { .. }));
  assert_eq!(s.get_content(bob.id_ref()).await.unwrap(), Some(bob.clone()));
  let twin = s.get_archived(bob.id_ref()).await.unwrap().unwrap();
  assert_eq!(twin.into_content(), alice);
}

#[tokio::test]
async fn gated_delete_appends_activity_entry() {
  let s = populated().await;
  let before = s.export_snapshot().await.unwrap().activity_logs.len();
  let admin = s.export_snapshot().await.unwrap().users[0].id;
  let sop = s.list_content(ContentKind::Sop).await.unwrap().remove(0);

  s.delete_content(&sop, Some(admin)).await.unwrap();
  // A retry deletes nothing and records nothing.
  s.delete_content(&sop, Some(admin)).await.unwrap();

  let log = s.export_snapshot().await.unwrap().activity_logs;
  assert_eq!(log.len(), before + 1);
  let entry = log.last().unwrap();
  assert_eq!(entry.action, "deleted");
  assert_eq!(entry.entity_type, "sop");
  assert_eq!(entry.entity_id, sop.id_ref().key());
  assert_eq!(entry.entity_title.as_deref(), Some("Pager rotation"));
  assert_eq!(entry.user_id, Some(admin));
}

#[tokio::test]
async fn unknown_actor_is_logged_as_system() {
  let s = store().await;
  let u: Content = s.add_update(update("u-1", "Ada", "hi")).await.unwrap().into();

  assert!(s.delete_content(&u, Some(404)).await.unwrap().is_deleted());

  let log = s.export_snapshot().await.unwrap().activity_logs;
  assert_eq!(log.len(), 1);
  assert_eq!(log[0].user_id, None);
  assert_eq!(log[0].entity_id, "u-1");
  // The twin still records who asked.
  assert_eq!(s.get_archived(u.id_ref()).await.unwrap().unwrap().archived_by(), Some(404));
}

#[tokio::test]
async fn failed_archival_writes_no_activity() {
  let s = store().await;
  let u: Content = s.add_update(update("u-1", "Ada", "keep me")).await.unwrap().into();
  s.connection()
    .call(|conn| {
      conn.execute_batch("DROP TABLE archived_updates")?;
      Ok(())
    })
    .await
    .unwrap();

  s.delete_content(&u, None).await.unwrap();
  assert!(s.export_snapshot().await.unwrap().activity_logs.is_empty());
}

#[tokio::test]
async fn deleting_update_drops_its_read_receipts() {
  let s = populated().await;
  let u = s.get_content(ContentRef::Update("u-1".into())).await.unwrap().unwrap();

  s.delete_content(&u, Some(1)).await.unwrap();

  let data = s.export_snapshot().await.unwrap();
  assert!(data.read_logs.is_empty());
}

// ─── Restoration gate ────────────────────────────────────────────────────────

#[tokio::test]
async fn archive_and_restore_update_scenario() {
  let s = store().await;
  let original = s.add_update(update("abc123", "Alice", "hello")).await.unwrap();
  let content: Content = original.clone().into();

  assert!(s.delete_content(&content, Some(1)).await.unwrap().is_deleted());
  let twin = s
    .get_archived(ContentRef::Update("abc123".into()))
    .await
    .unwrap()
    .expect("twin exists");
  assert!(twin.archived_at() <= Utc::now());
  assert!(s.get_content(content.id_ref()).await.unwrap().is_none());

  let id = ContentRef::parse(ContentKind::Update, "abc123").unwrap();
  let restored = s.restore_archived(id.clone()).await.unwrap();
  let Content::Update(r) = &restored else { panic!("wrong kind") };
  assert_eq!(r.id, "abc123");
  assert_eq!(r.name, "Alice");
  assert_eq!(r.message, "hello");
  assert_eq!(r, &original);

  assert_eq!(s.get_content(id.clone()).await.unwrap(), Some(restored));
  assert!(s.get_archived(id).await.unwrap().is_none());
}

#[tokio::test]
async fn restored_sop_gets_new_identity() {
  let s = store().await;
  let old = s.add_sop(sop("Old")).await.unwrap();
  s.delete_content(&old.clone().into(), None).await.unwrap();

  // Unrelated content created after the deletion.
  let newer = s.add_sop(sop("Newer")).await.unwrap();

  let restored = s.restore_archived(ContentRef::Sop(old.id)).await.unwrap();
  let Content::Sop(r) = restored else { panic!("wrong kind") };
  assert_ne!(r.id, old.id);
  assert_ne!(r.id, newer.id);
  assert_eq!(r.title, old.title);
  assert_eq!(r.tags, old.tags);
  assert_eq!(r.created_at, old.created_at);

  assert!(s.get_content(ContentRef::Sop(r.id)).await.unwrap().is_some());
  assert!(s.get_archived(ContentRef::Sop(old.id)).await.unwrap().is_none());
}

#[tokio::test]
async fn restore_missing_twin_is_not_found() {
  let s = store().await;
  let err = s.restore_archived(ContentRef::Lesson(9)).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(ContentRef::Lesson(9))));
}

#[tokio::test]
async fn restore_conflict_leaves_twin_untouched() {
  let s = store().await;
  let u: Content = s.add_update(update("abc123", "Alice", "hello")).await.unwrap().into();
  s.delete_content(&u, None).await.unwrap();

  // The key is taken again by a row written outside the store.
  force_live_update(&s, update("abc123", "Bob", "different")).await;

  let err = s.restore_archived(u.id_ref()).await.unwrap_err();
  assert!(matches!(err, Error::IdentityInUse(_)));
  assert!(s.get_archived(u.id_ref()).await.unwrap().is_some());

  let Some(Content::Update(live)) = s.get_content(u.id_ref()).await.unwrap() else {
    panic!("live row missing")
  };
  assert_eq!(live.name, "Bob");
}

#[tokio::test]
async fn purge_removes_twin_permanently() {
  let s = store().await;
  let u: Content = s.add_update(update("u-1", "Ada", "hi")).await.unwrap().into();
  s.delete_content(&u, None).await.unwrap();

  s.purge_archived(u.id_ref()).await.unwrap();
  assert!(s.get_archived(u.id_ref()).await.unwrap().is_none());

  let err = s.purge_archived(u.id_ref()).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
  let err = s.restore_archived(u.id_ref()).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn list_archived_is_newest_first() {
  let s = store().await;
  for id in ["a", "b", "c"] {
    let u: Content = s.add_update(update(id, "Ada", "hi")).await.unwrap().into();
    s.delete_content(&u, None).await.unwrap();
  }

  let twins = s.list_archived(ContentKind::Update).await.unwrap();
  assert_eq!(twins.len(), 3);
  assert!(twins.windows(2).all(|w| w[0].archived_at() >= w[1].archived_at()));
}

#[tokio::test]
async fn racing_restore_and_rearchive_keep_twin_xor_live() {
  let s = store().await;
  let u: Content = s.add_update(update("u-1", "Ada", "hi")).await.unwrap().into();
  s.delete_content(&u, None).await.unwrap();

  let (restored, deleted) =
    tokio::join!(s.restore_archived(u.id_ref()), s.delete_content(&u, Some(2)));
  restored.unwrap();
  assert!(deleted.unwrap().is_deleted());

  let live = s.get_content(u.id_ref()).await.unwrap().is_some();
  let twin = s.get_archived(u.id_ref()).await.unwrap().is_some();
  assert!(live != twin, "live={live} twin={twin}");
}

// ─── Snapshot export / replay ────────────────────────────────────────────────

#[tokio::test]
async fn export_excludes_archive_tables() {
  let s = populated().await;
  let lesson = s.list_content(ContentKind::Lesson).await.unwrap().remove(0);
  s.delete_content(&lesson, Some(1)).await.unwrap();

  let data = s.export_snapshot().await.unwrap();
  assert!(data.lessons_learned.is_empty());
  assert_eq!(data.users.len(), 2);
  assert_eq!(data.read_logs.len(), 2);
}

#[tokio::test]
async fn replay_into_empty_store_reproduces_every_row() {
  let source = populated().await;
  let data = source.export_snapshot().await.unwrap();

  let target = store().await;
  target.replay_snapshot(data.clone()).await.unwrap();

  assert_eq!(target.export_snapshot().await.unwrap(), data);
}

#[tokio::test]
async fn replay_replaces_existing_rows() {
  let source = populated().await;
  let data = source.export_snapshot().await.unwrap();

  let target = store().await;
  target.add_user(NewUser::new("zed", "Zed")).await.unwrap();
  target.add_update(update("stale", "Zed", "gone soon")).await.unwrap();

  target.replay_snapshot(data.clone()).await.unwrap();
  assert_eq!(target.export_snapshot().await.unwrap(), data);
}

#[tokio::test]
async fn replay_drops_twins_of_revived_content() {
  let s = populated().await;
  let lesson = s.list_content(ContentKind::Lesson).await.unwrap().remove(0);
  s.delete_content(&lesson, Some(1)).await.unwrap();
  let snapshot = s.export_snapshot().await.unwrap();

  let sop = s.list_content(ContentKind::Sop).await.unwrap().remove(0);
  s.delete_content(&sop, Some(1)).await.unwrap();
  assert_eq!(twin_count(&s, ContentKind::Sop).await, 1);

  s.replay_snapshot(snapshot).await.unwrap();

  // The SOP is live again and its twin is gone.
  assert_eq!(s.get_content(sop.id_ref()).await.unwrap(), Some(sop.clone()));
  assert!(s.get_archived(sop.id_ref()).await.unwrap().is_none());
  let err = s.restore_archived(sop.id_ref()).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
  assert_eq!(s.list_content(ContentKind::Sop).await.unwrap().len(), 1);

  // The lesson was already deleted at snapshot time; its twin stays.
  assert!(s.get_content(lesson.id_ref()).await.unwrap().is_none());
  assert!(s.get_archived(lesson.id_ref()).await.unwrap().is_some());

  // And the revived row goes through the gate again normally.
  assert!(s.delete_content(&sop, None).await.unwrap().is_deleted());
}

#[tokio::test]
async fn replay_failure_on_last_record_rolls_everything_back() {
  let s = populated().await;
  let before = s.export_snapshot().await.unwrap();

  // A fresh user and update up front, then a duplicate activity id as the
  // very last record.
  let mut data: SnapshotData = before.clone();
  data.users.push(User {
    id: 99,
    username: "late".into(),
    email: None,
    ..data.users[0].clone()
  });
  data.updates.push(update("u-2", "Late", "never lands"));
  let dup: ActivityLog = data.activity_logs[0].clone();
  data.activity_logs.push(dup);

  let err = s.replay_snapshot(data).await.unwrap_err();
  assert!(matches!(err, Error::Transaction(_)));
  assert_eq!(s.export_snapshot().await.unwrap(), before);
}
