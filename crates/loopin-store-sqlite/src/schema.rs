//! SQL schema for the LoopIn SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    display_name  TEXT NOT NULL,
    email         TEXT UNIQUE,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL DEFAULT 'user',   -- 'admin' | 'editor' | 'user'
    created_at    TEXT,                           -- ISO 8601 UTC
    is_active     INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS updates (
    id        TEXT PRIMARY KEY,                   -- caller-chosen, opaque
    name      TEXT NOT NULL,
    process   TEXT NOT NULL,
    message   TEXT NOT NULL,
    timestamp TEXT NOT NULL
);

-- Read receipts disappear with their update.
CREATE TABLE IF NOT EXISTS read_logs (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    update_id  TEXT NOT NULL REFERENCES updates(id) ON DELETE CASCADE,
    user_id    INTEGER REFERENCES users(id),
    guest_name TEXT,
    timestamp  TEXT NOT NULL,
    ip_address TEXT,
    user_agent TEXT
);

CREATE TABLE IF NOT EXISTS sop_summaries (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    title        TEXT NOT NULL,
    summary_text TEXT NOT NULL,
    department   TEXT,
    tags         TEXT,                            -- JSON array or NULL
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS lessons_learned (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    title      TEXT NOT NULL,
    content    TEXT NOT NULL,
    summary    TEXT,
    author     TEXT,
    department TEXT,
    tags       TEXT,                              -- JSON array or NULL
    created_at TEXT NOT NULL,
    updated_at TEXT
);

CREATE TABLE IF NOT EXISTS activity_logs (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      INTEGER REFERENCES users(id),
    action       TEXT NOT NULL,
    entity_type  TEXT NOT NULL,
    entity_id    TEXT NOT NULL,
    entity_title TEXT,
    timestamp    TEXT NOT NULL,
    ip_address   TEXT,
    user_agent   TEXT,
    details      TEXT
);

-- Archive twins. `archived_by` carries no foreign key: a snapshot replay
-- rewrites `users` wholesale and must not invalidate archive rows.
CREATE TABLE IF NOT EXISTS archived_updates (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    process     TEXT NOT NULL,
    message     TEXT NOT NULL,
    timestamp   TEXT NOT NULL,
    archived_at TEXT NOT NULL,
    archived_by INTEGER
);

CREATE TABLE IF NOT EXISTS archived_sop_summaries (
    id           INTEGER PRIMARY KEY,
    title        TEXT NOT NULL,
    summary_text TEXT NOT NULL,
    department   TEXT,
    tags         TEXT,
    created_at   TEXT NOT NULL,
    archived_at  TEXT NOT NULL,
    archived_by  INTEGER
);

CREATE TABLE IF NOT EXISTS archived_lessons_learned (
    id          INTEGER PRIMARY KEY,
    title       TEXT NOT NULL,
    content     TEXT NOT NULL,
    summary     TEXT,
    author      TEXT,
    department  TEXT,
    tags        TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT,
    archived_at TEXT NOT NULL,
    archived_by INTEGER
);

CREATE INDEX IF NOT EXISTS read_logs_update_idx        ON read_logs(update_id);
CREATE INDEX IF NOT EXISTS activity_logs_timestamp_idx ON activity_logs(timestamp);
CREATE INDEX IF NOT EXISTS archived_updates_at_idx     ON archived_updates(archived_at);
CREATE INDEX IF NOT EXISTS archived_sops_at_idx        ON archived_sop_summaries(archived_at);
CREATE INDEX IF NOT EXISTS archived_lessons_at_idx     ON archived_lessons_learned(archived_at);

PRAGMA user_version = 1;
";
