//! SQLite backend for the LoopIn entity store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every gate operation and every
//! snapshot replay runs inside a single `rusqlite` transaction on that
//! thread.

mod archive;
mod encode;
mod schema;
mod snapshot;
mod store;
mod tables;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
