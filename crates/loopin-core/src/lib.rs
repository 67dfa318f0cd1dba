//! Core types and trait definitions for the LoopIn durable-state subsystem.
//!
//! This crate has no database or filesystem dependencies.
//! It defines the live entities, their archive twins, the snapshot artifact
//! schema, and the [`BoardStore`](store::BoardStore) abstraction that storage
//! backends implement.

pub mod archive;
pub mod content;
pub mod entity;
pub mod error;
pub mod snapshot;
pub mod store;

pub use error::{Error, Result};
