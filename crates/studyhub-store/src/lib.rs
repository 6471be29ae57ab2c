//! # studyhub-store
//!
//! Durable local state for the StudyHub+ client, backed by SQLite.
//!
//! The client keeps almost nothing across sessions: the daily login streak
//! and the score of the last focus session. Both live in a small key-value
//! table behind the [`KvStore`] trait so the counters can run against an
//! in-memory map in tests.

pub mod counters;
pub mod database;
pub mod kv;
pub mod migrations;

mod error;

pub use counters::Counters;
pub use database::Database;
pub use error::StoreError;
pub use kv::{KvStore, MemoryStore};
