//! Persistence for chain state.
//!
//! Everything goes through the [`KeyValueStore`] trait so the consensus layer can run on
//! RocksDB ([`Database`]) or fully in memory ([`MemoryDb`]). Typed stores in [`stores`]
//! stage their writes into a [`WriteBatch`], which a backend commits atomically.

pub mod db;
pub mod errors;
pub mod kv;
pub mod memory;
pub mod stores;

pub use db::Database;
pub use errors::{DbError, DbResult};
pub use kv::{Column, KeyValueStore, WriteBatch};
pub use memory::MemoryDb;
