//! # Storage Module
//!
//! The world state behind every invocation. Records are opaque JSON values
//! filed under composite keys; the only query primitive is a prefix scan.
//!
//! ## Architecture
//!
//! ```text
//! key.rs    — Order-preserving composite key codec
//! kv.rs     — StateStore trait, WriteBatch, StoreError
//! memory.rs — BTreeMap-backed store for tests and scratch ledgers
//! db.rs     — sled persistence, one tree for the whole world state
//! tx.rs     — LedgerTx: staged reads/writes, committed as one batch
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! workflow op → LedgerTx (staged) → WriteBatch → StateStore::apply
//!                  ↑    reads fall through to the store
//! ```
//!
//! Writes never reach the store until `LedgerTx::commit`. A failed
//! invocation drops its `LedgerTx` and the staged writes go with it.

pub mod db;
pub mod key;
pub mod kv;
pub mod memory;
pub mod tx;

pub use db::SledStore;
pub use kv::{StateStore, StoreError, StoreResult, WriteBatch, WriteOp};
pub use memory::MemoryStore;
pub use tx::LedgerTx;
