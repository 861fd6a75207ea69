// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Estate Ledger — World State Library
//!
//! The storage half of the estate ledger: a deterministic key-value world
//! state addressed by composite keys, plus the per-invocation transaction
//! that stages every write until the invocation succeeds.
//!
//! Every peer that replays the same invocation against the same state must
//! land on byte-identical results. That rules out three things in here:
//! wall-clock reads, hash-ordered iteration, and partial writes.
//!
//! ## Architecture
//!
//! - **storage** — Composite-key codec, the `StateStore` backends (sled and
//!   in-memory), and `LedgerTx`, the write-ahead staging buffer.
//! - **context** — `TxContext`, the platform-supplied transaction id and
//!   timestamp from which all identifiers are derived.
//! - **account** — The externally provisioned `Account` record and its role.
//! - **config** — Object type tags and deployment defaults.
//!
//! ## Design Philosophy
//!
//! 1. Queries are prefix scans over composite keys. No secondary indexes.
//! 2. An invocation either commits one atomic batch or writes nothing.
//! 3. Iteration order is byte order. Always.

pub mod account;
pub mod config;
pub mod context;
pub mod storage;

pub use account::{Account, Role};
pub use context::{ContextError, TxContext};
pub use storage::{LedgerTx, MemoryStore, SledStore, StateStore, StoreError, StoreResult};
