//! # SledStore — Persistent World State
//!
//! The persistence layer for the estate ledger, built on sled's embedded
//! key-value store. All on-disk data flows through this module.
//!
//! ## Tree Layout
//!
//! Every record lives in a single tree, `world_state`, keyed by its
//! composite key (see [`super::key`]):
//!
//! | Object type           | Key parts                        | Value          |
//! |-----------------------|----------------------------------|----------------|
//! | `account-key`         | `account_id`                     | `json(Account)` |
//! | `real-estate-key`     | `owner_id, asset_id`             | `json(RealEstate)` |
//! | `sale-offer-key`      | `seller_id, asset_id`            | `json(SaleOffer)` |
//! | `purchase-record-key` | `buyer_id, nanos`                | `json(PurchaseRecord)` |
//! | `donation-offer-key`  | `donor_id, asset_id, grantee_id` | `json(DonationOffer)` |
//! | `donation-record-key` | `grantee_id, nanos`              | `json(DonationRecord)` |
//!
//! One tree rather than one per type: composite keys already partition the
//! keyspace by type, and a single tree lets one `Batch` cover every record
//! an invocation touches.
//!
//! ## Atomicity
//!
//! `apply` turns a [`WriteBatch`] into a sled `Batch` and applies it to the
//! tree in one call. Either every put and delete lands or none does.

use sled::{Batch, Db, Tree};
use std::path::Path;

use super::kv::{StateStore, StoreResult, WriteBatch, WriteOp};
use crate::config::WORLD_STATE_TREE;

/// Persistent world state.
///
/// sled handles are reference counted, so cloning a `SledStore` is cheap and
/// every clone sees the same data.
#[derive(Debug, Clone)]
pub struct SledStore {
    /// The underlying sled database handle.
    db: Db,
    /// All records, keyed by composite key.
    state: Tree,
}

impl SledStore {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is removed when dropped.
    pub fn open_temporary() -> StoreResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let state = db.open_tree(WORLD_STATE_TREE)?;
        Ok(Self { db, state })
    }

    /// Number of records across every object type.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Block until all applied batches are durable.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl StateStore for SledStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.state.get(key)?.map(|v| v.to_vec()))
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut entries = Vec::new();
        for result in self.state.scan_prefix(prefix) {
            let (key, value) = result?;
            entries.push((key.to_vec(), value.to_vec()));
        }
        Ok(entries)
    }

    fn apply(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut sled_batch = Batch::default();
        for op in batch {
            match op {
                WriteOp::Put(key, value) => sled_batch.insert(key, value),
                WriteOp::Delete(key) => sled_batch.remove(key),
            }
        }
        self.state.apply_batch(sled_batch)?;
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
