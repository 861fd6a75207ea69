//! # LedgerTx — Staged Invocation Transaction
//!
//! The write-ahead buffer for one invocation. It exposes the four
//! composite-key operations the workflows are written against:
//!
//! - [`put`](LedgerTx::put): upsert under an exact key
//! - [`delete`](LedgerTx::delete): remove an exact key; absent is fine
//! - [`lookup_exact`](LedgerTx::lookup_exact): one exact single-part lookup
//!   *per element* of the input, misses skipped
//! - [`scan_by_prefix`](LedgerTx::scan_by_prefix): every record under a
//!   partial key, in key order
//!
//! Reads see the invocation's own staged writes. Nothing reaches the
//! [`StateStore`] until [`commit`](LedgerTx::commit), which hands the whole
//! buffer over as one [`WriteBatch`]. Dropping a `LedgerTx` discards it.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

use super::key;
use super::kv::{StateStore, StoreError, StoreResult, WriteBatch};
use crate::context::TxContext;

pub struct LedgerTx<'a> {
    store: &'a dyn StateStore,
    context: TxContext,
    /// `Some(value)` is a staged put, `None` a staged delete.
    staged: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> LedgerTx<'a> {
    pub fn begin(store: &'a dyn StateStore, context: TxContext) -> Self {
        Self {
            store,
            context,
            staged: BTreeMap::new(),
        }
    }

    pub fn context(&self) -> &TxContext {
        &self.context
    }

    /// Number of keys with a staged mutation.
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    // -- Composite-key operations -------------------------------------------

    /// Upsert `value` under `(object_type, parts)`.
    pub fn put<S, T>(&mut self, object_type: &str, parts: &[S], value: &T) -> StoreResult<()>
    where
        S: AsRef<str>,
        T: Serialize,
    {
        let key = key::encode(object_type, parts)?;
        let bytes = serde_json::to_vec(value)
            .map_err(|e| StoreError::Serialization(format!("{object_type}: {e}")))?;
        self.staged.insert(key, Some(bytes));
        Ok(())
    }

    /// Remove the record under `(object_type, parts)` if there is one.
    pub fn delete<S: AsRef<str>>(&mut self, object_type: &str, parts: &[S]) -> StoreResult<()> {
        let key = key::encode(object_type, parts)?;
        self.staged.insert(key, None);
        Ok(())
    }

    /// Read the record stored under exactly `(object_type, parts)`.
    pub fn get<S, T>(&self, object_type: &str, parts: &[S]) -> StoreResult<Option<T>>
    where
        S: AsRef<str>,
        T: DeserializeOwned,
    {
        let key = key::encode(object_type, parts)?;
        self.read(&key)?
            .map(|bytes| deserialize(object_type, &bytes))
            .transpose()
    }

    /// For each id, an independent lookup of `(object_type, id)`.
    ///
    /// The ids are never combined into one multi-part key. Found records are
    /// returned in input order; ids with no record are skipped.
    pub fn lookup_exact<S, T>(&self, object_type: &str, ids: &[S]) -> StoreResult<Vec<T>>
    where
        S: AsRef<str>,
        T: DeserializeOwned,
    {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get(object_type, &[id.as_ref()])? {
                found.push(record);
            }
        }
        Ok(found)
    }

    /// Every record whose key extends `(object_type, prefix..)`, in key
    /// order. An empty prefix returns every record of the type.
    pub fn scan_by_prefix<S, T>(&self, object_type: &str, prefix: &[S]) -> StoreResult<Vec<T>>
    where
        S: AsRef<str>,
        T: DeserializeOwned,
    {
        let prefix = key::encode(object_type, prefix)?;
        self.scan(&prefix)?
            .into_values()
            .map(|bytes| deserialize(object_type, &bytes))
            .collect()
    }

    /// Every record of `object_type`.
    pub fn scan_all<T: DeserializeOwned>(&self, object_type: &str) -> StoreResult<Vec<T>> {
        self.scan_by_prefix::<&str, T>(object_type, &[])
    }

    // -- Commit -------------------------------------------------------------

    /// Flush every staged mutation as one atomic batch. Returns the number
    /// of operations written.
    pub fn commit(self) -> StoreResult<usize> {
        if self.staged.is_empty() {
            return Ok(0);
        }

        let mut batch = WriteBatch::new();
        for (key, value) in self.staged {
            match value {
                Some(value) => batch.put(key, value),
                None => batch.delete(key),
            }
        }
        let ops = batch.len();
        self.store.apply(batch)?;
        tracing::debug!(tx_id = %self.context.tx_id, ops, "ledger transaction committed");
        Ok(ops)
    }

    // -- Internals ----------------------------------------------------------

    fn read(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        match self.staged.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => self.store.get(key),
        }
    }

    /// Committed entries under `prefix` overlaid with staged mutations.
    fn scan(&self, prefix: &[u8]) -> StoreResult<BTreeMap<Vec<u8>, Vec<u8>>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.store.scan_prefix(prefix)?.into_iter().collect();

        let staged = self
            .staged
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix));
        for (key, value) in staged {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged)
    }
}

fn deserialize<T: DeserializeOwned>(object_type: &str, bytes: &[u8]) -> StoreResult<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| StoreError::Serialization(format!("{object_type}: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
