//! In-memory world state.
//!
//! A `BTreeMap` behind a `parking_lot::RwLock`. Byte-ordered like sled, so
//! scan results match the persistent backend exactly.

use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::kv::{StateStore, StoreResult, WriteBatch, WriteOp};

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of the full contents. Tests use it to assert that a rejected
    /// invocation left the state untouched.
    pub fn snapshot(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.entries.read().clone()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn apply(&self, batch: WriteBatch) -> StoreResult<()> {
        // Single write guard: readers see the state before or after the
        // batch, never in between.
        let mut entries = self.entries.write();
        for op in batch {
            match op {
                WriteOp::Put(key, value) => {
                    entries.insert(key, value);
                }
                WriteOp::Delete(key) => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_delete() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put(b"k1".to_vec(), b"v1".to_vec());
        store.apply(batch).unwrap();
        assert_eq!(store.get(b"k1").unwrap(), Some(b"v1".to_vec()));

        let mut batch = WriteBatch::new();
        batch.delete(b"k1".to_vec());
        batch.delete(b"never-existed".to_vec());
        store.apply(batch).unwrap();
        assert!(store.get(b"k1").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn scan_prefix_is_ordered_and_bounded() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        for key in ["b/2", "a/1", "b/1", "c/1", "b"] {
            batch.put(key.as_bytes().to_vec(), key.as_bytes().to_vec());
        }
        store.apply(batch).unwrap();

        let keys: Vec<Vec<u8>> = store
            .scan_prefix(b"b/")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"b/1".to_vec(), b"b/2".to_vec()]);
        assert_eq!(store.scan_prefix(b"").unwrap().len(), 5);
    }

    #[test]
    fn later_ops_in_batch_win() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.put(b"k".to_vec(), b"first".to_vec());
        batch.put(b"k".to_vec(), b"second".to_vec());
        store.apply(batch).unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"second".to_vec()));
        assert_eq!(store.len(), 1);
    }
}
