use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use stash_types::{Record, Value};

use crate::error::{StoreError, StoreResult};
use crate::traits::RecordStore;

/// In-memory, HashMap-based record store.
///
/// Intended for tests and ephemeral stores. Nothing survives the process.
/// The store can be switched to read-only to simulate a failing backend.
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<String, Value>>,
    read_only: AtomicBool,
}

impl InMemoryRecordStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            read_only: AtomicBool::new(false),
        }
    }

    /// Create a store pre-populated with `records`.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.records.write() {
            map.extend(records.into_iter().map(|r| (r.key, r.value)));
        }
        store
    }

    /// Make every subsequent write fail with [`StoreError::ReadOnly`].
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// The persisted value for `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.records.read().ok()?.get(key).cloned()
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.read().map(|map| map.len()).unwrap_or(0)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::ReadOnly);
        }
        Ok(())
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn list_all(&self) -> StoreResult<Vec<Record>> {
        let map = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map
            .iter()
            .map(|(k, v)| Record::new(k.clone(), v.clone()))
            .collect())
    }

    fn put(&self, key: &str, value: &Value) -> StoreResult<()> {
        self.check_writable()?;
        let mut map = self.records.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.check_writable()?;
        let mut map = self.records.write().map_err(|_| StoreError::Poisoned)?;
        map.remove(key);
        Ok(())
    }

    fn delete_all(&self) -> StoreResult<()> {
        self.check_writable()?;
        self.records
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .clear();
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRecordStore")
            .field("record_count", &self.len())
            .field("read_only", &self.read_only.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_and_list() {
        let store = InMemoryRecordStore::new();
        store.put("a", &json!(1)).unwrap();
        store.put("b", &json!({"x": true})).unwrap();

        let mut records = store.list_all().unwrap();
        records.sort_by(|l, r| l.key.cmp(&r.key));
        assert_eq!(
            records,
            vec![
                Record::new("a", json!(1)),
                Record::new("b", json!({"x": true}))
            ]
        );
    }

    #[test]
    fn put_overwrites() {
        let store = InMemoryRecordStore::new();
        store.put("k", &json!("old")).unwrap();
        store.put("k", &json!("new")).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("k"), Some(json!("new")));
    }

    #[test]
    fn delete_present_and_missing() {
        let store = InMemoryRecordStore::new();
        store.put("k", &json!(1)).unwrap();
        store.delete("k").unwrap();
        assert!(store.get("k").is_none());
        // Deleting again is a no-op.
        store.delete("k").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn delete_all_empties() {
        let store = InMemoryRecordStore::new();
        store.put("a", &json!(1)).unwrap();
        store.put("b", &json!(2)).unwrap();
        store.delete_all().unwrap();
        assert!(store.is_empty());
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn with_records_prepopulates() {
        let store = InMemoryRecordStore::with_records([Record::new("seed", json!([1, 2]))]);
        assert_eq!(store.get("seed"), Some(json!([1, 2])));
    }

    #[test]
    fn read_only_rejects_writes() {
        let store = InMemoryRecordStore::new();
        store.put("k", &json!(1)).unwrap();
        store.set_read_only(true);

        assert!(matches!(store.put("k", &json!(2)), Err(StoreError::ReadOnly)));
        assert!(matches!(store.delete("k"), Err(StoreError::ReadOnly)));
        assert!(matches!(store.delete_all(), Err(StoreError::ReadOnly)));
        assert_eq!(store.get("k"), Some(json!(1)));

        store.set_read_only(false);
        store.put("k", &json!(2)).unwrap();
        assert_eq!(store.get("k"), Some(json!(2)));
    }

    #[test]
    fn debug_format() {
        let store = InMemoryRecordStore::new();
        store.put("x", &json!(null)).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryRecordStore"));
        assert!(debug.contains("record_count"));
    }
}
