use stash_types::{Record, Value};

use crate::error::StoreResult;

/// A durable, keyed store of JSON values.
///
/// This is the only boundary Stash needs from its persistence layer. Each
/// backend provides its own `open` constructor; after that:
/// - `put` overwrites any previous value for the key;
/// - `delete` of an absent key succeeds without effect;
/// - `list_all` returns every live record, one per key, in no particular
///   order guaranteed by the contract;
/// - all I/O errors are propagated, never silently ignored.
pub trait RecordStore: Send + Sync {
    /// Every live record in the store.
    fn list_all(&self) -> StoreResult<Vec<Record>>;

    /// Create or overwrite the record for `key`.
    fn put(&self, key: &str, value: &Value) -> StoreResult<()>;

    /// Remove the record for `key`, if any.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Remove every record. Irreversible.
    fn delete_all(&self) -> StoreResult<()>;
}
