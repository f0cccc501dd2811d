use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard};

use stash_store::RecordStore;
use stash_types::{Mapping, Value};
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};

type Cache = HashMap<String, Value>;

/// In-memory cache kept in lockstep with a durable record store.
///
/// Per-key lifecycle: absent → `save` → present → `save`/`update` →
/// present → `delete`/`clear_all` → absent.
///
/// # Concurrency
///
/// Mutations are serialized by a single writer lock. Each mutation writes
/// the durable store first and only then swaps the new value into the
/// cache, holding the cache lock just for the in-memory change. Readers
/// therefore never wait on durable I/O, and a failed durable write leaves
/// the cache untouched.
///
/// Every operation other than [`init`](Engine::init) fails with
/// [`EngineError::NotInitialized`] until the cache has been loaded.
pub struct Engine {
    store: Arc<dyn RecordStore>,
    /// `None` until `init()` has loaded the durable records.
    cache: RwLock<Option<Cache>>,
    writer: Mutex<()>,
}

impl Engine {
    /// Create an engine over `store`. Call [`init`](Engine::init) before use.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(None),
            writer: Mutex::new(()),
        }
    }

    /// Load every persisted record into the cache.
    ///
    /// Calling `init` again reloads the cache from the durable store.
    /// Returns the number of records loaded.
    pub fn init(&self) -> EngineResult<usize> {
        let _guard = self.lock_writer()?;
        let records = self.store.list_all()?;
        let loaded: Cache = records.into_iter().map(|r| (r.key, r.value)).collect();
        let count = loaded.len();

        *self.cache.write().map_err(|_| EngineError::Poisoned)? = Some(loaded);
        info!(records = count, "cache initialized from record store");
        Ok(count)
    }

    /// Whether [`init`](Engine::init) has completed.
    pub fn is_initialized(&self) -> bool {
        self.cache.read().map(|c| c.is_some()).unwrap_or(false)
    }

    /// The cached value for `key`. Never touches the durable store.
    pub fn read(&self, key: &str) -> EngineResult<Option<Value>> {
        Ok(self.cache_read()?.get(key).cloned())
    }

    /// Overwrite the value for `key` in both the durable store and the cache.
    pub fn save(&self, key: &str, value: Value) -> EngineResult<()> {
        let _guard = self.lock_writer()?;
        self.ensure_initialized()?;
        self.save_locked(key, value)
    }

    /// Shallow-merge `partial` into the mapping stored at `key`.
    ///
    /// Entries in `partial` override same-named entries; other existing
    /// entries are kept. Nested mappings are replaced, not merged. If the
    /// key is absent or does not hold a mapping, `partial` is saved as is.
    /// Returns the value that was stored.
    pub fn update(&self, key: &str, partial: Mapping) -> EngineResult<Value> {
        let _guard = self.lock_writer()?;
        let existing = self.cache_read()?.get(key).cloned();

        let merged = match existing {
            Some(Value::Object(mut current)) => {
                current.extend(partial);
                Value::Object(current)
            }
            _ => Value::Object(partial),
        };

        self.save_locked(key, merged.clone())?;
        Ok(merged)
    }

    /// Remove `key` from the durable store and the cache.
    ///
    /// Removing an absent key is a no-op.
    pub fn delete(&self, key: &str) -> EngineResult<()> {
        let _guard = self.lock_writer()?;
        if !self.cache_read()?.contains_key(key) {
            debug!(key = %key, "delete of absent key");
            return Ok(());
        }

        self.store.delete(key)?;
        if let Some(cache) = self.cache.write().map_err(|_| EngineError::Poisoned)?.as_mut() {
            cache.remove(key);
        }
        debug!(key = %key, "record deleted");
        Ok(())
    }

    /// Empty the durable store and the cache. Irreversible.
    pub fn clear_all(&self) -> EngineResult<()> {
        let _guard = self.lock_writer()?;
        self.ensure_initialized()?;

        self.store.delete_all()?;
        if let Some(cache) = self.cache.write().map_err(|_| EngineError::Poisoned)?.as_mut() {
            cache.clear();
        }
        info!("all records cleared");
        Ok(())
    }

    pub fn contains(&self, key: &str) -> EngineResult<bool> {
        Ok(self.cache_read()?.contains_key(key))
    }

    pub fn len(&self) -> EngineResult<usize> {
        Ok(self.cache_read()?.len())
    }

    pub fn is_empty(&self) -> EngineResult<bool> {
        Ok(self.cache_read()?.is_empty())
    }

    /// All cached keys, sorted.
    pub fn keys(&self) -> EngineResult<Vec<String>> {
        let cache = self.cache_read()?;
        let mut keys: Vec<String> = cache.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    /// A point-in-time copy of the whole cache.
    pub fn snapshot(&self) -> EngineResult<BTreeMap<String, Value>> {
        Ok(self
            .cache_read()?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    /// Durable write, then cache write. Caller holds the writer lock.
    fn save_locked(&self, key: &str, value: Value) -> EngineResult<()> {
        self.store.put(key, &value)?;

        let mut cache = self.cache.write().map_err(|_| EngineError::Poisoned)?;
        let cache = cache.as_mut().ok_or(EngineError::NotInitialized)?;
        cache.insert(key.to_string(), value);
        debug!(key = %key, "record saved");
        Ok(())
    }

    fn lock_writer(&self) -> EngineResult<MutexGuard<'_, ()>> {
        self.writer.lock().map_err(|_| EngineError::Poisoned)
    }

    fn ensure_initialized(&self) -> EngineResult<()> {
        self.cache_read().map(|_| ())
    }

    fn cache_read(&self) -> EngineResult<CacheRead<'_>> {
        let guard = self.cache.read().map_err(|_| EngineError::Poisoned)?;
        if guard.is_none() {
            return Err(EngineError::NotInitialized);
        }
        Ok(CacheRead(guard))
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self
            .cache
            .read()
            .ok()
            .and_then(|c| c.as_ref().map(HashMap::len));
        f.debug_struct("Engine")
            .field("initialized", &cached.is_some())
            .field("cached_records", &cached.unwrap_or(0))
            .finish()
    }
}

/// Read guard over an initialized cache.
struct CacheRead<'a>(RwLockReadGuard<'a, Option<Cache>>);

impl std::ops::Deref for CacheRead<'_> {
    type Target = Cache;

    fn deref(&self) -> &Cache {
        // `cache_read` only builds this guard over `Some`.
        match self.0.as_ref() {
            Some(cache) => cache,
            None => unreachable!("CacheRead constructed over an uninitialized cache"),
        }
    }
}
