use std::fmt::Display;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use stash_engine::Engine;
use stash_registry::{Resolved, TypeRegistry};
use stash_store::{InMemoryRecordStore, LogRecordStore, RecordStore};
use stash_types::{Candidate, Mapping, Value};
use tokio::sync::broadcast;
use tracing::info;

use crate::config::StashConfig;
use crate::error::{StashError, StashResult};
use crate::report::{Failure, Operation, Reporter};

/// High-level Stash API.
///
/// Sequences the codec, the engine, and the type registry:
///
/// - writes: value → normalize → clean → engine
/// - reads: engine → registry → typed result
///
/// Mutations (`mark`, `remark`, `erase`, `clear`) never return an error.
/// A failed mutation changes nothing and is reported through
/// [`subscribe`](Stash::subscribe) and the `tracing` log.
///
/// Retrieval comes in three tiers:
///
/// - [`try_call`](Stash::try_call) returns reconstruction errors;
/// - [`call`](Stash::call) falls back to the raw stored value when
///   reconstruction fails, reporting the failure;
/// - [`call_raw`](Stash::call_raw) skips the registry entirely.
pub struct Stash {
    engine: Engine,
    registry: TypeRegistry,
    reporter: Reporter,
}

impl Stash {
    /// Build a store from configuration. Call [`setup`](Stash::setup) before use.
    pub fn open(config: &StashConfig) -> StashResult<Self> {
        let store: Arc<dyn RecordStore> = match &config.path {
            Some(path) => {
                info!(path = %path.display(), "opening durable stash");
                Arc::new(LogRecordStore::open(path, config.log_config())?)
            }
            None => {
                info!("opening in-memory stash");
                Arc::new(InMemoryRecordStore::new())
            }
        };
        Ok(Self::from_parts(store, config.report_capacity))
    }

    /// Build a store over an existing record store.
    pub fn with_store(store: Arc<dyn RecordStore>) -> Self {
        Self::from_parts(store, StashConfig::default().report_capacity)
    }

    fn from_parts(store: Arc<dyn RecordStore>, report_capacity: usize) -> Self {
        Self {
            engine: Engine::new(store),
            registry: TypeRegistry::new(),
            reporter: Reporter::new(report_capacity),
        }
    }

    /// Load every persisted record into the cache. Returns the record count.
    ///
    /// Every other operation reports `NotInitialized` until this succeeds.
    pub fn setup(&self) -> StashResult<usize> {
        Ok(self.engine.init()?)
    }

    // ---- Registration ----

    /// Register a constructor for `T` (and, implicitly, for sequences of `T`).
    pub fn register<T, E, F>(&self, constructor: F)
    where
        T: Send + 'static,
        E: Display,
        F: Fn(Mapping) -> Result<T, E> + Send + Sync + 'static,
    {
        self.registry.register(constructor);
    }

    /// Register `T`'s serde `Deserialize` implementation as its constructor.
    pub fn register_serde<T>(&self)
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.registry.register_serde::<T>();
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    // ---- Mutations ----

    /// Store `value` at `key`, replacing whatever was there.
    pub fn mark(&self, key: &str, value: impl Into<Candidate>) {
        let result = self.try_mark(key, value.into());
        self.absorb(Operation::Mark, Some(key), result);
    }

    /// Merge a mapping into the mapping at `key`, or store a non-mapping
    /// value as `mark` would.
    pub fn remark(&self, key: &str, value: impl Into<Candidate>) {
        let result = self.try_remark(key, value.into());
        self.absorb(Operation::Remark, Some(key), result);
    }

    /// Remove `key`. Removing an absent key is not a failure.
    pub fn erase(&self, key: &str) {
        let result = self.engine.delete(key).map_err(Into::into);
        self.absorb(Operation::Erase, Some(key), result);
    }

    /// Remove every record, durably. Irreversible.
    pub fn clear(&self) {
        let result = self.engine.clear_all().map_err(Into::into);
        self.absorb(Operation::Clear, None, result);
    }

    // ---- Retrieval ----

    /// Retrieve `key` as a `T`, falling back to the raw value if the
    /// registered constructor fails.
    ///
    /// Returns `None` only for an absent key (or an unusable store, which
    /// is reported).
    pub fn call<T: 'static>(&self, key: &str) -> Option<Resolved<T>> {
        let value = self.call_raw(key)?;
        match self.registry.resolve::<T>(value.clone()) {
            Ok(resolved) => Some(resolved),
            Err(err) => {
                self.reporter.report(Operation::Call, Some(key), &StashError::from(err));
                Some(Resolved::Raw(value))
            }
        }
    }

    /// Retrieve `key` as a `T`, returning reconstruction errors.
    pub fn try_call<T: 'static>(&self, key: &str) -> StashResult<Option<Resolved<T>>> {
        match self.engine.read(key)? {
            Some(value) => Ok(Some(self.registry.resolve::<T>(value)?)),
            None => Ok(None),
        }
    }

    /// Retrieve the stored value at `key` without reconstruction.
    pub fn call_raw(&self, key: &str) -> Option<Value> {
        match self.engine.read(key) {
            Ok(value) => value,
            Err(err) => {
                self.reporter.report(Operation::Call, Some(key), &StashError::from(err));
                None
            }
        }
    }

    // ---- Inspection ----

    /// Whether `key` holds a value. An unusable store is reported and
    /// answers `false`.
    pub fn contains(&self, key: &str) -> bool {
        self.engine.contains(key).unwrap_or_else(|err| {
            self.reporter.report(Operation::Call, Some(key), &StashError::from(err));
            false
        })
    }

    /// All stored keys, sorted. An unusable store is reported and answers
    /// an empty list.
    pub fn keys(&self) -> Vec<String> {
        self.engine.keys().unwrap_or_else(|err| {
            self.reporter.report(Operation::Call, None, &StashError::from(err));
            Vec::new()
        })
    }

    /// Receive every failure reported from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Failure> {
        self.reporter.subscribe()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    // ---- Internals ----

    fn try_mark(&self, key: &str, value: Candidate) -> StashResult<()> {
        let value = stash_codec::prepare(value)?;
        self.engine.save(key, value)?;
        Ok(())
    }

    fn try_remark(&self, key: &str, value: Candidate) -> StashResult<()> {
        match stash_codec::prepare(value)? {
            Value::Object(partial) => {
                self.engine.update(key, partial)?;
            }
            other => self.engine.save(key, other)?,
        }
        Ok(())
    }

    fn absorb(&self, operation: Operation, key: Option<&str>, result: StashResult<()>) {
        if let Err(err) = result {
            self.reporter.report(operation, key, &err);
        }
    }
}

impl std::fmt::Debug for Stash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stash")
            .field("engine", &self.engine)
            .field("registry", &self.registry)
            .finish()
    }
}
