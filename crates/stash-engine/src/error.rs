use stash_store::StoreError;
use thiserror::Error;

/// Errors from cache engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An operation ran before `init()` populated the cache.
    #[error("engine is not initialized; call init() first")]
    NotInitialized,

    /// The durable record store failed; the cache was left unchanged.
    #[error("record store error: {0}")]
    Store(#[from] StoreError),

    /// An internal lock was poisoned by a panicking thread.
    #[error("engine lock poisoned")]
    Poisoned,
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
