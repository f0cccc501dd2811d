//! Write-through cache engine for Stash.
//!
//! The [`Engine`] owns an in-memory map of every record and the durable
//! [`RecordStore`](stash_store::RecordStore) behind it. Reads are served
//! from memory only; every mutation reaches the durable store before it
//! becomes visible in the cache, so the two never diverge through the
//! engine's own API.

pub mod engine;
pub mod error;

pub use engine::Engine;
pub use error::{EngineError, EngineResult};
