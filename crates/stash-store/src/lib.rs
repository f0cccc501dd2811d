//! Durable record stores for Stash.
//!
//! The Stash cache is kept write-through consistent with a durable store of
//! `(key, JSON value)` records. This crate defines that boundary and its
//! backends.
//!
//! # Storage Backends
//!
//! All backends implement the [`RecordStore`] trait:
//!
//! - [`InMemoryRecordStore`] -- `HashMap`-based store for tests and ephemeral use
//! - [`LogRecordStore`] -- append-only, CRC-framed log file
//!
//! # Design Rules
//!
//! 1. The store never interprets values -- it is a pure key-value store.
//! 2. The last write for a key wins.
//! 3. All I/O errors are propagated, never silently ignored. Corrupt log
//!    entries found during replay are the one exception: they are skipped
//!    with a warning, since they can only come from a torn write.

pub mod error;
pub mod log_store;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use log_store::{LogConfig, LogRecordStore, SyncMode};
pub use memory::InMemoryRecordStore;
pub use traits::RecordStore;
