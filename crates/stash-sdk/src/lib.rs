//! High-level Stash API.
//!
//! Stash is a cache-backed persistent key-value store. Values of any shape
//! that reduces to JSON are stored write-through: every mutation reaches
//! the durable record store before it becomes visible in memory, and reads
//! are served from memory alone. A type registry turns stored mappings back
//! into typed domain objects on retrieval.
//!
//! ```
//! use stash_sdk::{Resolved, Stash, StashConfig};
//!
//! #[derive(serde::Deserialize)]
//! struct User { id: String }
//!
//! let stash = Stash::open(&StashConfig::in_memory()).unwrap();
//! stash.setup().unwrap();
//! stash.register_serde::<User>();
//!
//! stash.mark("u", serde_json::json!({"id": "1"}));
//! match stash.call::<User>("u") {
//!     Some(Resolved::Typed(user)) => assert_eq!(user.id, "1"),
//!     _ => unreachable!(),
//! }
//! ```

pub mod config;
pub mod error;
pub mod report;
pub mod stash;

pub use config::StashConfig;
pub use error::{StashError, StashResult};
pub use report::{Failure, FailureKind, Operation};
pub use stash::Stash;

// Re-export key types
pub use stash_engine::Engine;
pub use stash_registry::{Resolved, TypeRegistry};
pub use stash_store::{InMemoryRecordStore, LogRecordStore, RecordStore, SyncMode};
pub use stash_types::{Candidate, MapKey, Mapping, Record, Serde, Structured, Value};
