//! Foundation types for Stash.
//!
//! Stash is a cache-backed persistent key-value store. Every other Stash
//! crate depends on `stash-types` for the shapes that flow through it.
//!
//! # Key Types
//!
//! - [`Value`] / [`Mapping`]: the normalized JSON shapes that are stored
//! - [`Candidate`]: an arbitrary input value before normalization
//! - [`Structured`]: the capability a custom object needs to be storable
//! - [`Serde`]: adapter giving any `serde::Serialize` type that capability
//! - [`MapKey`]: a mapping key that may not yet be a string
//! - [`Record`]: a `(key, value)` pair as persisted by a record store
//! - [`to_candidate`]: serde serialization straight into a [`Candidate`]

pub mod candidate;
pub mod error;
pub mod record;
pub mod ser;
pub mod structured;

pub use candidate::{Candidate, MapKey};
pub use error::TypeError;
pub use record::Record;
pub use ser::to_candidate;
pub use structured::{Serde, Structured};

/// A stored, normalized value: null, boolean, number, string, sequence, or
/// string-keyed mapping.
pub type Value = serde_json::Value;

/// A string-keyed mapping of normalized values.
pub type Mapping = serde_json::Map<String, Value>;
