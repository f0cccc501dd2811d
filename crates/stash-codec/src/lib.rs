//! Turning arbitrary input values into storable ones.
//!
//! The write path of Stash runs every value through two stages:
//!
//! 1. [`normalize`] resolves container shapes and serializes custom
//!    objects into mappings via [`serialize`].
//! 2. [`clean`] round-trips the result through canonical JSON so that only
//!    strings, numbers, booleans, null, sequences, and string-keyed
//!    mappings remain.
//!
//! [`prepare`] runs both. A value that comes out of `prepare` is safe to
//! hand to the engine.

pub mod error;
pub mod normalize;
pub mod purity;
pub mod serialize;

pub use error::{CodecError, CodecResult};
pub use normalize::normalize;
pub use purity::clean;
pub use serialize::serialize;

use stash_types::{Candidate, Value};

/// Normalize then clean a value.
pub fn prepare(value: impl Into<Candidate>) -> CodecResult<Value> {
    clean(&normalize(value)?)
}
