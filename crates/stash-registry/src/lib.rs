//! Type registry for Stash.
//!
//! Stored values are plain JSON. The registry maps a requested result type
//! to a constructor so that a generic retrieval can hand back a typed
//! domain object instead of a raw mapping.
//!
//! # Modules
//!
//! - [`key`]: [`TypeKey`], the stable tag a constructor is registered under
//! - [`registry`]: [`TypeRegistry`], registration and resolution
//! - [`resolved`]: [`Resolved`], the tagged result of a resolution
//! - [`error`]: [`RegistryError`]

pub mod error;
pub mod key;
pub mod registry;
pub mod resolved;

pub use error::{RegistryError, RegistryResult};
pub use key::TypeKey;
pub use registry::TypeRegistry;
pub use resolved::Resolved;
