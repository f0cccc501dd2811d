//! Registration and resolution of typed constructors.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::{Arc, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use stash_types::{Mapping, Value};
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::key::TypeKey;
use crate::resolved::Resolved;

type Built = Box<dyn Any + Send>;
type ErasedConstructor = Arc<dyn Fn(Value) -> RegistryResult<Built> + Send + Sync>;

#[derive(Clone)]
struct Entry {
    type_name: &'static str,
    build: ErasedConstructor,
}

/// Table of constructors keyed by [`TypeKey`].
///
/// Registration for a type overwrites any previous registration; there is
/// no unregister. Lookups clone the constructor out of the table and run it
/// without holding the lock, so a slow constructor never blocks
/// registration.
#[derive(Default)]
pub struct TypeRegistry {
    entries: RwLock<HashMap<TypeKey, Entry>>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fallible constructor for `T`.
    ///
    /// Also registers the derived "sequence of `T`" constructor, which
    /// applies `constructor` to every element after checking that the
    /// element is a mapping.
    pub fn register<T, E, F>(&self, constructor: F)
    where
        T: Send + 'static,
        E: Display,
        F: Fn(Mapping) -> Result<T, E> + Send + Sync + 'static,
    {
        let type_name = std::any::type_name::<T>();
        let constructor = Arc::new(constructor);

        let single: ErasedConstructor = {
            let constructor = Arc::clone(&constructor);
            Arc::new(move |value: Value| {
                let map = into_mapping(value, type_name)?;
                let built = (*constructor)(map).map_err(|e| reconstruction(type_name, e))?;
                Ok(Box::new(built) as Built)
            })
        };

        let sequence: ErasedConstructor = Arc::new(move |value: Value| {
            let items = match value {
                Value::Array(items) => items,
                other => {
                    return Err(RegistryError::Reconstruction {
                        type_name: type_name.to_string(),
                        reason: format!("expected a sequence, found {}", shape(&other)),
                    })
                }
            };
            let built = items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    let map = into_mapping(item, type_name).map_err(|e| match e {
                        RegistryError::Reconstruction { type_name, reason } => {
                            RegistryError::Reconstruction {
                                type_name,
                                reason: format!("element {index}: {reason}"),
                            }
                        }
                    })?;
                    (*constructor)(map).map_err(|e| reconstruction(type_name, e))
                })
                .collect::<RegistryResult<Vec<T>>>()?;
            Ok(Box::new(built) as Built)
        });

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            TypeKey::of::<T>(),
            Entry {
                type_name,
                build: single,
            },
        );
        entries.insert(
            TypeKey::sequence_of::<T>(),
            Entry {
                type_name,
                build: sequence,
            },
        );
        debug!(type_name, "registered constructor");
    }

    /// Register a constructor that cannot fail.
    pub fn register_infallible<T, F>(&self, constructor: F)
    where
        T: Send + 'static,
        F: Fn(Mapping) -> T + Send + Sync + 'static,
    {
        self.register(move |map| Ok::<T, std::convert::Infallible>(constructor(map)));
    }

    /// Register `T`'s serde `Deserialize` implementation as its constructor.
    pub fn register_serde<T>(&self)
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.register(|map: Mapping| serde_json::from_value::<T>(Value::Object(map)));
    }

    /// Whether a constructor is registered for `T`.
    pub fn is_registered<T: 'static>(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeKey::of::<T>())
    }

    /// Number of registered types (not counting derived sequence entries).
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|key| matches!(key, TypeKey::Single(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a stored value against the requested type `T`.
    ///
    /// - Sequences use the "sequence of `T`" constructor if one exists.
    /// - Mappings use the constructor for `T` if one exists.
    /// - Everything else, and any shape with no constructor, is returned
    ///   as [`Resolved::Raw`].
    ///
    /// A constructor that fails yields [`RegistryError::Reconstruction`];
    /// no partially reconstructed value is ever returned.
    pub fn resolve<T: 'static>(&self, value: Value) -> RegistryResult<Resolved<T>> {
        if value.is_array() {
            return match self.lookup(&TypeKey::sequence_of::<T>()) {
                Some(entry) => {
                    let built = (entry.build)(value)?;
                    downcast::<Vec<T>>(built, entry.type_name).map(Resolved::TypedSequence)
                }
                None => Ok(Resolved::Raw(value)),
            };
        }
        if value.is_object() {
            return match self.lookup(&TypeKey::of::<T>()) {
                Some(entry) => {
                    let built = (entry.build)(value)?;
                    downcast::<T>(built, entry.type_name).map(Resolved::Typed)
                }
                None => Ok(Resolved::Raw(value)),
            };
        }
        Ok(Resolved::Raw(value))
    }

    fn lookup(&self, key: &TypeKey) -> Option<Entry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut types: Vec<&str> = entries
            .iter()
            .filter(|(key, _)| matches!(key, TypeKey::Single(_)))
            .map(|(_, entry)| entry.type_name)
            .collect();
        types.sort_unstable();
        f.debug_struct("TypeRegistry").field("types", &types).finish()
    }
}

fn into_mapping(value: Value, type_name: &str) -> RegistryResult<Mapping> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(RegistryError::Reconstruction {
            type_name: type_name.to_string(),
            reason: format!("expected a mapping, found {}", shape(&other)),
        }),
    }
}

fn reconstruction(type_name: &str, err: impl Display) -> RegistryError {
    RegistryError::Reconstruction {
        type_name: type_name.to_string(),
        reason: err.to_string(),
    }
}

fn downcast<T: 'static>(built: Built, type_name: &str) -> RegistryResult<T> {
    built
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| RegistryError::Reconstruction {
            type_name: type_name.to_string(),
            reason: "constructor produced a different type".to_string(),
        })
}

fn shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
