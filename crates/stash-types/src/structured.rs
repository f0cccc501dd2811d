//! The [`Structured`] capability for custom objects.

use serde::Serialize;

use crate::candidate::Candidate;
use crate::error::TypeError;
use crate::ser::to_candidate;

/// A custom object that can describe itself as a mapping.
///
/// A value placed into the store that is neither a primitive, a sequence,
/// nor a mapping must expose at least one of the two representations. The
/// serializer tries [`to_json`](Structured::to_json) first, then
/// [`to_map`](Structured::to_map). Both must produce a mapping-shaped
/// [`Candidate`]; anything else is rejected.
pub trait Structured: Send + Sync {
    /// Runtime type name, used in error reports.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Canonical JSON representation of the object.
    fn to_json(&self) -> Option<Candidate> {
        None
    }

    /// Like [`to_json`](Structured::to_json), but for objects whose
    /// representation can fail to build. The serializer calls this one.
    fn try_to_json(&self) -> Result<Option<Candidate>, TypeError> {
        Ok(self.to_json())
    }

    /// Plain map representation of the object.
    fn to_map(&self) -> Option<Candidate> {
        None
    }
}

/// Adapter that stores any `serde::Serialize` type through its serde
/// representation.
///
/// Floats are carried as they are, so a `NaN` field is rejected by the
/// purity filter rather than stored as `null`.
///
/// ```
/// use stash_types::{Candidate, Serde};
///
/// #[derive(serde::Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let candidate = Candidate::object(Serde(Point { x: 1, y: 2 }));
/// assert!(candidate.is_object());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Serde<T>(pub T);

impl<T: Serialize + Send + Sync> Structured for Serde<T> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn to_json(&self) -> Option<Candidate> {
        self.try_to_json().ok().flatten()
    }

    fn try_to_json(&self) -> Result<Option<Candidate>, TypeError> {
        to_candidate(&self.0).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Opaque;

    impl Structured for Opaque {}

    struct MapOnly;

    impl Structured for MapOnly {
        fn to_map(&self) -> Option<Candidate> {
            Some(Candidate::mapping([("kind", "map-only")]))
        }
    }

    #[derive(Serialize)]
    struct User {
        id: String,
        age: u32,
    }

    #[test]
    fn default_capabilities_are_absent() {
        let opaque = Opaque;
        assert!(opaque.to_json().is_none());
        assert!(opaque.to_map().is_none());
        assert!(opaque.type_name().ends_with("Opaque"));
    }

    #[test]
    fn to_map_only_object() {
        let obj = MapOnly;
        assert!(obj.to_json().is_none());
        assert!(obj.to_map().unwrap().is_mapping());
    }

    #[test]
    fn serde_adapter_produces_mapping() {
        let wrapped = Serde(User {
            id: "u1".into(),
            age: 30,
        });
        let json = wrapped.to_json().expect("serde types have a json form");
        assert!(json.is_mapping());
        assert!(wrapped.type_name().ends_with("User"));
    }

    #[test]
    fn serde_adapter_surfaces_key_errors() {
        let mut by_point = std::collections::HashMap::new();
        by_point.insert(vec![1, 2], "point");
        let wrapped = Serde(by_point);

        assert_eq!(
            wrapped.try_to_json().unwrap_err(),
            TypeError::UnsupportedKey("sequence")
        );
        assert!(wrapped.to_json().is_none());
    }

    #[test]
    fn default_try_to_json_defers_to_to_json() {
        assert!(MapOnly.try_to_json().unwrap().is_none());
        assert!(Serde(User { id: "u".into(), age: 1 })
            .try_to_json()
            .unwrap()
            .is_some());
    }
}
