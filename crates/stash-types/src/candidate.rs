//! Input values before normalization.
//!
//! A [`Candidate`] is anything a caller may hand to the store. It can still
//! hold non-string mapping keys, non-finite floats, and opaque custom
//! objects; the codec resolves or rejects those before anything is stored.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::BuildHasher;
use std::sync::Arc;

use serde_json::Number;

use crate::structured::Structured;
use crate::{Mapping, Value};

/// An arbitrary input value.
#[derive(Clone)]
pub enum Candidate {
    Null,
    Bool(bool),
    /// An integer or an already-validated JSON number.
    Number(Number),
    /// A raw float; non-finite values cannot be stored.
    Float(f64),
    String(String),
    Sequence(Vec<Candidate>),
    /// Mapping entries in insertion order. Keys are stringified on clean.
    Mapping(Vec<(MapKey, Candidate)>),
    /// A custom object that must expose a [`Structured`] representation.
    Object(Arc<dyn Structured>),
}

impl Candidate {
    /// Wrap a custom object.
    pub fn object(value: impl Structured + 'static) -> Self {
        Self::Object(Arc::new(value))
    }

    /// Build a mapping from `(key, value)` pairs.
    pub fn mapping<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<MapKey>,
        V: Into<Candidate>,
    {
        Self::Mapping(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a sequence from any iterable, in its iteration order.
    pub fn sequence<T: Into<Candidate>>(items: impl IntoIterator<Item = T>) -> Self {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }

    /// String, number, or boolean.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Bool(_) | Self::Number(_) | Self::Float(_) | Self::String(_)
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Name of the runtime shape, or of the custom type for objects.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
            Self::Object(obj) => obj.type_name(),
        }
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Self::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Self::String(s) => f.debug_tuple("String").field(s).finish(),
            Self::Sequence(items) => f.debug_tuple("Sequence").field(items).finish(),
            Self::Mapping(entries) => f.debug_tuple("Mapping").field(entries).finish(),
            Self::Object(obj) => f.debug_tuple("Object").field(&obj.type_name()).finish(),
        }
    }
}

/// A mapping key as supplied by the caller.
#[derive(Clone, Debug, PartialEq)]
pub enum MapKey {
    String(String),
    Int(i64),
    UInt(u64),
    Bool(bool),
    Float(f64),
}

impl MapKey {
    /// The string form used in the stored mapping.
    pub fn into_string(self) -> String {
        match self {
            Self::String(s) => s,
            other => other.to_string(),
        }
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::UInt(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

impl From<String> for MapKey {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<bool> for MapKey {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for MapKey {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

macro_rules! map_key_from_int {
    ($variant:ident as $target:ty: $($ty:ty),*) => {$(
        impl From<$ty> for MapKey {
            fn from(n: $ty) -> Self {
                Self::$variant(n as $target)
            }
        }
    )*};
}

map_key_from_int!(Int as i64: i8, i16, i32, i64, isize);
map_key_from_int!(UInt as u64: u8, u16, u32, u64, usize);

// ---------------------------------------------------------------------------
// Conversions into Candidate
// ---------------------------------------------------------------------------

impl From<bool> for Candidate {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

macro_rules! candidate_from_int {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Candidate {
            fn from(n: $ty) -> Self {
                Self::Number(Number::from(n))
            }
        }
    )*};
}

candidate_from_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<f64> for Candidate {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<f32> for Candidate {
    fn from(x: f32) -> Self {
        Self::Float(f64::from(x))
    }
}

impl From<String> for Candidate {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Candidate {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl<T: Into<Candidate>> From<Option<T>> for Candidate {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Candidate>> From<Vec<T>> for Candidate {
    fn from(items: Vec<T>) -> Self {
        Self::sequence(items)
    }
}

impl<T: Into<Candidate>, const N: usize> From<[T; N]> for Candidate {
    fn from(items: [T; N]) -> Self {
        Self::sequence(items)
    }
}

impl<T: Into<Candidate>> From<VecDeque<T>> for Candidate {
    fn from(items: VecDeque<T>) -> Self {
        Self::sequence(items)
    }
}

impl<T: Into<Candidate>, S: BuildHasher> From<HashSet<T, S>> for Candidate {
    fn from(items: HashSet<T, S>) -> Self {
        Self::sequence(items)
    }
}

impl<T: Into<Candidate>> From<BTreeSet<T>> for Candidate {
    fn from(items: BTreeSet<T>) -> Self {
        Self::sequence(items)
    }
}

impl<K: Into<MapKey>, V: Into<Candidate>, S: BuildHasher> From<HashMap<K, V, S>> for Candidate {
    fn from(map: HashMap<K, V, S>) -> Self {
        Self::mapping(map)
    }
}

impl<K: Into<MapKey>, V: Into<Candidate>> From<BTreeMap<K, V>> for Candidate {
    fn from(map: BTreeMap<K, V>) -> Self {
        Self::mapping(map)
    }
}

impl From<Mapping> for Candidate {
    fn from(map: Mapping) -> Self {
        Self::Mapping(
            map.into_iter()
                .map(|(k, v)| (MapKey::String(k), Self::from(v)))
                .collect(),
        )
    }
}

impl From<Value> for Candidate {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::sequence(items),
            Value::Object(map) => Self::from(map),
        }
    }
}

impl<T: Into<Candidate>> FromIterator<T> for Candidate {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::sequence(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primitives_convert() {
        assert!(Candidate::from(true).is_primitive());
        assert!(Candidate::from(42u8).is_primitive());
        assert!(Candidate::from(-7i64).is_primitive());
        assert!(Candidate::from(1.5f64).is_primitive());
        assert!(Candidate::from("text").is_primitive());
        assert!(!Candidate::Null.is_primitive());
        assert!(Candidate::from(None::<i32>).is_null());
    }

    #[test]
    fn collections_materialize_as_sequences() {
        let set: BTreeSet<i32> = [3, 1, 2].into_iter().collect();
        match Candidate::from(set) {
            Candidate::Sequence(items) => assert_eq!(items.len(), 3),
            other => panic!("expected sequence, got {other:?}"),
        }

        let deque: VecDeque<&str> = VecDeque::from(vec!["a", "b"]);
        assert!(Candidate::from(deque).is_sequence());

        let collected: Candidate = (0..4).collect();
        assert!(collected.is_sequence());

        assert!(Candidate::from([1.5, 2.5]).is_sequence());
    }

    #[test]
    fn maps_keep_their_keys() {
        let mut map = BTreeMap::new();
        map.insert(1, "one");
        map.insert(2, "two");
        match Candidate::from(map) {
            Candidate::Mapping(entries) => {
                assert_eq!(entries[0].0, MapKey::Int(1));
                assert_eq!(entries[1].0, MapKey::Int(2));
            }
            other => panic!("expected mapping, got {other:?}"),
        }
    }

    #[test]
    fn json_values_convert_structurally() {
        let candidate = Candidate::from(json!({"a": [1, null, "x"], "b": {"c": true}}));
        match candidate {
            Candidate::Mapping(entries) => {
                assert_eq!(entries.len(), 2);
                assert!(entries[0].1.is_sequence());
                assert!(entries[1].1.is_mapping());
            }
            other => panic!("expected mapping, got {other:?}"),
        }
    }

    #[test]
    fn map_key_stringification() {
        assert_eq!(MapKey::from("k").into_string(), "k");
        assert_eq!(MapKey::from(-3i32).into_string(), "-3");
        assert_eq!(MapKey::from(7usize).into_string(), "7");
        assert_eq!(MapKey::from(true).into_string(), "true");
        assert_eq!(MapKey::from(2.5f64).into_string(), "2.5");
    }

    #[test]
    fn type_names() {
        assert_eq!(Candidate::Null.type_name(), "null");
        assert_eq!(Candidate::from("s").type_name(), "string");
        assert_eq!(Candidate::sequence(Vec::<i32>::new()).type_name(), "sequence");
    }

    #[test]
    fn debug_shows_object_type() {
        struct Widget;
        impl Structured for Widget {}

        let debug = format!("{:?}", Candidate::object(Widget));
        assert!(debug.contains("Object"));
        assert!(debug.contains("Widget"));
    }
}
