//! The purity filter: a full encode → decode round trip through canonical
//! JSON text.
//!
//! Encoding walks the candidate tree. Mapping keys are written in their
//! string form, custom objects are encoded through their structured
//! representation, and anything that JSON cannot express (non-finite
//! floats, objects with no representation) aborts the encode. Decoding the
//! text yields a value made only of JSON primitives, sequences, and
//! string-keyed mappings.

use std::cell::Cell;

use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use stash_types::{Candidate, Value};

use crate::error::{CodecError, CodecResult};
use crate::serialize::structured_repr;

/// Reduce a normalized candidate to a pure JSON value.
///
/// Fails fast with [`CodecError::Purity`] on the first leaf that cannot be
/// encoded; nothing is dropped silently.
pub fn clean(value: &Candidate) -> CodecResult<Value> {
    let failure = Cell::new(None);
    let encoded = serde_json::to_vec(&Canonical {
        value,
        failure: &failure,
    })
    .map_err(|e| failure.take().unwrap_or_else(|| CodecError::Purity(e.to_string())))?;
    serde_json::from_slice(&encoded).map_err(|e| CodecError::Purity(e.to_string()))
}

/// Encodes a candidate tree. A nested object whose representation fails to
/// build parks its error in `failure`, so `clean` can report it as a
/// serialization error rather than an impure leaf.
struct Canonical<'a> {
    value: &'a Candidate,
    failure: &'a Cell<Option<CodecError>>,
}

impl<'a> Canonical<'a> {
    fn child<'b>(&self, value: &'b Candidate) -> Canonical<'b>
    where
        'a: 'b,
    {
        Canonical {
            value,
            failure: self.failure,
        }
    }
}

impl Serialize for Canonical<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value {
            Candidate::Null => serializer.serialize_unit(),
            Candidate::Bool(b) => serializer.serialize_bool(*b),
            Candidate::Number(n) => n.serialize(serializer),
            Candidate::Float(x) if x.is_finite() => serializer.serialize_f64(*x),
            Candidate::Float(x) => Err(S::Error::custom(format_args!(
                "non-finite number {x} has no JSON form"
            ))),
            Candidate::String(s) => serializer.serialize_str(s),
            Candidate::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(&self.child(item))?;
                }
                seq.end()
            }
            Candidate::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, item) in entries {
                    map.serialize_entry(&key.to_string(), &self.child(item))?;
                }
                map.end()
            }
            Candidate::Object(obj) => match structured_repr(obj.as_ref()) {
                Ok(Some(repr)) => self.child(&repr).serialize(serializer),
                Ok(None) => Err(S::Error::custom(format_args!(
                    "{} has no JSON representation",
                    obj.type_name()
                ))),
                Err(e) => {
                    let message = e.to_string();
                    self.failure.set(Some(e));
                    Err(S::Error::custom(message))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stash_types::{MapKey, Serde, Structured};
    use std::collections::BTreeMap;

    struct Address;

    impl Structured for Address {
        fn to_map(&self) -> Option<Candidate> {
            Some(Candidate::mapping([("city", "Oslo")]))
        }
    }

    struct Opaque;

    impl Structured for Opaque {}

    #[test]
    fn plain_json_is_unchanged() {
        let value = json!({"a": 1, "b": [true, null, "x"], "c": {"d": 2.5}});
        let out = clean(&Candidate::from(value.clone())).unwrap();
        assert_eq!(out, value);
    }

    #[test]
    fn non_string_keys_are_stringified() {
        let candidate = Candidate::Mapping(vec![
            (MapKey::Int(1), Candidate::from("one")),
            (MapKey::Bool(false), Candidate::mapping([(2u32, "two")])),
        ]);
        let out = clean(&candidate).unwrap();
        assert_eq!(out, json!({"1": "one", "false": {"2": "two"}}));
    }

    #[test]
    fn nested_objects_use_their_representation() {
        let candidate = Candidate::mapping([("home", Candidate::object(Address))]);
        let out = clean(&candidate).unwrap();
        assert_eq!(out, json!({"home": {"city": "Oslo"}}));
    }

    #[test]
    fn nested_opaque_object_fails() {
        let candidate = Candidate::mapping([("blob", Candidate::object(Opaque))]);
        let err = clean(&candidate).unwrap_err();
        assert!(matches!(err, CodecError::Purity(_)));
        assert!(err.to_string().contains("Opaque"));
    }

    #[test]
    fn non_finite_floats_fail() {
        for x in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = clean(&Candidate::sequence([x])).unwrap_err();
            assert!(matches!(err, CodecError::Purity(_)));
        }
    }

    #[test]
    fn nested_serde_object_with_nan_fails() {
        #[derive(serde::Serialize)]
        struct Reading {
            sensor: &'static str,
            value: f64,
        }

        let candidate = Candidate::mapping([(
            "latest",
            Candidate::object(Serde(Reading {
                sensor: "t1",
                value: f64::NAN,
            })),
        )]);
        let err = clean(&candidate).unwrap_err();
        assert!(matches!(err, CodecError::Purity(_)));
    }

    #[test]
    fn nested_failing_representation_is_a_serialization_error() {
        let by_pair: BTreeMap<(u8, u8), &str> = [((1, 2), "x")].into_iter().collect();
        let candidate = Candidate::sequence([Candidate::mapping([(
            "index",
            Candidate::object(Serde(by_pair)),
        )])]);

        let err = clean(&candidate).unwrap_err();
        match err {
            CodecError::Serialization { reason, .. } => assert!(reason.contains("tuple")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn floats_survive() {
        assert_eq!(clean(&Candidate::from(1.5)).unwrap(), json!(1.5));
    }

    #[test]
    fn duplicate_keys_after_stringification_keep_last() {
        let candidate = Candidate::Mapping(vec![
            (MapKey::Int(1), Candidate::from("int")),
            (MapKey::String("1".into()), Candidate::from("string")),
        ]);
        assert_eq!(clean(&candidate).unwrap(), json!({"1": "string"}));
    }
}
