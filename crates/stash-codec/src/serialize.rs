//! Object → mapping serialization.

use stash_types::{Candidate, MapKey, Structured};
use tracing::debug;

use crate::error::{CodecError, CodecResult};

/// Reduce a value to a mapping with string keys at every depth.
///
/// Mappings are returned with their keys stringified. Custom objects are
/// asked for their `to_json` representation, then for `to_map`; the first
/// one present must itself be a mapping. Every other value is rejected.
pub fn serialize(value: Candidate) -> CodecResult<Candidate> {
    match value {
        Candidate::Mapping(entries) => Ok(stringify_keys(entries)),
        Candidate::Object(obj) => match structured_repr(obj.as_ref())? {
            Some(Candidate::Mapping(entries)) => Ok(stringify_keys(entries)),
            Some(other) => Err(CodecError::Serialization {
                type_name: obj.type_name().to_string(),
                reason: format!("representation is a {}, not a mapping", other.type_name()),
            }),
            None => Err(CodecError::Serialization {
                type_name: obj.type_name().to_string(),
                reason: "no to_json or to_map representation".to_string(),
            }),
        },
        other => Err(CodecError::Serialization {
            type_name: other.type_name().to_string(),
            reason: "not a mapping or structured object".to_string(),
        }),
    }
}

/// The first representation a structured object offers.
///
/// A `to_json` that fails is reported, not skipped in favour of `to_map`.
pub(crate) fn structured_repr(obj: &dyn Structured) -> CodecResult<Option<Candidate>> {
    match obj.try_to_json() {
        Ok(Some(repr)) => Ok(Some(repr)),
        Ok(None) => {
            debug!(type_name = obj.type_name(), "no to_json representation; trying to_map");
            Ok(obj.to_map())
        }
        Err(e) => Err(CodecError::Serialization {
            type_name: obj.type_name().to_string(),
            reason: e.to_string(),
        }),
    }
}

fn stringify_keys(entries: Vec<(MapKey, Candidate)>) -> Candidate {
    Candidate::Mapping(
        entries
            .into_iter()
            .map(|(k, v)| (MapKey::String(k.into_string()), stringify_nested(v)))
            .collect(),
    )
}

fn stringify_nested(value: Candidate) -> Candidate {
    match value {
        Candidate::Mapping(entries) => stringify_keys(entries),
        Candidate::Sequence(items) => {
            Candidate::Sequence(items.into_iter().map(stringify_nested).collect())
        }
        other => other,
    }
}
