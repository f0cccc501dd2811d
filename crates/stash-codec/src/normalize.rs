//! Value normalization: resolve every container shape of an input value.
//!
//! Finite iterables are already materialized into sequences by the
//! `Candidate` conversions (in iteration order), so normalization only has
//! to decide what passes through and what goes to [`serialize`].

use stash_types::Candidate;

use crate::error::CodecResult;
use crate::serialize::serialize;

/// Normalize an input value into a candidate whose containers are resolved.
///
/// - null, strings, numbers, and booleans pass through unchanged;
/// - sequences are processed element-wise: primitives and mappings pass
///   through, nested sequences are normalized recursively, and any other
///   element is serialized;
/// - everything else (mappings and custom objects) is serialized.
///
/// Mappings inside sequences may still carry custom objects at their
/// leaves; the purity filter resolves or rejects those. Errors come only
/// from the serializer.
pub fn normalize(value: impl Into<Candidate>) -> CodecResult<Candidate> {
    normalize_candidate(value.into())
}

fn normalize_candidate(value: Candidate) -> CodecResult<Candidate> {
    match value {
        Candidate::Sequence(items) => items
            .into_iter()
            .map(normalize_element)
            .collect::<CodecResult<Vec<_>>>()
            .map(Candidate::Sequence),
        v if v.is_primitive() || v.is_null() => Ok(v),
        other => serialize(other),
    }
}

fn normalize_element(item: Candidate) -> CodecResult<Candidate> {
    match item {
        Candidate::Sequence(_) => normalize_candidate(item),
        v if v.is_primitive() || v.is_null() || v.is_mapping() => Ok(v),
        other => serialize(other),
    }
}
