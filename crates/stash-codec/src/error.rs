use thiserror::Error;

/// Errors produced while turning an input value into a storable one.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The value has no recognized structured representation.
    #[error("cannot serialize value of type {type_name}: {reason}")]
    Serialization { type_name: String, reason: String },

    /// The value cannot be round-tripped through canonical JSON.
    #[error("value is not JSON-representable: {0}")]
    Purity(String),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
