use serde::{Deserialize, Serialize};

use crate::Value;

/// A persisted `(key, value)` pair.
///
/// Keys are unique within a store; the last write for a key wins.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub value: Value,
}

impl Record {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}
