use thiserror::Error;

/// Errors produced while building candidates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unsupported mapping key: {0}")]
    UnsupportedKey(&'static str),
}

impl serde::ser::Error for TypeError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Self::Serialization(msg.to_string())
    }
}
