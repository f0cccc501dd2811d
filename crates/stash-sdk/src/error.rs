use thiserror::Error;

use crate::report::FailureKind;

#[derive(Debug, Error)]
pub enum StashError {
    #[error("codec error: {0}")]
    Codec(#[from] stash_codec::CodecError),

    #[error("registry error: {0}")]
    Registry(#[from] stash_registry::RegistryError),

    #[error("engine error: {0}")]
    Engine(#[from] stash_engine::EngineError),

    #[error("store error: {0}")]
    Store(#[from] stash_store::StoreError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StashError {
    /// The reporting category of this error.
    pub fn kind(&self) -> FailureKind {
        use stash_codec::CodecError;
        use stash_engine::EngineError;

        match self {
            Self::Codec(CodecError::Serialization { .. }) => FailureKind::Serialization,
            Self::Codec(CodecError::Purity(_)) => FailureKind::Purity,
            Self::Registry(_) => FailureKind::Reconstruction,
            Self::Engine(EngineError::NotInitialized) => FailureKind::NotInitialized,
            Self::Engine(EngineError::Store(_)) | Self::Store(_) => FailureKind::StoreIo,
            Self::Engine(EngineError::Poisoned) | Self::Config(_) => FailureKind::Internal,
        }
    }
}

pub type StashResult<T> = Result<T, StashError>;
