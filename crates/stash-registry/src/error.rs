use thiserror::Error;

/// Errors from typed reconstruction.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A registered constructor rejected the stored data.
    #[error("failed to reconstruct {type_name}: {reason}")]
    Reconstruction { type_name: String, reason: String },
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
