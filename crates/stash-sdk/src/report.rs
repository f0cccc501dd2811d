//! The failure reporting channel.
//!
//! Mutations and typed retrieval never return their errors to the caller.
//! Each swallowed error is logged and broadcast as a [`Failure`] to every
//! subscriber.

use std::fmt;

use tokio::sync::broadcast;
use tracing::warn;

use crate::error::StashError;

/// Public operation during which a failure happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Mark,
    Call,
    Remark,
    Erase,
    Clear,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mark => "mark",
            Self::Call => "call",
            Self::Remark => "remark",
            Self::Erase => "erase",
            Self::Clear => "clear",
        };
        f.write_str(name)
    }
}

/// Category of a reported failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A value had no recognized structured representation.
    Serialization,
    /// A value could not be round-tripped through canonical JSON.
    Purity,
    /// A registered constructor rejected the stored data.
    Reconstruction,
    /// The durable record store failed.
    StoreIo,
    /// The store was used before `setup()`.
    NotInitialized,
    /// Lock poisoning or configuration problems.
    Internal,
}

/// A failure that was reported instead of returned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    pub operation: Operation,
    pub key: Option<String>,
    pub kind: FailureKind,
    pub message: String,
}

pub(crate) struct Reporter {
    sender: broadcast::Sender<Failure>,
}

impl Reporter {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Failure> {
        self.sender.subscribe()
    }

    pub(crate) fn report(&self, operation: Operation, key: Option<&str>, err: &StashError) {
        let failure = Failure {
            operation,
            key: key.map(str::to_string),
            kind: err.kind(),
            message: err.to_string(),
        };
        warn!(
            operation = %operation,
            key = ?failure.key,
            kind = ?failure.kind,
            error = %failure.message,
            "operation failed; state left unchanged"
        );
        // No subscribers is fine: the warning above is the fallback channel.
        let _ = self.sender.send(failure);
    }
}
