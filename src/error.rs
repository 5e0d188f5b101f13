//! Error types for sources, drafts and subscriptions.

use thiserror::Error;

/// Main error type for source operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Index out of bounds: {index} (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Range out of bounds: {count} element(s) at {index} (len {len})")]
    RangeOutOfBounds {
        index: usize,
        count: usize,
        len: usize,
    },

    #[error("Subscription already released")]
    Released,

    #[error("Source has ended")]
    Ended,

    #[error("Unreachable state: {0}")]
    Unreachable(String),
}

impl SourceError {
    /// True for errors caused by the caller breaking an operation's contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            SourceError::IndexOutOfBounds { .. }
                | SourceError::RangeOutOfBounds { .. }
                | SourceError::Released
                | SourceError::Ended
        )
    }

    /// True for internal invariant failures.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, SourceError::Unreachable(_))
    }

    pub(crate) fn unreachable(context: &str, cause: impl std::fmt::Display) -> Self {
        SourceError::Unreachable(format!("{context}: {cause}"))
    }
}

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;
