use thiserror::Error;

/// Errors surfaced by [`order`](crate::order) and [`encode_key`](crate::encode_key).
///
/// A call either produces a complete permutation with its group metadata or fails with
/// one of these; partial results are never returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// The key specification cannot be ordered (empty key list, unknown column, ...).
    #[error("invalid key specification: {reason}")]
    InvalidSpecification { reason: String },

    /// A key column's element kind has no ordering (nested lists).
    #[error("{kind} column cannot be used as a sort key")]
    UnsupportedKeyKind { kind: &'static str },

    /// A key column is not as long as the first key column.
    #[error("column {column} has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: usize,
        expected: usize,
        actual: usize,
    },

    /// A working buffer could not be allocated.
    #[error("failed to allocate {bytes} bytes for {what}")]
    AllocationFailure { what: &'static str, bytes: usize },

    /// A defensive check failed. This is a bug in the engine, never a user error.
    #[error("internal invariant violated: {detail}")]
    InternalInvariantViolation { detail: String },
}

impl OrderError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        OrderError::InvalidSpecification {
            reason: reason.into(),
        }
    }

    pub(crate) fn invariant(detail: impl Into<String>) -> Self {
        OrderError::InternalInvariantViolation {
            detail: detail.into(),
        }
    }

    /// True for every error caused by the caller's table or key specification.
    pub fn is_invalid_specification(&self) -> bool {
        matches!(
            self,
            OrderError::InvalidSpecification { .. }
                | OrderError::UnsupportedKeyKind { .. }
                | OrderError::LengthMismatch { .. }
        )
    }
}

pub type Result<T, E = OrderError> = std::result::Result<T, E>;
