use thiserror::Error;

/// Errors raised by core state and objective operations.
///
/// These are shape errors: they indicate the caller combined values of
/// incompatible dimensions and are always fatal to the current operation.
/// Routine verification failure is not an error and is reported through
/// [`crate::proof::ProofRecord`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("state dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
    #[error("objective vector has {actual} values, expected {expected}")]
    ObjectiveLengthMismatch { expected: usize, actual: usize },
}
