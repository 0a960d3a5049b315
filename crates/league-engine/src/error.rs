use league_core::CoreError;
use thiserror::Error;

/// Fatal engine errors.
///
/// Gate rejection and population exhaustion are not errors: the run halts
/// gracefully and returns partial results instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("evaluator failed: {0}")]
    Evaluator(String),
}
