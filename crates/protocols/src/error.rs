use stable_lp_domain::error::{EstimateError, MathError};
use thiserror::Error;

/// Failure of an on-chain read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// No contract at this address is known to the backend.
    #[error("unknown pool {0}")]
    UnknownPool(String),
    /// Token index out of range for the pool.
    #[error("index {index} out of range for pool {pool}")]
    InvalidIndex {
        /// Pool address.
        pool: String,
        /// Offending index.
        index: usize,
    },
    /// The call reverted.
    #[error("call reverted: {0}")]
    Reverted(String),
    /// The backend could not be reached.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl From<MathError> for QueryError {
    fn from(err: MathError) -> Self {
        Self::Reverted(err.to_string())
    }
}

impl From<QueryError> for EstimateError {
    fn from(err: QueryError) -> Self {
        Self::Upstream(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_to_upstream() {
        let err: EstimateError = QueryError::UnknownPool("0xabc".into()).into();
        assert_eq!(err, EstimateError::Upstream("unknown pool 0xabc".into()));
        assert!(err.is_pending());
    }

    #[test]
    fn test_math_error_reverts() {
        let err: QueryError = MathError::DivisionByZero.into();
        assert_eq!(err, QueryError::Reverted("division by zero".into()));
    }
}
