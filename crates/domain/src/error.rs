//! Error types shared across the workspace.
//!
//! Three layers:
//! - [`MathError`]: fixed-point arithmetic that has no defined result.
//! - [`DomainError`]: static configuration and registry validation.
//! - [`EstimateError`]: why an estimate is not available. None of these are
//!   faults; callers render them as "no estimate" or "no route".

use thiserror::Error;

/// Arithmetic with no defined result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    /// Result does not fit in 256 bits.
    #[error("arithmetic overflow")]
    Overflow,
    /// Subtraction went below zero.
    #[error("arithmetic underflow")]
    Underflow,
    /// Divisor was zero.
    #[error("division by zero")]
    DivisionByZero,
}

/// Errors raised while loading configuration or mutating the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A pool references a token that is not configured.
    #[error("pool {pool} references unknown token {token}")]
    UnknownToken {
        /// Pool id.
        pool: String,
        /// Token symbol.
        token: String,
    },
    /// Lookup of a pool id that does not exist.
    #[error("unknown pool {0}")]
    UnknownPool(String),
    /// A meta pool points at a base pool that is not configured.
    #[error("pool {pool} references unknown base pool {base_pool}")]
    UnknownBasePool {
        /// Meta pool id.
        pool: String,
        /// Missing base pool id.
        base_pool: String,
    },
    /// A base pool is itself a meta pool; only one level is supported.
    #[error("base pool {base_pool} of {pool} has its own base pool")]
    NestedBasePool {
        /// Meta pool id.
        pool: String,
        /// Base pool id.
        base_pool: String,
    },
    /// A meta pool does not hold its base pool's LP token.
    #[error("meta pool {pool} does not list base LP token {lp_token}")]
    MissingBaseLpToken {
        /// Meta pool id.
        pool: String,
        /// Base pool LP token symbol.
        lp_token: String,
    },
    /// The configured base pool index does not point at the base LP token.
    #[error("meta pool {pool} declares base LP index {declared}, actual {actual}")]
    BasePoolIndexMismatch {
        /// Meta pool id.
        pool: String,
        /// Index from configuration.
        declared: usize,
        /// Index of the LP token in the asset list.
        actual: usize,
    },
    /// Two pools share an id.
    #[error("duplicate pool id {0}")]
    DuplicatePool(String),
    /// A pool snapshot does not match the pool's asset count.
    #[error("pool {pool} expects {expected} balances, got {actual}")]
    BalanceCountMismatch {
        /// Pool id.
        pool: String,
        /// Number of assets.
        expected: usize,
        /// Number of balances received.
        actual: usize,
    },
    /// Configuration could not be read or parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Reason an estimate could not be produced.
///
/// Every variant is an expected runtime condition. The presentation layer
/// shows a neutral or loading state for everything except [`EstimateError::NoRoute`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EstimateError {
    /// Nothing (or only zeros) was entered.
    #[error("no input amount")]
    EmptyInput,
    /// The token pair is not connected by at most one base-pool hop.
    #[error("cannot find route from {from} to {to}")]
    NoRoute {
        /// Input token symbol.
        from: String,
        /// Output token symbol.
        to: String,
    },
    /// Pool state needed for the estimate has not been fetched yet.
    #[error("pool {0} state not loaded")]
    NotLoaded(String),
    /// The computation divides by a zero or negative quantity.
    #[error("estimate undefined: {0}")]
    Undefined(#[from] MathError),
    /// The on-chain read failed.
    #[error("upstream read failed: {0}")]
    Upstream(String),
    /// The request does not fit the pool (wrong amount count, bad index).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl EstimateError {
    /// Returns true when the UI should keep showing a pending/neutral state.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !matches!(self, Self::NoRoute { .. } | Self::InvalidRequest(_))
    }

    /// Returns true when the pair has no route.
    #[must_use]
    pub fn is_no_route(&self) -> bool {
        matches!(self, Self::NoRoute { .. })
    }
}
