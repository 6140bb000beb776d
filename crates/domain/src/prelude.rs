//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```rust
//! use stable_lp_domain::prelude::*;
//! ```

// Config
pub use crate::config::{ChainConfig, PoolConfig, TokenConfig};

// Entities
pub use crate::entities::{Pool, PoolParameters, PoolReserves, PoolSnapshot, Token};

// Errors
pub use crate::error::{DomainError, EstimateError, MathError};

// Math
pub use crate::math::{
    FEE_PRECISION, PEG_PRICE, POOL_SHARE_PRECISION, PRECISION, PRICE_DECIMALS, PRICE_PRECISION,
    SLIPPAGE_PRECISION, VALUE_DECIMALS,
};

// Registry
pub use crate::registry::{Registry, TokenLocation};

// Routes
pub use crate::route::{Route, SwapDirection, SwapPair, resolve_route};

// Value objects
pub use crate::value_objects::{
    Amount, DepositEstimate, Percentage, SwapEstimate, ValueDelta, WithdrawEstimate,
};

pub use primitive_types::U256;
