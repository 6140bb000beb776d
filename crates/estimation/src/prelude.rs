//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```rust
//! use stable_lp_estimation::prelude::*;
//! ```

pub use crate::clients::QueryClients;

// Swap
pub use crate::swap::{SwapEstimator, SwapPlan, SwapRequest, finalize_swap};

// Deposit
pub use crate::deposit::{
    DepositCall, DepositEstimator, DepositPlan, DepositRequest, classify_deposit,
};

// Withdraw
pub use crate::withdraw::{
    WithdrawCall, WithdrawEstimator, WithdrawMode, WithdrawPlan, WithdrawRequest,
    classify_withdraw,
};
