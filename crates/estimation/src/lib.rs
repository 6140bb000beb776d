//! Swap, deposit and withdraw estimators for stable-swap pools.
//!
//! This crate provides:
//! - [`SwapEstimator`]: output, minimum received, prices and peg impact
//! - [`DepositEstimator`]: LP minted, pool share and bonus or impact
//! - [`WithdrawEstimator`]: outputs, post-withdrawal virtual price and bonus or impact
//!
//! Every estimator splits into a synchronous `prepare` step that copies what it
//! needs out of the [`Registry`](stable_lp_domain::registry::Registry) and an
//! asynchronous `quote` step that performs the on-chain reads. Callers holding
//! the registry behind a lock only need it during `prepare`.

/// Prelude module for convenient imports.
pub mod prelude;

/// Pool and router read clients.
pub mod clients;
/// Deposit estimation.
pub mod deposit;
/// Swap estimation.
pub mod swap;
/// Withdraw estimation.
pub mod withdraw;

#[cfg(test)]
mod mock;

pub use clients::QueryClients;
pub use deposit::{DepositEstimator, DepositRequest};
pub use swap::{SwapEstimator, SwapRequest};
pub use withdraw::{WithdrawEstimator, WithdrawMode, WithdrawRequest};
