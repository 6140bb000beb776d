//! Pool state synchronization with on-chain data.
//!
//! Provides:
//! - The shared registry handle estimators read from
//! - Periodic `get_pool_state` polling of watched pools
//! - Per-pool failure tracking

mod updater;

pub use updater::*;
