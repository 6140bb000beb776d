//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use stable_lp_execution::prelude::*;
//! ```

// Stream
pub use crate::stream::{
    DepositSource, EstimateSource, EstimateState, EstimateStream, EstimateStreamConfig,
    SwapSource, WithdrawSource,
};

// Sync
pub use crate::sync::{
    PoolStateUpdater, PoolSyncState, RefreshResult, SharedRegistry, SyncError, SyncStatus,
    UpdaterConfig, shared,
};
