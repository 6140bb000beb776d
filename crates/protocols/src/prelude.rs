//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```rust
//! use stable_lp_protocols::prelude::*;
//! ```

// Queries
pub use crate::error::QueryError;
pub use crate::query::{PoolQuery, RouterQuery};

// Simulator
pub use crate::simulator::{
    SimulatedPool, SimulatedPoolConfig, SimulatorConfig, StableSwapSimulator,
};
