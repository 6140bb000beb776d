//! Live estimate streaming and pool state synchronization.
//!
//! This crate provides functionality for keeping estimates current:
//! - Debounced estimate streams with periodic refresh
//! - Stale-result discarding by input generation
//! - Polling of watched pools into a shared registry
//! - Per-pool failure tracking

/// Prelude module for convenient imports.
pub mod prelude;

/// Reactive estimate streams.
pub mod stream;
/// Pool state synchronization.
pub mod sync;
