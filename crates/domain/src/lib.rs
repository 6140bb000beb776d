//! Core domain types for stable-swap routing and liquidity estimation.
//!
//! This crate provides the pure, synchronous building blocks:
//! - Fixed-point helpers and precision constants
//! - Stable-swap invariant math
//! - Token and pool entities with optionally loaded on-chain state
//! - The token/pool registry and its derived token index
//! - Route resolution between two tokens
//! - Estimate value objects and the error taxonomy
//! - Static chain configuration

/// Prelude module for convenient imports.
pub mod prelude;

/// Static chain configuration.
pub mod config;
/// Tokens and pools.
pub mod entities;
/// Error types.
pub mod error;
/// Fixed-point and invariant math.
pub mod math;
/// Token and pool registry.
pub mod registry;
/// Swap routes.
pub mod route;
/// Amounts, percentages and estimates.
pub mod value_objects;
