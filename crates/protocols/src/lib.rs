//! On-chain read interfaces for stable-swap pools and the meta/base router.
//!
//! This crate provides:
//! - The [`PoolQuery`] and [`RouterQuery`] traits consumed by the estimators
//! - The [`QueryError`] type for failed reads
//! - An in-process stable-swap simulator implementing both traits

/// Prelude module for convenient imports.
pub mod prelude;

/// Query error type.
pub mod error;
/// Pool and router query traits.
pub mod query;
/// In-memory stable-swap backend.
pub mod simulator;

pub use error::QueryError;
pub use query::{PoolQuery, RouterQuery};
