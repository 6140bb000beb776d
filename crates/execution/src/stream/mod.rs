//! Reactive estimation.
//!
//! Provides:
//! - [`EstimateStream`]: debounce, periodic refresh and stale-result guard
//!   around any [`EstimateSource`]
//! - Registry-backed sources for swap, deposit and withdraw estimates

mod estimate_stream;
mod sources;

pub use estimate_stream::*;
pub use sources::*;
