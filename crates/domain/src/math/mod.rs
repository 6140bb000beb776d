/// Fixed-point helpers and precision constants.
pub mod fixed_point;
/// Stable-swap invariant math.
pub mod stable_swap;

pub use fixed_point::*;
