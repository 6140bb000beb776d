pub mod amount;
pub mod estimate;
pub mod percentage;

pub use amount::Amount;
pub use estimate::{DepositEstimate, SwapEstimate, ValueDelta, WithdrawEstimate};
pub use percentage::Percentage;
