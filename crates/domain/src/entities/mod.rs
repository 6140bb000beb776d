pub mod pool;
pub mod token;

// Re-export for easier access
pub use pool::{Pool, PoolParameters, PoolReserves, PoolSnapshot};
pub use token::Token;
