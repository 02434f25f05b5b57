//! Trading strategies.
//!
//! - `TradingStrategy`: the capability the engine executes once per cycle
//! - `StrategyRegistry`: strategy kinds available to configuration
//! - `bind_strategies`: builds the ordered market bindings at startup

mod balance_watch;
mod error;
mod registry;
mod traits;

pub use balance_watch::{BalanceWatchStrategy, BALANCE_WATCH};
pub use error::StrategyError;
pub use registry::{bind_strategies, StrategyContext, StrategyFactory, StrategyRegistry};
pub use traits::{StrategyBinding, StrategyConfig, TradingStrategy};
