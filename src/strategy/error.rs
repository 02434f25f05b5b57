//! Strategy error types.

use thiserror::Error;

use crate::exchange::TradingApiError;

/// Errors a trading strategy can raise from `execute`.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// Strategy was given settings it cannot work with.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Strategy logic hit a condition it cannot trade through.
    #[error("strategy failed: {0}")]
    Failed(String),

    /// An exchange call made by the strategy failed.
    ///
    /// The engine classifies these exactly as if it had made the call itself.
    #[error("exchange call failed: {0}")]
    Exchange(#[from] TradingApiError),
}
