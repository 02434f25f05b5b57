//! Venue-agnostic trading API consumed by the engine and strategies.

use async_trait::async_trait;

use super::{BalanceInfo, TradingApiError};

/// The exchange adapter interface.
///
/// The engine itself only queries balances for the emergency stop check.
/// Strategies receive the same shared adapter and may use it however
/// their market needs.
#[async_trait]
pub trait TradingApi: Send + Sync {
    /// Adapter identity, used in logs and critical alerts.
    fn name(&self) -> &str;

    /// Fetch current wallet balances from the exchange.
    async fn get_balance_info(&self) -> Result<BalanceInfo, TradingApiError>;
}
