//! Built-in strategy that watches the wallet balances of its market.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use super::{StrategyContext, StrategyError, TradingStrategy};
use crate::exchange::{Market, TradingApi};
use crate::utils::format_amount;

/// Registry name of [`BalanceWatchStrategy`].
pub const BALANCE_WATCH: &str = "balance-watch";

/// Logs base and counter balances every cycle.
///
/// With `min_counter_balance` set, the strategy fails once the counter
/// currency balance drops below it, which stops the engine.
pub struct BalanceWatchStrategy {
    api: Arc<dyn TradingApi>,
    market: Market,
    min_counter_balance: Option<Decimal>,
}

impl BalanceWatchStrategy {
    pub fn new(ctx: StrategyContext) -> Result<Self, StrategyError> {
        let min_counter_balance = ctx.config.get_decimal("min_counter_balance")?;
        if min_counter_balance.is_some_and(|min| min < Decimal::ZERO) {
            return Err(StrategyError::InvalidConfig(
                "min_counter_balance must not be negative".to_string(),
            ));
        }

        Ok(Self {
            api: ctx.api,
            market: ctx.market,
            min_counter_balance,
        })
    }

    pub fn build(ctx: StrategyContext) -> Result<Box<dyn TradingStrategy>, StrategyError> {
        Ok(Box::new(Self::new(ctx)?))
    }
}

#[async_trait]
impl TradingStrategy for BalanceWatchStrategy {
    fn name(&self) -> &str {
        BALANCE_WATCH
    }

    async fn execute(&mut self) -> Result<(), StrategyError> {
        let balances = self.api.get_balance_info().await?;
        let base = balances.available(&self.market.base_currency);
        let counter = balances.available(&self.market.counter_currency);

        match (base, counter) {
            (Some(base), Some(counter)) => info!(
                market = %self.market.label,
                "Balances: {} {} / {} {}",
                format_amount(base),
                self.market.base_currency,
                format_amount(counter),
                self.market.counter_currency
            ),
            _ => warn!(
                market = %self.market.label,
                "Exchange did not report all balances for this market"
            ),
        }

        if let Some(min) = self.min_counter_balance {
            let counter = counter.unwrap_or(Decimal::ZERO);
            if counter < min {
                return Err(StrategyError::Failed(format!(
                    "{} balance {} is below minimum {} for market {}",
                    self.market.counter_currency,
                    format_amount(counter),
                    format_amount(min),
                    self.market.label
                )));
            }
        }

        Ok(())
    }
}
