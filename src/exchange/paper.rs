//! Paper exchange for dry runs and tests.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{BalanceInfo, TradingApi, TradingApiError};

/// Exchange adapter that serves balances from memory.
///
/// Balances can be changed while the engine runs, which is how a dry run
/// (or a test) simulates a drawdown hitting the emergency stop.
#[derive(Clone, Default)]
pub struct PaperExchange {
    balances: Arc<RwLock<HashMap<String, Decimal>>>,
}

impl PaperExchange {
    /// Create a paper exchange with starting balances.
    pub fn new(balances: HashMap<String, Decimal>) -> Self {
        Self {
            balances: Arc::new(RwLock::new(balances)),
        }
    }

    /// Overwrite the available balance of one currency.
    pub async fn set_balance(&self, currency: &str, amount: Decimal) {
        self.balances
            .write()
            .await
            .insert(currency.to_string(), amount);
    }

    /// Remove a currency entirely, as if the exchange stopped reporting it.
    pub async fn remove_balance(&self, currency: &str) {
        self.balances.write().await.remove(currency);
    }
}

#[async_trait]
impl TradingApi for PaperExchange {
    fn name(&self) -> &str {
        "paper"
    }

    async fn get_balance_info(&self) -> Result<BalanceInfo, TradingApiError> {
        let balances = self.balances.read().await.clone();
        debug!(currencies = balances.len(), "[PAPER] Serving balances");
        Ok(BalanceInfo::new(balances))
    }
}
