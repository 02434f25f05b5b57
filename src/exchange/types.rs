//! Exchange-facing value types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A market traded on the exchange.
///
/// Equality covers every field, so two markets are only the same market
/// when label, id and both currencies all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Market {
    /// Human readable name, e.g. "BTC/USD"
    pub label: String,
    /// Exchange specific market id, e.g. "btcusd" or "BTCUSDT"
    pub id: String,
    /// Currency being bought/sold
    pub base_currency: String,
    /// Currency the base is priced in
    pub counter_currency: String,
}

impl Market {
    pub fn new(
        label: impl Into<String>,
        id: impl Into<String>,
        base_currency: impl Into<String>,
        counter_currency: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
            base_currency: base_currency.into(),
            counter_currency: counter_currency.into(),
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [id={}, base={}, counter={}]",
            self.label, self.id, self.base_currency, self.counter_currency
        )
    }
}

/// Wallet balances reported by the exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceInfo {
    /// Balances available for trading, keyed by currency code
    pub available: HashMap<String, Decimal>,
    /// Balances locked in open orders, keyed by currency code
    #[serde(default)]
    pub on_hold: HashMap<String, Decimal>,
}

impl BalanceInfo {
    pub fn new(available: HashMap<String, Decimal>) -> Self {
        Self {
            available,
            on_hold: HashMap::new(),
        }
    }

    /// Available balance for a currency, if the exchange reported one.
    pub fn available(&self, currency: &str) -> Option<Decimal> {
        self.available.get(currency).copied()
    }

    /// Currency codes with an available balance, sorted for stable log output.
    pub fn currencies(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.available.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    #[test]
    fn test_market_identity_is_full_tuple() {
        let a = Market::new("BTC/USD", "btcusd", "BTC", "USD");
        let b = Market::new("BTC/USD", "btcusd", "BTC", "USD");
        let c = Market::new("BTC/USD", "btcusd", "BTC", "EUR");

        let mut seen = HashSet::new();
        assert!(seen.insert(a));
        assert!(!seen.insert(b));
        assert!(seen.insert(c));
    }

    #[test]
    fn test_balance_lookup() {
        let info = BalanceInfo::new(HashMap::from([
            ("USD".to_string(), dec!(250.5)),
            ("BTC".to_string(), dec!(1.25)),
        ]));

        assert_eq!(info.available("BTC"), Some(dec!(1.25)));
        assert_eq!(info.available("ETH"), None);
        assert_eq!(info.currencies(), vec!["BTC", "USD"]);
    }
}
