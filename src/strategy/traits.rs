//! Strategy capability and its per-market binding.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::StrategyError;
use crate::exchange::Market;

/// A trading strategy bound to a single market.
///
/// The engine calls `execute` once per trade cycle, in configured order,
/// never concurrently with another strategy.
#[async_trait]
pub trait TradingStrategy: Send {
    /// Implementation name for logs.
    fn name(&self) -> &str;

    /// Run one trade cycle.
    async fn execute(&mut self) -> Result<(), StrategyError>;
}

/// Opaque key/value settings for one strategy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyConfig {
    items: HashMap<String, String>,
}

impl StrategyConfig {
    pub fn new(items: HashMap<String, String>) -> Self {
        Self { items }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }

    /// Parse an optional decimal setting.
    pub fn get_decimal(&self, key: &str) -> Result<Option<Decimal>, StrategyError> {
        self.get(key)
            .map(|raw| {
                Decimal::from_str(raw.trim()).map_err(|e| {
                    StrategyError::InvalidConfig(format!("{key}='{raw}' is not a decimal: {e}"))
                })
            })
            .transpose()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Display for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.items.keys().collect();
        keys.sort();
        let rendered: Vec<String> = keys
            .into_iter()
            .map(|k| format!("{}={}", k, self.items[k]))
            .collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}

/// One strategy instance permanently paired with its market and settings.
pub struct StrategyBinding {
    pub label: String,
    pub market: Market,
    pub config: StrategyConfig,
    pub strategy: Box<dyn TradingStrategy>,
}

impl StrategyBinding {
    pub fn new(
        label: impl Into<String>,
        market: Market,
        config: StrategyConfig,
        strategy: Box<dyn TradingStrategy>,
    ) -> Self {
        Self {
            label: label.into(),
            market,
            config,
            strategy,
        }
    }
}

impl fmt::Debug for StrategyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyBinding")
            .field("label", &self.label)
            .field("market", &self.market)
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_settings() {
        let config = StrategyConfig::new(HashMap::from([
            ("floor".to_string(), " 12.50 ".to_string()),
            ("bad".to_string(), "twelve".to_string()),
        ]));

        assert_eq!(config.get_decimal("floor").unwrap(), Some(dec!(12.50)));
        assert_eq!(config.get_decimal("missing").unwrap(), None);
        assert!(matches!(
            config.get_decimal("bad"),
            Err(StrategyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_display_is_sorted() {
        let config = StrategyConfig::new(HashMap::from([
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "1".to_string()),
        ]));
        assert_eq!(config.to_string(), "{a=1, b=2}");
        assert!(StrategyConfig::default().is_empty());
    }
}
