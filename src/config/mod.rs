//! Configuration management for the trading engine.
//!
//! Loads settings from a TOML config file layered with environment variables.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::exchange::Market;

/// Adapters the binary knows how to build.
pub const KNOWN_ADAPTERS: &[&str] = &["paper", "binance"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Trade cycle and emergency stop settings
    #[serde(default)]
    pub engine: EngineConfig,
    /// Which exchange adapter to trade through
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// Strategy descriptions, referenced from markets by id
    #[serde(default)]
    pub strategies: Vec<StrategyDescription>,
    /// Markets to trade, in execution order
    #[serde(default)]
    pub markets: Vec<MarketConfig>,
    /// Critical alert delivery
    #[serde(default)]
    pub alerts: AlertConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds to wait between trade cycles
    #[serde(default = "default_trade_cycle_interval")]
    pub trade_cycle_interval: u64,
    /// Currency watched by the emergency stop, e.g. "BTC" or "USD"
    #[serde(default = "default_emergency_stop_currency")]
    pub emergency_stop_currency: String,
    /// Trading halts when the emergency stop currency balance drops below this
    #[serde(default = "default_emergency_stop_balance")]
    pub emergency_stop_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Adapter name, one of [`KNOWN_ADAPTERS`]
    #[serde(default = "default_adapter")]
    pub adapter: String,
    /// Starting balances for the paper adapter
    #[serde(default)]
    pub paper_balances: HashMap<String, Decimal>,
    /// Binance API credentials
    #[serde(default)]
    pub binance: BinanceConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BinanceConfig {
    /// API key for authentication
    #[serde(default)]
    pub api_key: String,
    /// Secret key for signing requests
    #[serde(default)]
    pub secret_key: String,
    /// Use testnet instead of production
    #[serde(default)]
    pub testnet: bool,
}

/// A named strategy that markets can reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyDescription {
    /// Id referenced by `MarketConfig::strategy`
    pub id: String,
    /// Display name
    #[serde(default)]
    pub label: String,
    /// Registered strategy implementation to build
    pub kind: String,
    /// Optional key/value settings handed to the strategy
    #[serde(default)]
    pub config: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    pub label: String,
    pub id: String,
    pub base_currency: String,
    pub counter_currency: String,
    /// Disabled markets are skipped at startup
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Id of the strategy to run on this market
    pub strategy: String,
}

impl MarketConfig {
    pub fn market(&self) -> Market {
        Market::new(
            self.label.clone(),
            self.id.clone(),
            self.base_currency.clone(),
            self.counter_currency.clone(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Send critical alerts when the engine shuts down on a fatal error
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_trade_cycle_interval() -> u64 {
    60
}

fn default_emergency_stop_currency() -> String {
    "BTC".to_string()
}

fn default_emergency_stop_balance() -> Decimal {
    Decimal::ONE
}

fn default_adapter() -> String {
    "paper".to_string()
}

fn default_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from environment variables and an optional config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = path.as_ref();
        let config = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::default().separator("__").prefix("BOT"))
            .build()
            .with_context(|| format!("Failed to build configuration from {}", path.display()))?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.engine.trade_cycle_interval >= 1,
            "trade_cycle_interval must be at least 1 second"
        );

        anyhow::ensure!(
            !self.engine.emergency_stop_currency.trim().is_empty(),
            "emergency_stop_currency must be set"
        );

        anyhow::ensure!(
            self.engine.emergency_stop_balance >= Decimal::ZERO,
            "emergency_stop_balance must not be negative"
        );

        anyhow::ensure!(
            KNOWN_ADAPTERS.contains(&self.exchange.adapter.as_str()),
            "unknown exchange adapter '{}', expected one of {:?}",
            self.exchange.adapter,
            KNOWN_ADAPTERS
        );

        let mut strategy_ids = HashSet::new();
        for strategy in &self.strategies {
            anyhow::ensure!(
                strategy_ids.insert(strategy.id.as_str()),
                "duplicate strategy id '{}'",
                strategy.id
            );
        }

        let mut markets = HashSet::new();
        for market_config in self.markets.iter().filter(|m| m.enabled) {
            let market = market_config.market();
            anyhow::ensure!(
                strategy_ids.contains(market_config.strategy.as_str()),
                "market {} references unknown strategy '{}'",
                market,
                market_config.strategy
            );
            anyhow::ensure!(markets.insert(market.clone()), "duplicate market {}", market);
        }

        Ok(())
    }

    /// Look up a strategy description by id.
    pub fn strategy(&self, id: &str) -> Option<&StrategyDescription> {
        self.strategies.iter().find(|s| s.id == id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            exchange: ExchangeConfig::default(),
            strategies: Vec::new(),
            markets: Vec::new(),
            alerts: AlertConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trade_cycle_interval: default_trade_cycle_interval(),
            emergency_stop_currency: default_emergency_stop_currency(),
            emergency_stop_balance: default_emergency_stop_balance(),
        }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            adapter: default_adapter(),
            paper_balances: HashMap::new(),
            binance: BinanceConfig::default(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tokio_test::{assert_err, assert_ok};

    fn market(id: &str, strategy: &str) -> MarketConfig {
        MarketConfig {
            label: "BTC/USD".to_string(),
            id: id.to_string(),
            base_currency: "BTC".to_string(),
            counter_currency: "USD".to_string(),
            enabled: true,
            strategy: strategy.to_string(),
        }
    }

    fn strategy(id: &str) -> StrategyDescription {
        StrategyDescription {
            id: id.to_string(),
            label: "Watcher".to_string(),
            kind: "balance-watch".to_string(),
            config: HashMap::new(),
        }
    }

    fn trading_config() -> Config {
        Config {
            strategies: vec![strategy("watch")],
            markets: vec![market("btcusd", "watch")],
            ..Config::default()
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_ok!(config.validate());
        assert_ok!(trading_config().validate());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = trading_config();
        config.engine.trade_cycle_interval = 0;
        assert_err!(config.validate());
    }

    #[test]
    fn test_negative_floor_rejected() {
        let mut config = trading_config();
        config.engine.emergency_stop_balance = dec!(-0.01);
        assert!(config.validate().is_err());

        config.engine.emergency_stop_balance = Decimal::ZERO;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_market_rejected() {
        let mut config = trading_config();
        config.markets.push(market("btcusd", "watch"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate market"));
    }

    #[test]
    fn test_disabled_duplicate_is_ignored() {
        let mut config = trading_config();
        let mut disabled = market("btcusd", "missing");
        disabled.enabled = false;
        config.markets.push(disabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_strategy_reference_rejected() {
        let mut config = trading_config();
        config.markets.push(market("ethusd", "nope"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unknown strategy"));
    }

    #[test]
    fn test_unknown_adapter_rejected() {
        let mut config = trading_config();
        config.exchange.adapter = "kraken".to_string();
        assert_err!(config.validate());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = std::env::temp_dir().join(format!("trading-engine-cfg-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("engine.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[engine]
trade_cycle_interval = 5
emergency_stop_currency = "BTC"
emergency_stop_balance = "10"

[exchange]
adapter = "paper"
paper_balances = {{ BTC = "12.5" }}

[[strategies]]
id = "watch"
kind = "balance-watch"
config = {{ min_counter_balance = "100" }}

[[markets]]
label = "BTC/USD"
id = "btcusd"
base_currency = "BTC"
counter_currency = "USD"
strategy = "watch"
"#
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.engine.trade_cycle_interval, 5);
        assert_eq!(config.engine.emergency_stop_balance, dec!(10));
        assert_eq!(
            config.exchange.paper_balances.values().copied().collect::<Vec<_>>(),
            vec![dec!(12.5)]
        );
        assert_eq!(
            config.strategy("watch").unwrap().config.get("min_counter_balance"),
            Some(&"100".to_string())
        );
        assert!(config.markets[0].enabled);
        assert!(config.validate().is_ok());

        std::fs::remove_dir_all(&dir).ok();
    }
}
