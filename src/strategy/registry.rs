//! Strategy construction from configuration.
//!
//! Resolves each enabled market's strategy description to a registered
//! factory and builds the ordered binding list the engine executes.

use anyhow::{bail, Context, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

use super::balance_watch::{BalanceWatchStrategy, BALANCE_WATCH};
use super::{StrategyBinding, StrategyConfig, StrategyError, TradingStrategy};
use crate::config::Config;
use crate::exchange::{Market, TradingApi};

/// Everything a strategy is initialised with.
pub struct StrategyContext {
    pub api: Arc<dyn TradingApi>,
    pub market: Market,
    pub config: StrategyConfig,
}

/// Builds a strategy instance for one market.
pub type StrategyFactory = fn(StrategyContext) -> Result<Box<dyn TradingStrategy>, StrategyError>;

/// Maps strategy kinds named in config to their factories.
pub struct StrategyRegistry {
    factories: HashMap<String, StrategyFactory>,
}

impl StrategyRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the strategies shipped in this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(BALANCE_WATCH, BalanceWatchStrategy::build);
        registry
    }

    pub fn register(&mut self, kind: impl Into<String>, factory: StrategyFactory) {
        self.factories.insert(kind.into(), factory);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Build a strategy of the given kind.
    pub fn build(
        &self,
        kind: &str,
        ctx: StrategyContext,
    ) -> Result<Box<dyn TradingStrategy>, StrategyError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| StrategyError::InvalidConfig(format!("unknown strategy kind '{kind}'")))?;
        factory(ctx)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Build one binding per enabled market, in configured order.
pub fn bind_strategies(
    config: &Config,
    api: Arc<dyn TradingApi>,
    registry: &StrategyRegistry,
) -> Result<Vec<StrategyBinding>> {
    let mut loaded_markets = HashSet::new();
    let mut bindings = Vec::new();

    for market_config in &config.markets {
        let market = market_config.market();

        if !market_config.enabled {
            info!("Market {} is NOT enabled for trading - skipping", market.label);
            continue;
        }

        if !loaded_markets.insert(market.clone()) {
            bail!("Found duplicate market in config: {}", market);
        }

        let Some(description) = config.strategy(&market_config.strategy) else {
            bail!(
                "Failed to find strategy '{}' for market {}",
                market_config.strategy,
                market
            );
        };

        let strategy_config = StrategyConfig::new(description.config.clone());
        if strategy_config.is_empty() {
            info!("No optional configuration set for strategy '{}'", description.id);
        }

        let strategy = registry
            .build(
                &description.kind,
                StrategyContext {
                    api: api.clone(),
                    market: market.clone(),
                    config: strategy_config.clone(),
                },
            )
            .with_context(|| {
                format!(
                    "Failed to initialise strategy '{}' for market {}",
                    description.id, market
                )
            })?;

        let label = if description.label.is_empty() {
            description.id.clone()
        } else {
            description.label.clone()
        };

        info!(
            strategy = %label,
            kind = %description.kind,
            market = %market.label,
            config = %strategy_config,
            "Initialised trading strategy"
        );
        bindings.push(StrategyBinding::new(label, market, strategy_config, strategy));
    }

    Ok(bindings)
}
