//! Failure taxonomy for the control loop.
//!
//! Every way a trade cycle can end badly is a [`CycleFault`]. Its
//! [`FaultKind`] decides the loop's next move: network noise is retried
//! next cycle, everything else stops the engine.

use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

use crate::exchange::TradingApiError;
use crate::strategy::StrategyError;
use crate::utils::format_amount;

/// Classification of a cycle failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Transient,
    FatalAdapter,
    FatalStrategy,
    FatalUnexpected,
    EmergencyBreach,
}

/// What the control loop does after a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log, sleep the trade interval, run the next cycle.
    Retry,
    /// Alert and stop the engine after this cycle.
    Halt,
}

impl FaultKind {
    pub fn policy(self) -> FailurePolicy {
        match self {
            FaultKind::Transient => FailurePolicy::Retry,
            _ => FailurePolicy::Halt,
        }
    }

    /// Component named in fatal log lines and alerts.
    pub fn origin(self) -> &'static str {
        match self {
            FaultKind::Transient | FaultKind::FatalAdapter => "Exchange Adapter",
            FaultKind::FatalStrategy => "Trading Strategy",
            FaultKind::FatalUnexpected => "Exchange Adapter or Trading Strategy",
            FaultKind::EmergencyBreach => "Emergency Stop",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FaultKind::Transient => "transient",
            FaultKind::FatalAdapter => "fatal-adapter",
            FaultKind::FatalStrategy => "fatal-strategy",
            FaultKind::FatalUnexpected => "fatal-unexpected",
            FaultKind::EmergencyBreach => "emergency-breach",
        };
        f.write_str(name)
    }
}

/// A failure raised from the body of one trade cycle.
#[derive(Debug, Error)]
pub enum CycleFault {
    /// Network trouble talking to the exchange.
    #[error("network error talking to exchange: {0}")]
    Network(#[source] TradingApiError),

    /// The exchange adapter reported a structural or integrity failure.
    #[error("exchange adapter failure: {0}")]
    Adapter(#[source] TradingApiError),

    /// Strategy logic failed.
    #[error("trading strategy '{strategy}' failed: {source}")]
    Strategy {
        strategy: String,
        #[source]
        source: StrategyError,
    },

    /// Exchange returned no balance for the emergency stop currency.
    #[error("no '{currency}' balance returned by exchange, balances returned: [{returned}]")]
    MissingBalance { currency: String, returned: String },

    /// A panic escaped the balance query or a strategy.
    #[error("{origin} panicked: {message}")]
    Panic { origin: String, message: String },

    /// Emergency stop currency balance fell below the configured floor.
    #[error(
        "emergency stop triggered: {currency} balance {} is below {}",
        format_amount(*balance),
        format_amount(*floor)
    )]
    EmergencyBreach {
        currency: String,
        balance: Decimal,
        floor: Decimal,
    },
}

impl CycleFault {
    /// Wrap an error returned by a strategy, classifying any exchange error it carries.
    pub fn from_strategy(strategy: impl Into<String>, err: StrategyError) -> Self {
        match err {
            StrategyError::Exchange(inner) => inner.into(),
            other => CycleFault::Strategy {
                strategy: strategy.into(),
                source: other,
            },
        }
    }

    pub fn kind(&self) -> FaultKind {
        match self {
            CycleFault::Network(_) => FaultKind::Transient,
            CycleFault::Adapter(_) => FaultKind::FatalAdapter,
            CycleFault::Strategy { .. } => FaultKind::FatalStrategy,
            CycleFault::MissingBalance { .. } | CycleFault::Panic { .. } => {
                FaultKind::FatalUnexpected
            }
            CycleFault::EmergencyBreach { .. } => FaultKind::EmergencyBreach,
        }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.kind().policy()
    }
}

impl From<TradingApiError> for CycleFault {
    fn from(err: TradingApiError) -> Self {
        if err.is_transient() {
            CycleFault::Network(err)
        } else {
            CycleFault::Adapter(err)
        }
    }
}

/// Errors returned to callers of the engine lifecycle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("cannot start trading engine because it is already running")]
    AlreadyRunning,
}
