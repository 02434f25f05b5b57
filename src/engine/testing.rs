//! Test doubles shared by the engine tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use super::alert::AlertSink;
use super::EngineSettings;
use crate::exchange::{BalanceInfo, Market, PaperExchange, TradingApi, TradingApiError};
use crate::strategy::{StrategyBinding, StrategyConfig, StrategyError, TradingStrategy};

/// Paper balances plus a queue of errors to return before them.
#[derive(Clone, Default)]
pub struct ScriptedExchange {
    pub paper: PaperExchange,
    failures: Arc<Mutex<VecDeque<TradingApiError>>>,
    panics: Arc<Mutex<u32>>,
}

impl ScriptedExchange {
    pub fn with_balance(currency: &str, amount: Decimal) -> Self {
        Self {
            paper: PaperExchange::new(HashMap::from([(currency.to_string(), amount)])),
            failures: Arc::default(),
            panics: Arc::default(),
        }
    }

    pub fn fail_next(&self, err: TradingApiError) {
        self.failures.lock().push_back(err);
    }

    /// Make the next balance query panic instead of returning.
    pub fn panic_next(&self) {
        *self.panics.lock() += 1;
    }
}

#[async_trait]
impl TradingApi for ScriptedExchange {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn get_balance_info(&self) -> Result<BalanceInfo, TradingApiError> {
        let should_panic = {
            let mut panics = self.panics.lock();
            let pending = *panics > 0;
            *panics = panics.saturating_sub(1);
            pending
        };
        if should_panic {
            panic!("exchange fell over");
        }

        let failure = self.failures.lock().pop_front();
        match failure {
            Some(err) => Err(err),
            None => self.paper.get_balance_info().await,
        }
    }
}

/// Records every alert it is asked to send.
#[derive(Default)]
pub struct RecordingAlertSink {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingAlertSink {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlertSink {
    async fn send(&self, subject: &str, body: &str) {
        self.sent.lock().push((subject.to_string(), body.to_string()));
    }
}

/// What a scripted strategy does on one `execute` call.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    Pass,
    Transient,
    AdapterFailure,
    Fatal,
    Panic,
}

/// Shared, ordered log of strategy executions.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Strategy that follows a script, then passes forever.
pub struct ScriptedStrategy {
    name: String,
    steps: VecDeque<Step>,
    calls: CallLog,
}

#[async_trait]
impl TradingStrategy for ScriptedStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&mut self) -> Result<(), StrategyError> {
        self.calls.lock().push(self.name.clone());
        match self.steps.pop_front().unwrap_or(Step::Pass) {
            Step::Pass => Ok(()),
            Step::Transient => Err(StrategyError::Exchange(TradingApiError::Connection(
                "connection reset by peer".into(),
            ))),
            Step::AdapterFailure => Err(StrategyError::Exchange(TradingApiError::Api(
                "order rejected: unknown symbol".into(),
            ))),
            Step::Fatal => Err(StrategyError::Failed("order book crossed".into())),
            Step::Panic => panic!("strategy {} blew up", self.name),
        }
    }
}

pub fn scripted_binding(name: &str, steps: &[Step], calls: &CallLog) -> StrategyBinding {
    StrategyBinding::new(
        name,
        Market::new(name, name, "BTC", "USD"),
        StrategyConfig::default(),
        Box::new(ScriptedStrategy {
            name: name.to_string(),
            steps: steps.iter().copied().collect(),
            calls: calls.clone(),
        }),
    )
}

pub fn settings(interval_secs: u64, floor: Decimal) -> EngineSettings {
    EngineSettings {
        trade_cycle_interval: Duration::from_secs(interval_secs),
        emergency_stop_currency: "BTC".to_string(),
        emergency_stop_balance: floor,
    }
}
