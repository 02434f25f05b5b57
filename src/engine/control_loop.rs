//! The trading engine control loop.
//!
//! Each trade cycle runs the emergency stop check, then every strategy in
//! configured order, then sleeps the trade interval. Network failures skip
//! the rest of the cycle and retry next interval. Anything else fails hard
//! and fast: log, alert, stop.

use futures_util::FutureExt;
use rust_decimal::Decimal;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

use super::alert::{AlertSink, CriticalAlert, CRITICAL_ALERT_SUBJECT};
use super::emergency_stop::EmergencyStopChecker;
use super::lifecycle::{Lifecycle, RunGuard, RunState};
use super::{CycleFault, EngineError, FailurePolicy, FaultKind};
use crate::config::EngineConfig;
use crate::exchange::TradingApi;
use crate::strategy::StrategyBinding;

/// Engine parameters, fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Time slept between trade cycles
    pub trade_cycle_interval: Duration,
    /// Currency watched by the emergency stop
    pub emergency_stop_currency: String,
    /// Emergency stop balance floor
    pub emergency_stop_balance: Decimal,
}

impl From<&EngineConfig> for EngineSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            trade_cycle_interval: Duration::from_secs(config.trade_cycle_interval),
            emergency_stop_currency: config.emergency_stop_currency.clone(),
            emergency_stop_balance: config.emergency_stop_balance,
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// `shutdown()` was called.
    ShutdownRequested,
    /// A fault with a halting policy stopped the loop.
    Halted(FaultKind),
}

/// Counters for a single run. Not carried over into the next `start()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Trade cycles begun
    pub cycles: u64,
    /// Cycles that ended in a fault, retried or not
    pub failed_cycles: u64,
    pub exit: ExitReason,
}

/// The main trading engine.
pub struct TradingEngine {
    settings: EngineSettings,
    exchange: Arc<dyn TradingApi>,
    emergency_stop: EmergencyStopChecker,
    strategies: Mutex<Vec<StrategyBinding>>,
    alerter: Arc<dyn AlertSink>,
    lifecycle: Lifecycle,
}

impl TradingEngine {
    pub fn new(
        settings: EngineSettings,
        exchange: Arc<dyn TradingApi>,
        strategies: Vec<StrategyBinding>,
        alerter: Arc<dyn AlertSink>,
    ) -> Self {
        let emergency_stop = EmergencyStopChecker::new(
            settings.emergency_stop_currency.clone(),
            settings.emergency_stop_balance,
            exchange.clone(),
            alerter.clone(),
        );

        Self {
            settings,
            exchange,
            emergency_stop,
            strategies: Mutex::new(strategies),
            alerter,
            lifecycle: Lifecycle::new(),
        }
    }

    /// Run the engine until it is shut down or hits a fatal fault.
    ///
    /// Fails immediately with `AlreadyRunning`, changing nothing, if another
    /// caller is already inside `start()`.
    pub async fn start(&self) -> Result<RunSummary, EngineError> {
        let mut run = self.lifecycle.begin().inspect_err(|e| error!("{}", e))?;

        info!("🚀 Starting trading engine...");
        let summary = self.run_control_loop(&mut run).await;

        match summary.exit {
            ExitReason::ShutdownRequested => info!("🛑 Trading engine is shutting down NOW!"),
            ExitReason::Halted(kind) => error!(%kind, "Trading engine is shutting down NOW!"),
        }
        info!(
            cycles = summary.cycles,
            failed_cycles = summary.failed_cycles,
            "Run finished"
        );
        Ok(summary)
    }

    /// Ask the engine to stop. Safe to call from anywhere, at any time.
    ///
    /// A loop sleeping between cycles wakes up immediately. A cycle in
    /// progress finishes its current call first.
    pub fn shutdown(&self) {
        info!("Shutdown request received!");
        if !self.lifecycle.request_shutdown() {
            info!("Trading engine is not running, nothing to shut down");
        }
    }

    pub fn is_running(&self) -> bool {
        self.run_state() == RunState::Running
    }

    pub fn run_state(&self) -> RunState {
        self.lifecycle.state()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    async fn run_control_loop(&self, run: &mut RunGuard<'_>) -> RunSummary {
        let mut strategies = self.strategies.lock().await;
        let mut cycles = 0;
        let mut failed_cycles = 0;

        while run.should_continue() {
            cycles += 1;
            info!(cycle = cycles, "*** Starting next trade cycle... ***");

            if let Err(fault) = self.run_cycle(&mut strategies).await {
                failed_cycles += 1;
                match fault.policy() {
                    FailurePolicy::Retry => warn!(
                        "A network error has occurred in Exchange Adapter! Will attempt next trade in {}s... ({})",
                        self.settings.trade_cycle_interval.as_secs(),
                        fault
                    ),
                    FailurePolicy::Halt => {
                        self.report_fatal(&fault).await;
                        return RunSummary {
                            cycles,
                            failed_cycles,
                            exit: ExitReason::Halted(fault.kind()),
                        };
                    }
                }
            }

            self.sleep_until_next_cycle(run).await;
        }

        RunSummary {
            cycles,
            failed_cycles,
            exit: ExitReason::ShutdownRequested,
        }
    }

    async fn run_cycle(&self, strategies: &mut [StrategyBinding]) -> Result<(), CycleFault> {
        // must pass before any strategy trades
        catch_panic("emergency stop balance query", self.emergency_stop.check()).await?;

        for binding in strategies.iter_mut() {
            info!(
                market = %binding.market.label,
                "Executing trading strategy ---> {} ({})",
                binding.label,
                binding.strategy.name()
            );
            execute_strategy(binding).await?;
        }

        Ok(())
    }

    async fn report_fatal(&self, fault: &CycleFault) {
        let kind = fault.kind();
        if kind == FaultKind::EmergencyBreach {
            // logged and alerted by the emergency stop check
            return;
        }

        let headline = match kind {
            FaultKind::FatalUnexpected => {
                format!("An unexpected FATAL error has occurred in {}!", kind.origin())
            }
            _ => format!("A FATAL error has occurred in {}!", kind.origin()),
        };
        error!(%kind, "{} {}", headline, fault);

        let alert = CriticalAlert::for_fault(self.exchange.name(), &headline, fault);
        self.alerter
            .send(CRITICAL_ALERT_SUBJECT, &alert.render())
            .await;
    }

    async fn sleep_until_next_cycle(&self, run: &mut RunGuard<'_>) {
        if !run.should_continue() {
            return;
        }

        let interval = self.settings.trade_cycle_interval;
        info!("*** Sleeping {}s til next trade cycle... ***", interval.as_secs());

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown_requested(run.keep_alive()) => {
                info!("Woken from trade cycle sleep by shutdown request");
            }
        }
    }
}

async fn shutdown_requested(keep_alive: &mut watch::Receiver<bool>) {
    // a closed channel also means nobody is keeping the engine alive
    let _ = keep_alive.wait_for(|alive| !*alive).await;
}

/// Execute one strategy, turning errors and panics into cycle faults.
async fn execute_strategy(binding: &mut StrategyBinding) -> Result<(), CycleFault> {
    let label = binding.label.clone();
    let origin = format!("trading strategy '{label}'");
    catch_panic(&origin, async {
        binding
            .strategy
            .execute()
            .await
            .map_err(|err| CycleFault::from_strategy(label, err))
    })
    .await
}

/// Run part of a cycle, reporting a panic inside it as a fault.
async fn catch_panic<T, F>(origin: &str, step: F) -> Result<T, CycleFault>
where
    F: Future<Output = Result<T, CycleFault>>,
{
    match AssertUnwindSafe(step).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(CycleFault::Panic {
            origin: origin.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
