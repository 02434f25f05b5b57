//! Trading engine core.
//!
//! - `lifecycle`: run state and the guard against concurrent starts
//! - `emergency_stop`: balance floor circuit breaker
//! - `error`: cycle fault classification and failure policy
//! - `alert`: critical alert sinks and message formatting
//! - `control_loop`: the trade cycle state machine

mod alert;
mod control_loop;
mod emergency_stop;
mod error;
mod lifecycle;

#[cfg(test)]
pub(crate) mod testing;

pub use alert::{AlertSink, CriticalAlert, LogAlertSink, NoopAlertSink, CRITICAL_ALERT_SUBJECT};
pub use control_loop::{EngineSettings, ExitReason, RunSummary, TradingEngine};
pub use emergency_stop::EmergencyStopChecker;
pub use error::{CycleFault, EngineError, FailurePolicy, FaultKind};
pub use lifecycle::{Lifecycle, RunGuard, RunState};
