//! Emergency stop: the capital preservation circuit breaker.
//!
//! Runs at the start of every trade cycle, before any strategy. If the
//! wallet balance of the configured currency has dropped below the floor,
//! trading stops on every market and an operator has to step in.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info};

use super::alert::{AlertSink, CriticalAlert, CRITICAL_ALERT_SUBJECT};
use super::CycleFault;
use crate::exchange::{BalanceInfo, TradingApi};
use crate::utils::format_amount;

/// Compares one currency's exchange balance against a configured floor.
pub struct EmergencyStopChecker {
    currency: String,
    floor: Decimal,
    api: Arc<dyn TradingApi>,
    alerter: Arc<dyn AlertSink>,
}

impl EmergencyStopChecker {
    pub fn new(
        currency: impl Into<String>,
        floor: Decimal,
        api: Arc<dyn TradingApi>,
        alerter: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            currency: currency.into(),
            floor,
            api,
            alerter,
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn floor(&self) -> Decimal {
        self.floor
    }

    /// Check the balance against the floor.
    ///
    /// Returns the current balance when the check passes. A breach is
    /// logged and alerted here, before the error reaches the control loop.
    /// Exchange errors are passed through for the loop's retry policy.
    pub async fn check(&self) -> Result<Decimal, CycleFault> {
        info!("Performing Emergency Stop check...");

        let balances = match self.api.get_balance_info().await {
            Ok(balances) => balances,
            Err(e) => {
                error!(
                    "Failed to get balance info from exchange to perform Emergency Stop check: {}",
                    e
                );
                return Err(e.into());
            }
        };

        let Some(balance) = balances.available(&self.currency) else {
            let fault = CycleFault::MissingBalance {
                currency: self.currency.clone(),
                returned: render_balances(&balances),
            };
            error!("Emergency Stop check failed: {}", fault);
            return Err(fault);
        };

        info!(
            "Emergency Stop currency balance available on exchange is [{}] {}",
            format_amount(balance),
            self.currency
        );
        info!(
            "Balance that will stop ALL trading across ALL markets is [{}] {}",
            format_amount(self.floor),
            self.currency
        );

        if balance < self.floor {
            let message = format!(
                "EMERGENCY STOP triggered! Current Emergency Stop currency [{}] wallet balance [{}] on exchange is lower than configured Emergency Stop balance [{}] {}",
                self.currency,
                format_amount(balance),
                format_amount(self.floor),
                self.currency
            );
            error!("🚨 {}", message);

            let alert = CriticalAlert::new(self.api.name(), message);
            self.alerter
                .send(CRITICAL_ALERT_SUBJECT, &alert.render())
                .await;

            return Err(CycleFault::EmergencyBreach {
                currency: self.currency.clone(),
                balance,
                floor: self.floor,
            });
        }

        info!("Emergency Stop check PASSED!");
        Ok(balance)
    }
}

fn render_balances(balances: &BalanceInfo) -> String {
    balances
        .currencies()
        .into_iter()
        .filter_map(|code| {
            balances
                .available(code)
                .map(|amount| format!("{}={}", code, format_amount(amount)))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{RecordingAlertSink, ScriptedExchange};
    use crate::engine::FaultKind;
    use crate::exchange::TradingApiError;
    use rust_decimal_macros::dec;

    fn checker(
        exchange: &ScriptedExchange,
        alerts: &Arc<RecordingAlertSink>,
        floor: Decimal,
    ) -> EmergencyStopChecker {
        EmergencyStopChecker::new("BTC", floor, Arc::new(exchange.clone()), alerts.clone())
    }

    #[tokio::test]
    async fn test_balance_at_floor_passes() {
        let exchange = ScriptedExchange::with_balance("BTC", dec!(1.00000000));
        let alerts = Arc::new(RecordingAlertSink::default());

        let balance = checker(&exchange, &alerts, dec!(1.00000000)).check().await.unwrap();
        assert_eq!(balance, dec!(1));
        assert!(alerts.sent().is_empty());
    }

    #[tokio::test]
    async fn test_balance_above_floor_passes() {
        let exchange = ScriptedExchange::with_balance("BTC", dec!(10.00000001));
        let alerts = Arc::new(RecordingAlertSink::default());
        assert!(checker(&exchange, &alerts, dec!(10)).check().await.is_ok());
    }

    #[tokio::test]
    async fn test_one_satoshi_below_floor_breaches() {
        let exchange = ScriptedExchange::with_balance("BTC", dec!(0.99999999));
        let alerts = Arc::new(RecordingAlertSink::default());

        let fault = checker(&exchange, &alerts, dec!(1.00000000))
            .check()
            .await
            .unwrap_err();
        assert_eq!(fault.kind(), FaultKind::EmergencyBreach);

        let sent = alerts.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, CRITICAL_ALERT_SUBJECT);
        assert!(sent[0].1.contains("EMERGENCY STOP triggered!"));
        assert!(sent[0].1.contains("[0.99999999]"));
    }

    #[tokio::test]
    async fn test_zero_floor_never_breaches() {
        let exchange = ScriptedExchange::with_balance("BTC", Decimal::ZERO);
        let alerts = Arc::new(RecordingAlertSink::default());
        assert!(checker(&exchange, &alerts, Decimal::ZERO).check().await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_currency_is_integrity_failure() {
        let exchange = ScriptedExchange::with_balance("USD", dec!(5000));
        let alerts = Arc::new(RecordingAlertSink::default());

        let fault = checker(&exchange, &alerts, dec!(1)).check().await.unwrap_err();
        assert_eq!(fault.kind(), FaultKind::FatalUnexpected);
        assert!(fault.to_string().contains("USD=5000"));
        assert!(alerts.sent().is_empty());
    }

    #[tokio::test]
    async fn test_network_error_propagates_as_transient() {
        let exchange = ScriptedExchange::with_balance("BTC", dec!(5));
        exchange.fail_next(TradingApiError::Timeout("balance".into()));
        let alerts = Arc::new(RecordingAlertSink::default());
        let checker = checker(&exchange, &alerts, dec!(1));

        let fault = checker.check().await.unwrap_err();
        assert_eq!(fault.kind(), FaultKind::Transient);

        // next call goes through
        assert_eq!(checker.check().await.unwrap(), dec!(5));
    }

    #[tokio::test]
    async fn test_adapter_error_propagates_as_fatal() {
        let exchange = ScriptedExchange::with_balance("BTC", dec!(5));
        exchange.fail_next(TradingApiError::Authentication("bad signature".into()));
        let alerts = Arc::new(RecordingAlertSink::default());

        let fault = checker(&exchange, &alerts, dec!(1)).check().await.unwrap_err();
        assert_eq!(fault.kind(), FaultKind::FatalAdapter);
    }
}
