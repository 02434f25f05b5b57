//! Critical alerts sent when the engine is forced to shut down.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error;
use tracing::error;

use super::CycleFault;

/// Subject line of every critical alert.
pub const CRITICAL_ALERT_SUBJECT: &str = "CRITICAL Alert message from trading engine";

/// Destination for critical alerts.
///
/// Delivery is best effort: implementations swallow and log their own
/// failures so an alert can never change the engine's shutdown decision.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, subject: &str, body: &str);
}

/// Emits alerts as structured log lines.
#[derive(Debug, Default, Clone)]
pub struct LogAlertSink;

#[derive(Serialize)]
struct AlertRecord<'a> {
    timestamp: DateTime<Utc>,
    subject: &'a str,
    body: &'a str,
}

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn send(&self, subject: &str, body: &str) {
        let record = AlertRecord {
            timestamp: Utc::now(),
            subject,
            body,
        };
        let json = serde_json::to_string(&record).unwrap_or_default();
        error!(target: "critical_alert", "CRITICAL_ALERT: {}", json);
    }
}

/// Drops every alert. Used when alerting is disabled.
#[derive(Debug, Default, Clone)]
pub struct NoopAlertSink;

#[async_trait]
impl AlertSink for NoopAlertSink {
    async fn send(&self, _subject: &str, _body: &str) {}
}

/// Plain text body of a critical alert.
#[derive(Debug, Clone)]
pub struct CriticalAlert {
    pub adapter: String,
    pub timestamp: DateTime<Utc>,
    pub details: String,
    /// Error source chain, outermost first
    pub cause_trace: Vec<String>,
}

impl CriticalAlert {
    /// Alert without an underlying error, e.g. an emergency stop.
    pub fn new(adapter: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            adapter: adapter.into(),
            timestamp: Utc::now(),
            details: details.into(),
            cause_trace: Vec::new(),
        }
    }

    /// Alert for a fatal cycle fault, with details, cause and source chain.
    pub fn for_fault(adapter: impl Into<String>, headline: &str, fault: &CycleFault) -> Self {
        let cause = fault
            .source()
            .map(ToString::to_string)
            .unwrap_or_else(|| "none".to_string());
        let details = format!("{headline} Details: {fault} Cause: {cause}");

        let mut cause_trace = Vec::new();
        let mut current: Option<&dyn Error> = Some(fault);
        while let Some(err) = current {
            cause_trace.push(err.to_string());
            current = err.source();
        }

        Self {
            cause_trace,
            ..Self::new(adapter, details)
        }
    }

    pub fn render(&self) -> String {
        let mut body = String::from("A CRITICAL error event has occurred on the trading engine.\n\n");

        body.push_str("Exchange Adapter:\n");
        body.push_str(&self.adapter);
        body.push_str("\n\n");

        body.push_str("Event Time:\n");
        body.push_str(&self.timestamp.to_rfc2822());
        body.push_str("\n\n");

        body.push_str("Event Details:\n");
        body.push_str(&self.details);
        body.push_str("\n\n");

        body.push_str("Take Action:\n");
        body.push_str("Check the engine logs for more information. The engine will shutdown NOW!\n\n");

        if !self.cause_trace.is_empty() {
            body.push_str("Cause Trace:\n");
            for (depth, cause) in self.cause_trace.iter().enumerate() {
                body.push_str(&format!("  {depth}: {cause}\n"));
            }
        }

        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::TradingApiError;
    use crate::strategy::StrategyError;

    #[test]
    fn test_plain_alert_sections() {
        let body = CriticalAlert::new("paper", "EMERGENCY STOP triggered!").render();

        assert!(body.starts_with("A CRITICAL error event"));
        assert!(body.contains("Exchange Adapter:\npaper\n"));
        assert!(body.contains("Event Time:\n"));
        assert!(body.contains("Event Details:\nEMERGENCY STOP triggered!\n"));
        assert!(body.contains("Take Action:\n"));
        assert!(!body.contains("Cause Trace:"));
    }

    #[test]
    fn test_fault_alert_includes_cause_chain() {
        let fault = CycleFault::from_strategy(
            "scalper",
            StrategyError::Failed("order book crossed".to_string()),
        );
        let alert = CriticalAlert::for_fault(
            "binance-spot",
            "A FATAL error has occurred in Trading Strategy!",
            &fault,
        );

        assert!(alert.details.starts_with("A FATAL error has occurred in Trading Strategy!"));
        assert!(alert.details.contains("Cause: strategy failed: order book crossed"));
        assert_eq!(alert.cause_trace.len(), 2);

        let body = alert.render();
        assert!(body.contains("Cause Trace:\n  0: trading strategy 'scalper' failed"));
        assert!(body.contains("  1: strategy failed: order book crossed"));
    }

    #[test]
    fn test_fault_without_source() {
        let fault = CycleFault::MissingBalance {
            currency: "BTC".to_string(),
            returned: "USD=1".to_string(),
        };
        let alert = CriticalAlert::for_fault("paper", "FATAL", &fault);
        assert!(alert.details.ends_with("Cause: none"));
        assert_eq!(alert.cause_trace.len(), 1);

        let fault: CycleFault = TradingApiError::Api("boom".to_string()).into();
        let alert = CriticalAlert::for_fault("paper", "FATAL", &fault);
        assert_eq!(alert.cause_trace.len(), 2);
    }

    #[tokio::test]
    async fn test_sinks_never_fail() {
        LogAlertSink.send(CRITICAL_ALERT_SUBJECT, "body").await;
        NoopAlertSink.send(CRITICAL_ALERT_SUBJECT, "body").await;
    }
}
