//! Error taxonomy for exchange adapter calls.

use thiserror::Error;

/// Errors raised by a [`TradingApi`](super::TradingApi) implementation.
///
/// Adapters must pick the variant carefully: `Timeout` and `Connection`
/// tell the engine to skip the current trade cycle and try again, every
/// other variant stops the engine.
#[derive(Debug, Error)]
pub enum TradingApiError {
    /// Request to the exchange timed out.
    #[error("exchange request timed out: {0}")]
    Timeout(String),

    /// Could not reach the exchange, or it is temporarily unavailable.
    #[error("exchange connection failed: {0}")]
    Connection(String),

    /// Exchange rejected our credentials.
    #[error("exchange rejected authentication: {0}")]
    Authentication(String),

    /// Exchange answered with something we could not understand.
    #[error("malformed exchange response: {0}")]
    MalformedResponse(String),

    /// Any other error reported by the exchange API.
    #[error("exchange API error: {0}")]
    Api(String),
}

impl TradingApiError {
    /// True for network-level failures that are expected to clear by the next cycle.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connection(_))
    }
}
