//! Exchange integrations.
//!
//! ## Paper
//! In-memory balances for dry runs and tests.
//!
//! ## Binance
//! Signed spot account queries for live balance checks.

mod binance;
mod error;
mod paper;
mod traits;
mod types;

pub use binance::BinanceSpotClient;
pub use error::TradingApiError;
pub use paper::PaperExchange;
pub use traits::TradingApi;
pub use types::*;
