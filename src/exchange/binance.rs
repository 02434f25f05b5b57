//! Binance spot REST client (balances only).

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument};

use super::{BalanceInfo, TradingApi, TradingApiError};
use crate::config::BinanceConfig;

const SPOT_BASE_URL: &str = "https://api.binance.com";
const SPOT_TESTNET_URL: &str = "https://testnet.binance.vision";

#[derive(Debug, Deserialize)]
struct AccountResponse {
    balances: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
struct AssetBalance {
    asset: String,
    #[serde(with = "rust_decimal::serde::str")]
    free: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    locked: Decimal,
}

/// Binance spot API client used as the engine's balance source.
pub struct BinanceSpotClient {
    http: Client,
    api_key: String,
    secret_key: String,
    base_url: String,
}

impl BinanceSpotClient {
    /// Create a new client from configuration.
    pub fn new(config: &BinanceConfig) -> Result<Self, TradingApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TradingApiError::Api(format!("failed to create HTTP client: {e}")))?;

        let base_url = if config.testnet {
            SPOT_TESTNET_URL
        } else {
            SPOT_BASE_URL
        };

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            secret_key: config.secret_key.clone(),
            base_url: base_url.to_string(),
        })
    }

    /// Point the client at a different host (used against local mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Generate HMAC-SHA256 signature for authenticated requests.
    fn sign(&self, query_string: &str) -> Result<String, TradingApiError> {
        let mut mac = Hmac::<sha2::Sha256>::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| TradingApiError::Authentication(e.to_string()))?;
        mac.update(query_string.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn timestamp() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
    }
}

/// Split reqwest failures into retryable network noise and fatal errors.
fn classify_request_error(err: reqwest::Error) -> TradingApiError {
    if err.is_timeout() {
        TradingApiError::Timeout(err.to_string())
    } else if err.is_connect() {
        TradingApiError::Connection(err.to_string())
    } else {
        TradingApiError::Api(err.to_string())
    }
}

/// A body that stops arriving is a network failure, whatever reqwest calls it.
fn classify_body_error(err: reqwest::Error) -> TradingApiError {
    if err.is_timeout() {
        TradingApiError::Timeout(err.to_string())
    } else {
        TradingApiError::Connection(format!("failed reading response body: {err}"))
    }
}

fn classify_status(status: StatusCode, body: String) -> TradingApiError {
    let detail = format!("HTTP {status}: {body}");
    match status {
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            TradingApiError::Connection(detail)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TradingApiError::Authentication(detail),
        s if s.is_server_error() => TradingApiError::Connection(detail),
        _ => TradingApiError::Api(detail),
    }
}

#[async_trait]
impl TradingApi for BinanceSpotClient {
    fn name(&self) -> &str {
        "binance-spot"
    }

    #[instrument(skip(self))]
    async fn get_balance_info(&self) -> Result<BalanceInfo, TradingApiError> {
        let query = format!("timestamp={}", Self::timestamp());
        let signature = self.sign(&query)?;
        let url = format!(
            "{}/api/v3/account?{}&signature={}",
            self.base_url, query, signature
        );

        let response = self
            .http
            .get(&url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let body = response.bytes().await.map_err(classify_body_error)?;
        let account: AccountResponse = serde_json::from_slice(&body)
            .map_err(|e| TradingApiError::MalformedResponse(e.to_string()))?;
        debug!(assets = account.balances.len(), "Fetched spot balances");

        let mut info = BalanceInfo::default();
        for balance in account.balances {
            info.on_hold.insert(balance.asset.clone(), balance.locked);
            info.available.insert(balance.asset, balance.free);
        }
        Ok(info)
    }
}
