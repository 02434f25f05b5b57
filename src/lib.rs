//! # Trading Engine
//!
//! Runs a fixed set of trading strategies against a single exchange, one
//! trade cycle at a time, behind an emergency stop on wallet balance.
//!
//! ## Architecture
//!
//! - `config`: Configuration loading and validation
//! - `exchange`: Exchange adapter interface, paper and Binance adapters
//! - `strategy`: Strategy interface, registry and market bindings
//! - `engine`: Control loop, emergency stop, failure policy, alerts
//! - `utils`: Shared utilities and decimal formatting

pub mod config;
pub mod engine;
pub mod exchange;
pub mod strategy;
pub mod utils;
