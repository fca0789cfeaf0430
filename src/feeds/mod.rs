//! Market Data Feeds Module
//!
//! Provides the per-cycle market inputs:
//! - Candle history for the indicator engine
//! - Orderbook depth for the pressure check

pub mod binance;

pub use binance::BinanceFeed;

use async_trait::async_trait;
use thiserror::Error;

use crate::utils::types::{Candle, OrderBook};

/// Feed error types
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FeedError {
    /// Transport or timeout failure
    #[error("request failed: {0}")]
    Http(String),
    /// Non-success HTTP status
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    /// Payload did not have the expected shape
    #[error("malformed payload: {0}")]
    Parse(String),
    /// Venue returned no data
    #[error("empty response for {0}")]
    Empty(&'static str),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::Http(err.to_string())
    }
}

/// Source of candles and depth for one instrument
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Most recent `limit` candles, oldest first
    async fn candles(&self, limit: usize) -> Result<Vec<Candle>, FeedError>;

    /// Top `depth` levels per side, best first
    async fn order_book(&self, depth: usize) -> Result<OrderBook, FeedError>;
}
