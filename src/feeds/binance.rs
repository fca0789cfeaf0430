//! Binance Market Data Feed
//!
//! Pulls klines and depth from the public Binance spot REST API. Prices and
//! quantities arrive as decimal strings and are parsed into typed levels.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{FeedError, MarketDataSource};
use crate::config::{ExecutionConfig, TradingConfig};
use crate::utils::helpers::retry_with_backoff;
use crate::utils::types::{Candle, OrderBook, OrderBookLevel};

/// Depth limits accepted by `/api/v3/depth`
const DEPTH_LIMITS: [usize; 8] = [5, 10, 20, 50, 100, 500, 1000, 5000];
/// Largest kline page
const MAX_KLINES: usize = 1000;

/// Depth response
#[derive(Debug, Deserialize)]
pub struct DepthResponse {
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: u64,
    pub bids: Vec<[String; 2]>,
    pub asks: Vec<[String; 2]>,
}

/// Binance public REST feed for one symbol
pub struct BinanceFeed {
    /// API base URL
    api_url: String,
    symbol: String,
    interval: String,
    rate_limit_delay: Duration,
    max_retries: u32,
    retry_delay_ms: u64,
    /// HTTP client
    client: reqwest::Client,
}

impl BinanceFeed {
    pub fn new(trading: &TradingConfig, execution: &ExecutionConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(execution.request_timeout_ms))
            .build()?;

        Ok(Self {
            api_url: execution.api_url.trim_end_matches('/').to_string(),
            symbol: trading.symbol.to_uppercase(),
            interval: trading.interval.clone(),
            rate_limit_delay: Duration::from_millis(execution.rate_limit_delay_ms),
            max_retries: execution.max_retries,
            retry_delay_ms: execution.retry_delay_ms,
            client,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FeedError> {
        retry_with_backoff(
            move || async move {
                tokio::time::sleep(self.rate_limit_delay).await;

                let response = self.client.get(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    warn!("Binance request failed with {}: {}", status, body);
                    return Err(FeedError::Status {
                        status: status.as_u16(),
                        body,
                    });
                }

                response
                    .json::<T>()
                    .await
                    .map_err(|e| FeedError::Parse(e.to_string()))
            },
            self.max_retries,
            self.retry_delay_ms,
        )
        .await
    }
}

#[async_trait]
impl MarketDataSource for BinanceFeed {
    async fn candles(&self, limit: usize) -> Result<Vec<Candle>, FeedError> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.api_url,
            self.symbol,
            self.interval,
            limit.clamp(1, MAX_KLINES)
        );

        let rows: Vec<Vec<Value>> = self.get_json(&url).await?;
        let candles = parse_klines(&rows)?;
        if candles.is_empty() {
            return Err(FeedError::Empty("klines"));
        }

        debug!("Fetched {} {} candles for {}", candles.len(), self.interval, self.symbol);
        Ok(candles)
    }

    async fn order_book(&self, depth: usize) -> Result<OrderBook, FeedError> {
        let url = format!(
            "{}/api/v3/depth?symbol={}&limit={}",
            self.api_url,
            self.symbol,
            depth_limit(depth)
        );

        let response: DepthResponse = self.get_json(&url).await?;
        let book = parse_depth(&response, depth)?;
        if book.is_empty() {
            return Err(FeedError::Empty("depth"));
        }

        debug!(
            "Fetched orderbook {} for {}: {} bids, {} asks",
            response.last_update_id,
            self.symbol,
            book.bids.len(),
            book.asks.len()
        );
        Ok(book)
    }
}

/// Smallest accepted depth limit covering `depth`
pub fn depth_limit(depth: usize) -> usize {
    DEPTH_LIMITS
        .iter()
        .copied()
        .find(|&limit| limit >= depth)
        .unwrap_or(DEPTH_LIMITS[DEPTH_LIMITS.len() - 1])
}

fn number(value: &Value, field: &str) -> Result<f64, FeedError> {
    let parsed = match value {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| FeedError::Parse(format!("bad {} value: {}", field, value)))
}

/// Parse kline rows `[open_time, open, high, low, close, volume, ...]`
pub fn parse_klines(rows: &[Vec<Value>]) -> Result<Vec<Candle>, FeedError> {
    rows.iter()
        .map(|row| {
            if row.len() < 6 {
                return Err(FeedError::Parse(format!("kline row has {} fields", row.len())));
            }
            let open_time = row[0]
                .as_i64()
                .ok_or_else(|| FeedError::Parse(format!("bad open time: {}", row[0])))?;
            Ok(Candle {
                open_time,
                open: number(&row[1], "open")?,
                high: number(&row[2], "high")?,
                low: number(&row[3], "low")?,
                close: number(&row[4], "close")?,
                volume: number(&row[5], "volume")?,
            })
        })
        .collect()
}

fn parse_levels(levels: &[[String; 2]], depth: usize) -> Result<Vec<OrderBookLevel>, FeedError> {
    levels
        .iter()
        .take(depth)
        .map(|[price, quantity]| {
            let price = price
                .parse::<f64>()
                .map_err(|_| FeedError::Parse(format!("bad price: {}", price)))?;
            let quantity = quantity
                .parse::<f64>()
                .map_err(|_| FeedError::Parse(format!("bad quantity: {}", quantity)))?;
            Ok(OrderBookLevel { price, quantity })
        })
        .collect()
}

/// Typed top-`depth` levels of a depth response
pub fn parse_depth(response: &DepthResponse, depth: usize) -> Result<OrderBook, FeedError> {
    Ok(OrderBook {
        bids: parse_levels(&response.bids, depth)?,
        asks: parse_levels(&response.asks, depth)?,
    })
}
