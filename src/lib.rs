//! Trend Follow Bot Library
//!
//! This library provides all components for single-instrument trend
//! following: indicators, entry/exit signals, orderbook confirmation,
//! volatility-adaptive risk and the cycle orchestrator.

pub mod config;
pub mod state;
pub mod telemetry;
pub mod utils;
pub mod feeds;
pub mod engines;
pub mod execution;
pub mod agent;
pub mod position;

// Re-export main types
pub use config::AppConfig;
pub use state::SharedState;
pub use agent::{AdaptiveRiskManager, CycleOutcome, TradingAgent};
pub use engines::{validate_orderbook_pressure, IndicatorEngine, SignalEngine};
pub use execution::{Executor, PaperExecutor};
pub use feeds::{BinanceFeed, MarketDataSource};
pub use position::TradeJournal;
