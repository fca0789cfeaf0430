//! Calculation Engines Module
//!
//! Pure per-cycle calculations:
//! - Indicator snapshot from candle history
//! - Entry and exit signal evaluation
//! - Orderbook pressure confirmation

pub mod indicator_engine;
pub mod orderbook;
pub mod signal_engine;

pub use indicator_engine::{IndicatorEngine, IndicatorError};
pub use orderbook::{validate_orderbook_pressure, BookPressure};
pub use signal_engine::SignalEngine;
