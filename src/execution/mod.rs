//! Execution Module
//!
//! The order-routing seam used by the trading agent:
//! - [`Executor`] trait: open, close, move stop, query status and balance
//! - Typed execution failures
//! - Paper executor that fills against the last observed price and works
//!   the resting stop-loss / take-profit bracket

pub mod paper;

pub use paper::PaperExecutor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::types::{Position, RiskParameters, TradeAction};

/// Execution error types
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutionError {
    /// Action carries no direction
    #[error("cannot execute action {0}")]
    NoDirection(TradeAction),
    /// Quantity is zero, negative or not finite
    #[error("invalid order quantity {0}")]
    InvalidQuantity(f64),
    /// No usable market price to fill against
    #[error("no market price available")]
    NoMarketPrice,
    /// Position does not belong to this executor
    #[error("unknown position {0}")]
    UnknownPosition(String),
    /// Venue refused the order
    #[error("order rejected: {0}")]
    Rejected(String),
    /// Transport failure talking to the venue
    #[error("network error: {0}")]
    Network(String),
}

/// Fill of an opening order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub order_id: String,
    pub fill_price: f64,
    pub quantity: f64,
    pub timestamp: i64,
}

/// Fill of a closing order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseReport {
    pub exit_price: f64,
    /// Realized PnL, rounded to cents
    pub pnl: f64,
    pub reason: String,
    pub timestamp: i64,
}

/// Venue-side state of a tracked position
#[derive(Debug, Clone, PartialEq)]
pub enum PositionStatus {
    Open,
    /// Flattened at the venue by a resting stop-loss or take-profit order
    Closed(CloseReport),
}

/// Order routing capability
#[async_trait]
pub trait Executor: Send + Sync {
    /// Open a position with a market order
    async fn execute(
        &self,
        action: TradeAction,
        quantity: f64,
        risk: &RiskParameters,
    ) -> Result<ExecutionReport, ExecutionError>;

    /// Flatten `position` with a market order
    async fn close(&self, position: &Position, reason: &str) -> Result<CloseReport, ExecutionError>;

    /// Replace the resting stop of `position`
    async fn update_stop(&self, position: &Position, new_stop: f64) -> Result<(), ExecutionError>;

    /// Whether `position` is still open, or how its bracket closed it
    async fn position_status(&self, position: &Position) -> Result<PositionStatus, ExecutionError>;

    /// Free quote balance
    async fn account_balance(&self) -> Result<f64, ExecutionError>;
}

/// Realized PnL of closing `position` at `exit_price`
pub fn realized_pnl(position: &Position, exit_price: f64) -> f64 {
    crate::utils::helpers::round_dp(position.unrealized_pnl(exit_price), 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::types::PositionSide;

    fn position(side: PositionSide) -> Position {
        Position {
            id: "p".to_string(),
            side,
            quantity: 0.1,
            entry_price: 50000.0,
            stop_loss: 0.0,
            take_profit: 0.0,
            opened_at: 0,
            entry_confidence: 1.0,
        }
    }

    #[test]
    fn test_realized_pnl_by_side() {
        assert_eq!(realized_pnl(&position(PositionSide::Long), 51000.0), 100.0);
        assert_eq!(realized_pnl(&position(PositionSide::Short), 51000.0), -100.0);
        assert_eq!(realized_pnl(&position(PositionSide::Short), 49876.543), 12.35);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ExecutionError::NoDirection(TradeAction::None).to_string(),
            "cannot execute action NONE"
        );
        assert_eq!(ExecutionError::NoMarketPrice.to_string(), "no market price available");
    }
}
