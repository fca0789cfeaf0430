//! Paper Executor
//!
//! Simulated fills against the last price recorded in [`SharedState`]:
//! - Adverse slippage in basis points on every market fill
//! - Resting bracket per open order id: a stop-market and a take-profit limit
//! - Paper quote balance credited with realized PnL on close

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::{realized_pnl, CloseReport, ExecutionError, ExecutionReport, Executor, PositionStatus};
use crate::state::SharedState;
use crate::utils::helpers::{current_timestamp_millis, generate_id, round_dp};
use crate::utils::types::{Position, PositionSide, RiskParameters, TradeAction};

pub const STOP_LOSS_REASON: &str = "Stop loss hit";
pub const TAKE_PROFIT_REASON: &str = "Take profit hit";

/// Exit orders resting behind an open paper position
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bracket {
    side: PositionSide,
    stop_loss: f64,
    take_profit: f64,
}

/// Which leg of a bracket the market reached
#[derive(Debug, Clone, Copy, PartialEq)]
enum BracketLeg {
    StopLoss,
    TakeProfit,
}

impl Bracket {
    /// Stop is checked first so a bar through both levels books the loss
    fn triggered(&self, price: f64) -> Option<BracketLeg> {
        let (stopped, target_hit) = match self.side {
            PositionSide::Long => (price <= self.stop_loss, price >= self.take_profit),
            PositionSide::Short => (price >= self.stop_loss, price <= self.take_profit),
        };
        if stopped {
            Some(BracketLeg::StopLoss)
        } else if target_hit {
            Some(BracketLeg::TakeProfit)
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
struct PaperAccount {
    balance: f64,
    /// Order id -> resting bracket
    brackets: HashMap<String, Bracket>,
}

/// In-memory executor for dry runs and tests
pub struct PaperExecutor {
    state: Arc<SharedState>,
    slippage_bps: f64,
    account: Mutex<PaperAccount>,
}

impl PaperExecutor {
    pub fn new(state: Arc<SharedState>, starting_balance: f64, slippage_bps: f64) -> Self {
        info!(
            "Paper executor ready: balance ${:.2}, slippage {} bps",
            starting_balance, slippage_bps
        );
        Self {
            state,
            slippage_bps: slippage_bps.max(0.0),
            account: Mutex::new(PaperAccount {
                balance: starting_balance,
                brackets: HashMap::new(),
            }),
        }
    }

    /// Resting stop of an open paper order
    pub fn resting_stop(&self, order_id: &str) -> Option<f64> {
        self.account.lock().brackets.get(order_id).map(|b| b.stop_loss)
    }

    /// Resting take-profit of an open paper order
    pub fn resting_target(&self, order_id: &str) -> Option<f64> {
        self.account.lock().brackets.get(order_id).map(|b| b.take_profit)
    }

    pub fn open_orders(&self) -> usize {
        self.account.lock().brackets.len()
    }

    fn market_price(&self) -> Result<f64, ExecutionError> {
        let price = self.state.last_price();
        if price.is_finite() && price > 0.0 {
            Ok(price)
        } else {
            Err(ExecutionError::NoMarketPrice)
        }
    }

    /// Price after slippage; buys fill higher, sells lower
    fn fill_price(&self, price: f64, buying: bool) -> f64 {
        let slip = self.slippage_bps / 10_000.0;
        let raw = if buying { price * (1.0 + slip) } else { price * (1.0 - slip) };
        round_dp(raw, 8)
    }

    /// Book the exit of `position` at `exit_price` against the balance
    fn settle(
        &self,
        account: &mut PaperAccount,
        position: &Position,
        exit_price: f64,
        reason: &str,
    ) -> CloseReport {
        let pnl = realized_pnl(position, exit_price);
        account.balance += pnl;

        info!(
            "[PAPER] Position closed: {}, exit {:.8}, PnL: {:.2}, balance ${:.2}",
            reason, exit_price, pnl, account.balance
        );

        CloseReport {
            exit_price,
            pnl,
            reason: reason.to_string(),
            timestamp: current_timestamp_millis(),
        }
    }
}

#[async_trait]
impl Executor for PaperExecutor {
    async fn execute(
        &self,
        action: TradeAction,
        quantity: f64,
        risk: &RiskParameters,
    ) -> Result<ExecutionReport, ExecutionError> {
        let side = action.side().ok_or(ExecutionError::NoDirection(action))?;
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(ExecutionError::InvalidQuantity(quantity));
        }

        let price = self.market_price()?;
        let fill_price = self.fill_price(price, side == PositionSide::Long);
        let (stop_loss, take_profit) = risk.bracket_for(side);

        let order_id = generate_id();
        self.account.lock().brackets.insert(
            order_id.clone(),
            Bracket {
                side,
                stop_loss,
                take_profit,
            },
        );

        info!(
            "[PAPER] {} {} at {:.8} (SL {:.8}, TP {:.8})",
            action, quantity, fill_price, stop_loss, take_profit
        );

        Ok(ExecutionReport {
            order_id,
            fill_price,
            quantity,
            timestamp: current_timestamp_millis(),
        })
    }

    async fn close(&self, position: &Position, reason: &str) -> Result<CloseReport, ExecutionError> {
        let price = self.market_price()?;

        let mut account = self.account.lock();
        if account.brackets.remove(&position.id).is_none() {
            return Err(ExecutionError::UnknownPosition(position.id.clone()));
        }

        // Closing a long sells, closing a short buys back
        let exit_price = self.fill_price(price, position.side == PositionSide::Short);
        Ok(self.settle(&mut account, position, exit_price, reason))
    }

    async fn update_stop(&self, position: &Position, new_stop: f64) -> Result<(), ExecutionError> {
        if !new_stop.is_finite() || new_stop <= 0.0 {
            return Err(ExecutionError::Rejected(format!("invalid stop price {}", new_stop)));
        }

        let mut account = self.account.lock();
        match account.brackets.get_mut(&position.id) {
            Some(bracket) => {
                debug!(
                    "[PAPER] Stop {} moved {:.8} -> {:.8}",
                    position.id, bracket.stop_loss, new_stop
                );
                bracket.stop_loss = new_stop;
                Ok(())
            }
            None => Err(ExecutionError::UnknownPosition(position.id.clone())),
        }
    }

    async fn position_status(&self, position: &Position) -> Result<PositionStatus, ExecutionError> {
        let price = self.market_price()?;

        let mut account = self.account.lock();
        let bracket = *account
            .brackets
            .get(&position.id)
            .ok_or_else(|| ExecutionError::UnknownPosition(position.id.clone()))?;

        let Some(leg) = bracket.triggered(price) else {
            return Ok(PositionStatus::Open);
        };
        account.brackets.remove(&position.id);

        // The stop is a market order and slips; the target is a limit at its level
        let closing_buy = position.side == PositionSide::Short;
        let (exit_price, reason) = match leg {
            BracketLeg::StopLoss => (self.fill_price(price, closing_buy), STOP_LOSS_REASON),
            BracketLeg::TakeProfit => (bracket.take_profit, TAKE_PROFIT_REASON),
        };

        Ok(PositionStatus::Closed(self.settle(&mut account, position, exit_price, reason)))
    }

    async fn account_balance(&self) -> Result<f64, ExecutionError> {
        Ok(self.account.lock().balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn risk() -> RiskParameters {
        RiskParameters {
            quantity: 0.1,
            risk_amount: 100.0,
            stop_distance: 1000.0,
            target_distance: 2000.0,
            stop_loss_long: 49000.0,
            stop_loss_short: 51000.0,
            take_profit_long: 52000.0,
            take_profit_short: 48000.0,
            risk_reward_ratio: 2.0,
        }
    }

    fn executor(slippage_bps: f64) -> (Arc<SharedState>, PaperExecutor) {
        let state = Arc::new(SharedState::new());
        state.update_price(50000.0);
        let exec = PaperExecutor::new(state.clone(), 10000.0, slippage_bps);
        (state, exec)
    }

    #[tokio::test]
    async fn test_long_round_trip() {
        let (state, exec) = executor(0.0);
        let report = exec.execute(TradeAction::Buy, 0.1, &risk()).await.unwrap();
        assert_eq!(report.fill_price, 50000.0);
        assert_eq!(exec.resting_stop(&report.order_id), Some(49000.0));
        assert_eq!(exec.resting_target(&report.order_id), Some(52000.0));

        let position = Position::open(report.order_id, PositionSide::Long, 0.1, report.fill_price, &risk());
        state.update_price(51000.0);
        let close = exec.close(&position, "Trend reversal (bearish)").await.unwrap();

        assert_eq!(close.exit_price, 51000.0);
        assert_eq!(close.pnl, 100.0);
        assert_eq!(exec.account_balance().await.unwrap(), 10100.0);
        assert_eq!(exec.open_orders(), 0);
    }

    #[tokio::test]
    async fn test_short_loss_and_slippage() {
        let (state, exec) = executor(10.0);
        let report = exec.execute(TradeAction::Sell, 0.1, &risk()).await.unwrap();
        // 50000 * (1 - 0.001)
        assert_eq!(report.fill_price, 49950.0);

        let position = Position::open(report.order_id, PositionSide::Short, 0.1, report.fill_price, &risk());
        state.update_price(50000.0);
        let close = exec.close(&position, "Weak trend").await.unwrap();
        assert_eq!(close.exit_price, 50050.0);
        assert_eq!(close.pnl, -10.0);
        assert_eq!(exec.account_balance().await.unwrap(), 9990.0);
    }

    #[tokio::test]
    async fn test_rejects_bad_orders() {
        let (_, exec) = executor(0.0);
        assert_eq!(
            exec.execute(TradeAction::None, 0.1, &risk()).await,
            Err(ExecutionError::NoDirection(TradeAction::None))
        );
        assert_eq!(
            exec.execute(TradeAction::Buy, 0.0, &risk()).await,
            Err(ExecutionError::InvalidQuantity(0.0))
        );
    }

    #[tokio::test]
    async fn test_no_market_price() {
        let exec = PaperExecutor::new(Arc::new(SharedState::new()), 1000.0, 0.0);
        assert_eq!(
            exec.execute(TradeAction::Buy, 0.1, &risk()).await,
            Err(ExecutionError::NoMarketPrice)
        );
    }

    #[tokio::test]
    async fn test_update_stop() {
        let (_, exec) = executor(0.0);
        let report = exec.execute(TradeAction::Buy, 0.1, &risk()).await.unwrap();
        let position = Position::open(report.order_id.clone(), PositionSide::Long, 0.1, 50000.0, &risk());

        exec.update_stop(&position, 49500.0).await.unwrap();
        assert_eq!(exec.resting_stop(&report.order_id), Some(49500.0));

        let stranger = Position { id: "nope".to_string(), ..position };
        assert_eq!(
            exec.update_stop(&stranger, 49600.0).await,
            Err(ExecutionError::UnknownPosition("nope".to_string()))
        );
    }

    #[tokio::test]
    async fn test_long_stop_fills_at_market() {
        let (state, exec) = executor(10.0);
        state.update_price(50000.0);
        let report = exec.execute(TradeAction::Buy, 0.1, &risk()).await.unwrap();
        let position = Position::open(report.order_id.clone(), PositionSide::Long, 0.1, 50000.0, &risk());

        state.update_price(49500.0);
        assert_eq!(exec.position_status(&position).await.unwrap(), PositionStatus::Open);

        // Gapped through the 49000 stop; the market sell slips below the print
        state.update_price(48000.0);
        let PositionStatus::Closed(close) = exec.position_status(&position).await.unwrap() else {
            panic!("stop should have triggered");
        };
        assert_eq!(close.reason, STOP_LOSS_REASON);
        assert_eq!(close.exit_price, 47952.0);
        assert_eq!(close.pnl, -204.8);
        assert_eq!(exec.open_orders(), 0);
        assert_eq!(
            exec.position_status(&position).await,
            Err(ExecutionError::UnknownPosition(report.order_id))
        );
    }

    #[tokio::test]
    async fn test_long_take_profit_fills_at_limit() {
        let (state, exec) = executor(10.0);
        let report = exec.execute(TradeAction::Buy, 0.1, &risk()).await.unwrap();
        let position = Position::open(report.order_id, PositionSide::Long, 0.1, 50000.0, &risk());

        state.update_price(52500.0);
        let PositionStatus::Closed(close) = exec.position_status(&position).await.unwrap() else {
            panic!("target should have triggered");
        };
        assert_eq!(close.reason, TAKE_PROFIT_REASON);
        assert_eq!(close.exit_price, 52000.0);
        assert_eq!(close.pnl, 200.0);
        assert_eq!(exec.account_balance().await.unwrap(), 10200.0);
    }

    #[tokio::test]
    async fn test_short_bracket_mirrors_long() {
        let (state, exec) = executor(0.0);
        let report = exec.execute(TradeAction::Sell, 0.1, &risk()).await.unwrap();
        let position = Position::open(report.order_id.clone(), PositionSide::Short, 0.1, 50000.0, &risk());

        state.update_price(50900.0);
        assert_eq!(exec.position_status(&position).await.unwrap(), PositionStatus::Open);

        state.update_price(51000.0);
        let PositionStatus::Closed(close) = exec.position_status(&position).await.unwrap() else {
            panic!("short stop should have triggered");
        };
        assert_eq!(close.reason, STOP_LOSS_REASON);
        assert_eq!(close.pnl, -100.0);

        let report = exec.execute(TradeAction::Sell, 0.1, &risk()).await.unwrap();
        let position = Position::open(report.order_id, PositionSide::Short, 0.1, 51000.0, &risk());
        state.update_price(47000.0);
        let PositionStatus::Closed(close) = exec.position_status(&position).await.unwrap() else {
            panic!("short target should have triggered");
        };
        assert_eq!(close.reason, TAKE_PROFIT_REASON);
        assert_eq!(close.exit_price, 48000.0);
        assert_eq!(close.pnl, 300.0);
    }

    #[tokio::test]
    async fn test_trailed_stop_is_the_one_worked() {
        let (state, exec) = executor(0.0);
        let report = exec.execute(TradeAction::Buy, 0.1, &risk()).await.unwrap();
        let position = Position::open(report.order_id, PositionSide::Long, 0.1, 50000.0, &risk());
        exec.update_stop(&position, 50500.0).await.unwrap();

        state.update_price(50400.0);
        let PositionStatus::Closed(close) = exec.position_status(&position).await.unwrap() else {
            panic!("trailed stop should have triggered");
        };
        assert_eq!(close.reason, STOP_LOSS_REASON);
        assert_eq!(close.pnl, 40.0);
    }
}
