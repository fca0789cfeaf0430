//! Agent Module
//!
//! Provides the trading loop:
//! - One decision cycle per tick over fresh candles
//! - Entry path: signal, orderbook confirmation, sizing, execution
//! - Manage path: bracket reconciliation, trailing stop, exit evaluation, close
//! - Journal, metrics and alerts around every fill

pub mod risk_manager;

pub use risk_manager::AdaptiveRiskManager;

use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::engines::{validate_orderbook_pressure, IndicatorEngine, SignalEngine};
use crate::execution::{CloseReport, Executor, PositionStatus};
use crate::feeds::MarketDataSource;
use crate::position::{ClosedTrade, TradeJournal};
use crate::state::SharedState;
use crate::telemetry::{metrics, Alert, AlertManager};
use crate::utils::helpers::elapsed_us;
use crate::utils::types::{IndicatorSnapshot, Position, TradeAction, TrendStrength};

/// Close reason when a fill lands outside its own bracket
pub const FILL_OUTSIDE_BRACKET: &str = "Fill outside bracket";

/// What a single cycle did
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Market data or indicators unavailable, nothing evaluated
    NoData,
    /// Flat and no directional entry signal
    NoSignal,
    /// Signal vetoed by resting liquidity
    OrderbookRejected(TradeAction),
    /// Sizing produced nothing worth trading
    RiskRejected,
    Opened(Position),
    /// Order failed; position state unchanged
    ExecutionFailed(String),
    /// Position kept, stop unchanged
    Held,
    /// Position kept, stop tightened to the new level
    StopUpdated(f64),
    Closed { pnl: f64, reason: String },
}

/// Trading agent for a single instrument
pub struct TradingAgent<M, E> {
    config: Arc<AppConfig>,
    state: Arc<SharedState>,
    feed: M,
    executor: E,
    indicators: IndicatorEngine,
    signals: SignalEngine,
    risk: AdaptiveRiskManager,
    journal: TradeJournal,
    alerts: AlertManager,
    /// Open position, if any
    position: Option<Position>,
}

impl<M: MarketDataSource, E: Executor> TradingAgent<M, E> {
    pub fn new(
        config: Arc<AppConfig>,
        state: Arc<SharedState>,
        feed: M,
        executor: E,
        journal: TradeJournal,
        alerts: AlertManager,
    ) -> Self {
        Self {
            indicators: IndicatorEngine::new(config.indicators.clone()),
            signals: SignalEngine::new(config.strategy.clone()),
            risk: AdaptiveRiskManager::new(config.risk.clone()),
            config,
            state,
            feed,
            executor,
            journal,
            alerts,
            position: None,
        }
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn journal(&self) -> &TradeJournal {
        &self.journal
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    /// Run one decision cycle
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let start = Instant::now();
        let cycle = self.state.increment_cycle_count();

        let outcome = match self.market_snapshot().await {
            Some((price, snapshot)) => match self.position.clone() {
                Some(position) => match self.reconcile(&position).await? {
                    Some(outcome) => outcome,
                    None => self.manage_position(position, price, &snapshot).await?,
                },
                None => self.evaluate_entry(price, &snapshot).await?,
            },
            None => CycleOutcome::NoData,
        };

        let latency_us = elapsed_us(start);
        metrics::record_cycle_latency(latency_us as f64 / 1000.0);
        metrics::record_position(self.position.as_ref().map(|p| p.stop_loss));
        debug!("Cycle {} finished in {}us: {:?}", cycle, latency_us, outcome);
        Ok(outcome)
    }

    /// Latest close and its indicator snapshot
    async fn market_snapshot(&self) -> Option<(f64, IndicatorSnapshot)> {
        let candles = match self.feed.candles(self.config.trading.candle_limit).await {
            Ok(candles) => candles,
            Err(e) => {
                warn!("Failed to fetch market data: {}", e);
                self.record_error();
                return None;
            }
        };

        let price = candles.last()?.close;
        self.state.update_price(price);
        metrics::record_price(price);

        match self.indicators.calculate(&candles) {
            Ok(snapshot) => {
                debug!(
                    "Price {:.8}, trend strength {} (ADX {:.1})",
                    price,
                    TrendStrength::from_adx(snapshot.adx),
                    snapshot.adx
                );
                metrics::record_indicators(&snapshot);
                Some((price, snapshot))
            }
            Err(e) => {
                warn!("Failed to calculate indicators: {}", e);
                None
            }
        }
    }

    async fn evaluate_entry(&mut self, price: f64, snapshot: &IndicatorSnapshot) -> Result<CycleOutcome> {
        let signal = self.signals.evaluate_entry(price, snapshot);
        metrics::record_signal(signal.action, signal.confidence);

        let Some(side) = signal.action.side() else {
            return Ok(CycleOutcome::NoSignal);
        };

        let levels = self.config.execution.orderbook_levels;
        let orderbook = match self.feed.order_book(levels).await {
            Ok(book) => book,
            Err(e) => {
                warn!("Failed to fetch orderbook: {}", e);
                self.record_error();
                return Ok(CycleOutcome::NoData);
            }
        };

        if !validate_orderbook_pressure(&orderbook, signal.action, levels) {
            info!("Orderbook pressure does not support {} signal", signal.action);
            metrics::record_orderbook_rejection();
            return Ok(CycleOutcome::OrderbookRejected(signal.action));
        }

        let balance = match self.executor.account_balance().await {
            Ok(balance) => balance,
            Err(e) => {
                warn!("Failed to fetch account balance: {}", e);
                self.record_error();
                return Ok(CycleOutcome::ExecutionFailed(e.to_string()));
            }
        };
        metrics::record_balance(balance);

        let params = self.risk.size_position(balance, price, snapshot.atr);
        if !self.risk.validate(&params) {
            warn!("Risk parameters validation failed");
            return Ok(CycleOutcome::RiskRejected);
        }

        let mut quantity = params.quantity;
        if let Some(max_quantity) = self.risk.max_position_size(balance, price) {
            if quantity > max_quantity {
                warn!("Position size {} capped to {}", quantity, max_quantity);
                quantity = max_quantity;
            }
        }
        if quantity <= 0.0 || quantity * price < self.config.risk.min_notional {
            warn!("Capped position {} is below minimum notional", quantity);
            return Ok(CycleOutcome::RiskRejected);
        }

        match self.executor.execute(signal.action, quantity, &params).await {
            Ok(report) => {
                let position = Position::open(
                    report.order_id,
                    side,
                    report.quantity,
                    report.fill_price,
                    &params,
                )
                .with_confidence(signal.confidence);

                info!(
                    "Trade executed: {} {} at {:.8}, SL {:.8}, TP {:.8}",
                    signal.action, position.quantity, position.entry_price,
                    position.stop_loss, position.take_profit
                );
                metrics::record_trade_opened();
                self.state.increment_trade_count();
                self.alerts
                    .notify(Alert::trade_opened(&self.config.trading.symbol, &position));

                self.position = Some(position.clone());

                // Bracket is sized from the signal price, not the fill
                if !position.has_valid_bracket() {
                    error!(
                        "Fill {:.8} is outside bracket SL {:.8} / TP {:.8}, flattening",
                        position.entry_price, position.stop_loss, position.take_profit
                    );
                    return self.close_position(FILL_OUTSIDE_BRACKET).await;
                }
                Ok(CycleOutcome::Opened(position))
            }
            Err(e) => {
                error!("Failed to execute {} order: {}", signal.action, e);
                metrics::record_trade_failure();
                self.record_error();
                Ok(CycleOutcome::ExecutionFailed(e.to_string()))
            }
        }
    }

    /// Pick up a bracket fill at the venue since the last cycle
    async fn reconcile(&mut self, position: &Position) -> Result<Option<CycleOutcome>> {
        match self.executor.position_status(position).await {
            Ok(PositionStatus::Open) => Ok(None),
            Ok(PositionStatus::Closed(report)) => {
                info!("Position {} closed by its bracket: {}", position.id, report.reason);
                self.position = None;
                self.record_close(position, report).await.map(Some)
            }
            Err(e) => {
                warn!("Failed to query position status: {}", e);
                self.record_error();
                Ok(None)
            }
        }
    }

    async fn manage_position(
        &mut self,
        mut position: Position,
        price: f64,
        snapshot: &IndicatorSnapshot,
    ) -> Result<CycleOutcome> {
        let mut stop_updated = false;

        if self.config.risk.trailing_stop_enabled {
            let new_stop = self.risk.update_trailing_stop(&position, price, snapshot);
            if new_stop != position.stop_loss {
                match self.executor.update_stop(&position, new_stop).await {
                    Ok(()) => {
                        position = position.with_stop_loss(new_stop);
                        self.position = Some(position.clone());
                        metrics::record_stop_update();
                        stop_updated = true;
                    }
                    Err(e) => {
                        warn!("Failed to update stop loss: {}", e);
                        self.record_error();
                    }
                }
            }
        }

        self.state.unrealized_pnl.store(position.unrealized_pnl(price));

        let exit = self.signals.evaluate_exit(price, snapshot, &position);
        if exit.should_exit {
            return self.close_position(&exit.reason).await;
        }

        Ok(if stop_updated {
            CycleOutcome::StopUpdated(position.stop_loss)
        } else {
            CycleOutcome::Held
        })
    }

    /// Close the open position, if any, and journal it
    pub async fn close_position(&mut self, reason: &str) -> Result<CycleOutcome> {
        let Some(position) = self.position.take() else {
            return Ok(CycleOutcome::Held);
        };

        let report = match self.executor.close(&position, reason).await {
            Ok(report) => report,
            Err(e) => {
                error!("Failed to close position {}: {}", position.id, e);
                metrics::record_trade_failure();
                self.record_error();
                self.position = Some(position);
                return Ok(CycleOutcome::ExecutionFailed(e.to_string()));
            }
        };

        info!("Position closed: {}, PnL: {:.2}", reason, report.pnl);
        self.record_close(&position, report).await
    }

    /// Book a completed exit and journal it
    async fn record_close(&mut self, position: &Position, report: CloseReport) -> Result<CycleOutcome> {
        self.state.record_realized_pnl(report.pnl);
        metrics::record_trade_closed(self.state.realized_pnl.load());

        let trade = ClosedTrade::from_close(position, &report);
        self.alerts
            .notify(Alert::trade_closed(&self.config.trading.symbol, &trade));
        self.journal.record(trade).await?;

        Ok(CycleOutcome::Closed {
            pnl: report.pnl,
            reason: report.reason,
        })
    }

    /// Run cycles until `shutdown` resolves
    pub async fn run_until<F: Future<Output = ()>>(&mut self, shutdown: F) -> Result<()> {
        let symbol = self.config.trading.symbol.clone();
        info!(
            "Trading agent starting on {} ({}), cycle every {}s",
            symbol, self.config.trading.interval, self.config.trading.check_interval_secs
        );
        self.alerts
            .notify(Alert::info("🤖 Trading bot started", format!("Trading {}", symbol)));

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.trading.check_interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        error!("Error in trading cycle: {:#}", e);
                        self.record_error();
                        self.alerts.notify(Alert::error("Trading cycle error", e.to_string()));
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.shutdown().await
    }

    /// Run until Ctrl-C
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
    }

    async fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down trading agent");

        if self.config.execution.close_on_shutdown && self.position.is_some() {
            self.close_position("Bot shutdown").await?;
        }

        let summary = self.journal.summary().await;
        info!(
            "Session summary: {} trades, win rate {:.1}%, P&L ${:.2}, max drawdown ${:.2}",
            summary.total_trades, summary.win_rate, summary.total_pnl, summary.max_drawdown
        );

        self.alerts.send(Alert::performance(&summary)).await;
        self.alerts
            .send(Alert::info("🛑 Trading bot stopped", self.config.trading.symbol.clone()))
            .await;
        Ok(())
    }

    fn record_error(&self) {
        self.state.increment_error_count();
        metrics::record_error();
    }
}
