//! Prometheus metrics export

use anyhow::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

use crate::utils::types::{IndicatorSnapshot, TradeAction};

pub fn init_metrics(port: u16) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    register_metrics();
    info!("Prometheus metrics server started on {}", addr);
    Ok(())
}

fn register_metrics() {
    // Market
    describe_gauge!("trend_bot_price", "Last traded price of the instrument");
    describe_gauge!("trend_bot_ema", "Trend EMA");
    describe_gauge!("trend_bot_macd_histogram", "MACD histogram");
    describe_gauge!("trend_bot_rsi", "RSI");
    describe_gauge!("trend_bot_atr", "ATR");
    describe_gauge!("trend_bot_adx", "ADX");
    describe_gauge!("trend_bot_volume_ratio", "Last volume over its moving average");

    // Signals
    describe_gauge!("trend_bot_signal_confidence", "Confidence of the last entry evaluation");
    describe_counter!("trend_bot_signals_total", "Directional entry signals by action");
    describe_counter!("trend_bot_orderbook_rejections_total", "Signals vetoed by orderbook pressure");

    // Position
    describe_gauge!("trend_bot_position_open", "1 while a position is open");
    describe_gauge!("trend_bot_stop_loss", "Current stop of the open position");
    describe_counter!("trend_bot_stop_updates_total", "Trailing stop adjustments");

    // Trades and P&L
    describe_counter!("trend_bot_trades_opened_total", "Positions opened");
    describe_counter!("trend_bot_trades_closed_total", "Positions closed");
    describe_counter!("trend_bot_trades_failed_total", "Orders that failed to execute");
    describe_gauge!("trend_bot_realized_pnl", "Cumulative realized P&L in quote currency");
    describe_gauge!("trend_bot_balance", "Account balance in quote currency");

    // System
    describe_histogram!("trend_bot_cycle_latency_ms", "Duration of one trading cycle");
    describe_counter!("trend_bot_errors_total", "Total number of errors");
}

pub fn record_price(price: f64) {
    gauge!("trend_bot_price").set(price);
}

pub fn record_indicators(snapshot: &IndicatorSnapshot) {
    gauge!("trend_bot_ema").set(snapshot.ema_200);
    gauge!("trend_bot_macd_histogram").set(snapshot.macd_histogram);
    gauge!("trend_bot_rsi").set(snapshot.rsi);
    gauge!("trend_bot_atr").set(snapshot.atr);
    gauge!("trend_bot_adx").set(snapshot.adx);
    gauge!("trend_bot_volume_ratio").set(snapshot.volume_ratio);
}

pub fn record_signal(action: TradeAction, confidence: f64) {
    gauge!("trend_bot_signal_confidence").set(confidence);
    if action != TradeAction::None {
        counter!("trend_bot_signals_total", "action" => action.to_string()).increment(1);
    }
}

pub fn record_orderbook_rejection() {
    counter!("trend_bot_orderbook_rejections_total").increment(1);
}

pub fn record_position(stop_loss: Option<f64>) {
    gauge!("trend_bot_position_open").set(if stop_loss.is_some() { 1.0 } else { 0.0 });
    gauge!("trend_bot_stop_loss").set(stop_loss.unwrap_or(0.0));
}

pub fn record_stop_update() {
    counter!("trend_bot_stop_updates_total").increment(1);
}

pub fn record_trade_opened() {
    counter!("trend_bot_trades_opened_total").increment(1);
}

pub fn record_trade_closed(realized_pnl: f64) {
    counter!("trend_bot_trades_closed_total").increment(1);
    gauge!("trend_bot_realized_pnl").set(realized_pnl);
}

pub fn record_trade_failure() {
    counter!("trend_bot_trades_failed_total").increment(1);
}

pub fn record_balance(balance: f64) {
    gauge!("trend_bot_balance").set(balance);
}

pub fn record_cycle_latency(latency_ms: f64) {
    histogram!("trend_bot_cycle_latency_ms").record(latency_ms);
}

pub fn record_error() {
    counter!("trend_bot_errors_total").increment(1);
}
