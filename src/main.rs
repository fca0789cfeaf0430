//! Trend Follow Bot
//!
//! A single-instrument trend-following trading bot that:
//! - Pulls candles and depth from Binance every cycle
//! - Enters on five-way trend, momentum and volume confirmation
//! - Sizes positions from ATR against a fixed account risk
//! - Trails stops adaptively to trend strength

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use trend_follow_bot::agent::{CycleOutcome, TradingAgent};
use trend_follow_bot::config::AppConfig;
use trend_follow_bot::execution::PaperExecutor;
use trend_follow_bot::feeds::BinanceFeed;
use trend_follow_bot::position::TradeJournal;
use trend_follow_bot::state::SharedState;
use trend_follow_bot::telemetry::{init_logging, init_metrics, AlertManager};

/// Trend Follow Bot - EMA/MACD/RSI/ADX trend following with adaptive risk
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override the traded symbol
    #[arg(long)]
    symbol: Option<String>,

    /// Override log level
    #[arg(long)]
    log_level: Option<String>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(symbol) = args.symbol {
        config.trading.symbol = symbol.to_uppercase();
    }
    if let Some(level) = args.log_level {
        config.telemetry.log_level = level;
    }
    config.validate()?;

    let _log_guard = init_logging(&config.telemetry)?;

    info!("Starting Trend Follow Bot v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Symbol: {} | Interval: {} | Risk per trade: {:.2}%",
        config.trading.symbol,
        config.trading.interval,
        config.risk.risk_per_trade * 100.0
    );

    if config.telemetry.enable_metrics {
        init_metrics(config.telemetry.metrics_port)?;
    }

    let state = Arc::new(SharedState::new());
    let feed = BinanceFeed::new(&config.trading, &config.execution)?;
    let executor = PaperExecutor::new(
        state.clone(),
        config.execution.paper_balance,
        config.execution.paper_slippage_bps,
    );
    let journal = TradeJournal::from_config(config.journal.path.as_deref()).await?;
    let alerts = AlertManager::new(&config.telemetry);

    let config = Arc::new(config);
    let mut agent = TradingAgent::new(config, state, feed, executor, journal, alerts);

    if args.once {
        let outcome = agent.run_cycle().await?;
        info!("Single cycle complete: {:?}", outcome);
        if let CycleOutcome::Opened(position) = outcome {
            info!("Leaving paper position {} open on exit", position.id);
        }
        return Ok(());
    }

    agent.run().await?;

    info!("Trend Follow Bot stopped");
    Ok(())
}
