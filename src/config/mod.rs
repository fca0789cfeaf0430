//! Configuration module
//!
//! Handles loading and validation of the application configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub trading: TradingConfig,
    #[serde(default)]
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub journal: JournalConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::from_yaml_str(&content)?;
        info!("Configuration loaded from {:?}", path);
        Ok(config)
    }

    /// Parse, apply environment overrides and validate
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(content)
            .with_context(|| "Failed to parse config file")?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(symbol) = std::env::var("TRADING_SYMBOL") {
            if !symbol.is_empty() {
                self.trading.symbol = symbol;
            }
        }

        if let Ok(value) = std::env::var("RISK_PER_TRADE") {
            match value.parse::<f64>() {
                Ok(risk) => self.risk.risk_per_trade = risk,
                Err(_) => warn!("Invalid RISK_PER_TRADE environment variable: {}", value),
            }
        }

        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.telemetry.telegram.bot_token = Some(token);
        }
        if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID") {
            self.telemetry.telegram.chat_id = Some(chat_id);
        }
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.trading.symbol.is_empty(), "trading.symbol must be set");
        anyhow::ensure!(
            self.trading.check_interval_secs > 0,
            "check_interval_secs must be positive"
        );
        anyhow::ensure!(
            self.risk.risk_per_trade > 0.0 && self.risk.risk_per_trade <= 0.1,
            "risk_per_trade must be between 0 and 0.1 (10%)"
        );
        anyhow::ensure!(
            self.risk.min_risk_reward_ratio >= 1.0,
            "min_risk_reward_ratio must be >= 1"
        );
        anyhow::ensure!(
            self.risk.atr_stop_multiplier > 0.0 && self.risk.atr_target_multiplier > 0.0,
            "ATR multipliers must be positive"
        );
        anyhow::ensure!(self.risk.min_notional >= 0.0, "min_notional must not be negative");
        if let Some(pct) = self.risk.max_position_pct {
            anyhow::ensure!(pct > 0.0 && pct <= 1.0, "max_position_pct must be between 0 and 1");
        }

        let ind = &self.indicators;
        for (name, period) in [
            ("ema_period", ind.ema_period),
            ("macd_fast", ind.macd_fast),
            ("macd_slow", ind.macd_slow),
            ("macd_signal", ind.macd_signal),
            ("rsi_period", ind.rsi_period),
            ("atr_period", ind.atr_period),
            ("adx_period", ind.adx_period),
            ("volume_period", ind.volume_period),
        ] {
            anyhow::ensure!(period > 0, "Invalid indicator parameter: {}", name);
        }
        anyhow::ensure!(ind.macd_fast < ind.macd_slow, "macd_fast must be below macd_slow");
        anyhow::ensure!(
            self.trading.candle_limit >= ind.min_candles(),
            "candle_limit {} is too small, indicators need at least {}",
            self.trading.candle_limit,
            ind.min_candles()
        );

        anyhow::ensure!(
            self.strategy.volume_multiplier >= 0.0,
            "volume_multiplier must not be negative"
        );
        anyhow::ensure!(
            self.strategy.rsi_oversold < self.strategy.rsi_overbought,
            "rsi_oversold must be below rsi_overbought"
        );
        anyhow::ensure!(self.execution.orderbook_levels > 0, "orderbook_levels must be positive");
        anyhow::ensure!(
            self.execution.paper_balance > 0.0,
            "paper_balance must be positive"
        );
        Ok(())
    }

    /// Create a default config for testing
    pub fn default_for_test() -> Self {
        Self {
            trading: TradingConfig {
                symbol: "BTCUSDT".to_string(),
                interval: default_interval(),
                candle_limit: default_candle_limit(),
                check_interval_secs: default_check_interval(),
            },
            indicators: IndicatorConfig::default(),
            strategy: StrategyConfig::default(),
            risk: RiskConfig::default(),
            execution: ExecutionConfig::default(),
            telemetry: TelemetryConfig {
                log_level: "info".to_string(),
                json_logs: false,
                log_dir: None,
                log_file: default_log_file(),
                metrics_port: default_metrics_port(),
                enable_metrics: false,
                enable_alerts: false,
                alert_webhook: None,
                telegram: TelegramConfig::default(),
            },
            journal: JournalConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    pub symbol: String,
    /// Kline interval, e.g. "5m"
    #[serde(default = "default_interval")]
    pub interval: String,
    /// Candles fetched per cycle
    #[serde(default = "default_candle_limit")]
    pub candle_limit: usize,
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
}

fn default_interval() -> String { "5m".to_string() }
fn default_candle_limit() -> usize { 500 }
fn default_check_interval() -> u64 { 60 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    #[serde(default = "default_ema_period")]
    pub ema_period: usize,
    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,
    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,
    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,
    #[serde(default = "default_indicator_period")]
    pub rsi_period: usize,
    #[serde(default = "default_indicator_period")]
    pub atr_period: usize,
    #[serde(default = "default_indicator_period")]
    pub adx_period: usize,
    #[serde(default = "default_volume_period")]
    pub volume_period: usize,
}

fn default_ema_period() -> usize { 200 }
fn default_macd_fast() -> usize { 12 }
fn default_macd_slow() -> usize { 26 }
fn default_macd_signal() -> usize { 9 }
fn default_indicator_period() -> usize { 14 }
fn default_volume_period() -> usize { 20 }

impl IndicatorConfig {
    /// Fewest candles for which every indicator is defined
    pub fn min_candles(&self) -> usize {
        [
            self.ema_period,
            self.macd_slow + self.macd_signal,
            self.rsi_period + 1,
            self.atr_period + 1,
            2 * self.adx_period + 1,
            self.volume_period,
        ]
        .into_iter()
        .max()
        .unwrap_or(1)
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ema_period: default_ema_period(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            rsi_period: default_indicator_period(),
            atr_period: default_indicator_period(),
            adx_period: default_indicator_period(),
            volume_period: default_volume_period(),
        }
    }
}

/// Entry and exit thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Minimum volume ratio for volume confirmation (strictly greater)
    #[serde(default = "default_volume_multiplier")]
    pub volume_multiplier: f64,
    #[serde(default = "default_min_adx_for_trend")]
    pub min_adx_for_trend: f64,
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: f64,
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,
    /// ADX below which any open position is exited
    #[serde(default = "default_weak_trend_adx")]
    pub weak_trend_adx: f64,
}

fn default_volume_multiplier() -> f64 { 1.5 }
fn default_min_adx_for_trend() -> f64 { 25.0 }
fn default_rsi_overbought() -> f64 { 70.0 }
fn default_rsi_oversold() -> f64 { 30.0 }
fn default_weak_trend_adx() -> f64 { 20.0 }

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            volume_multiplier: default_volume_multiplier(),
            min_adx_for_trend: default_min_adx_for_trend(),
            rsi_overbought: default_rsi_overbought(),
            rsi_oversold: default_rsi_oversold(),
            weak_trend_adx: default_weak_trend_adx(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    #[serde(default = "default_atr_stop_multiplier")]
    pub atr_stop_multiplier: f64,
    #[serde(default = "default_atr_target_multiplier")]
    pub atr_target_multiplier: f64,
    /// Fraction of balance risked per trade
    #[serde(default = "default_risk_per_trade")]
    pub risk_per_trade: f64,
    /// Smallest order value accepted by the exchange
    #[serde(default = "default_min_notional")]
    pub min_notional: f64,
    #[serde(default = "default_quantity_precision")]
    pub quantity_precision: u32,
    #[serde(default = "default_price_precision")]
    pub price_precision: u32,
    #[serde(default = "default_min_risk_reward")]
    pub min_risk_reward_ratio: f64,
    /// Optional cap on position value as a fraction of balance
    #[serde(default)]
    pub max_position_pct: Option<f64>,
    #[serde(default = "default_true")]
    pub trailing_stop_enabled: bool,
    /// Only trail once the new stop would sit at or beyond entry.
    ///
    /// Defaults to `true`, which keeps a long's 49000 stop at 50200 and 50500
    /// (entry 50000, ATR 500, ADX 30). Set `false` for the plain ratchet,
    /// `price - 1.5 * ATR * (1 + (ADX - 25) / 100)`, which trails from the
    /// first bar: 49412.5 at 50200, 49712.5 at 50500.
    #[serde(default = "default_true")]
    pub trail_from_breakeven: bool,
}

fn default_atr_stop_multiplier() -> f64 { 1.5 }
fn default_atr_target_multiplier() -> f64 { 3.0 }
fn default_risk_per_trade() -> f64 { 0.01 }
fn default_min_notional() -> f64 { 10.0 }
fn default_quantity_precision() -> u32 { 6 }
fn default_price_precision() -> u32 { 8 }
fn default_min_risk_reward() -> f64 { 1.5 }
fn default_true() -> bool { true }

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            atr_stop_multiplier: default_atr_stop_multiplier(),
            atr_target_multiplier: default_atr_target_multiplier(),
            risk_per_trade: default_risk_per_trade(),
            min_notional: default_min_notional(),
            quantity_precision: default_quantity_precision(),
            price_precision: default_price_precision(),
            min_risk_reward_ratio: default_min_risk_reward(),
            max_position_pct: None,
            trailing_stop_enabled: true,
            trail_from_breakeven: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Top-N levels summed by the orderbook pressure check
    #[serde(default = "default_orderbook_levels")]
    pub orderbook_levels: usize,
    /// Delay before every exchange request
    #[serde(default = "default_rate_limit_delay")]
    pub rate_limit_delay_ms: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_paper_balance")]
    pub paper_balance: f64,
    /// Adverse slippage applied to paper fills
    #[serde(default)]
    pub paper_slippage_bps: f64,
    #[serde(default = "default_true")]
    pub close_on_shutdown: bool,
}

fn default_api_url() -> String { "https://api.binance.com".to_string() }
fn default_orderbook_levels() -> usize { 5 }
fn default_rate_limit_delay() -> u64 { 100 }
fn default_request_timeout() -> u64 { 10000 }
fn default_max_retries() -> u32 { 3 }
fn default_retry_delay() -> u64 { 500 }
fn default_paper_balance() -> f64 { 10000.0 }

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            orderbook_levels: default_orderbook_levels(),
            rate_limit_delay_ms: default_rate_limit_delay(),
            request_timeout_ms: default_request_timeout(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
            paper_balance: default_paper_balance(),
            paper_slippage_bps: 0.0,
            close_on_shutdown: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
    /// Directory for daily-rolling log files; console only when unset
    pub log_dir: Option<String>,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
    #[serde(default)]
    pub enable_metrics: bool,
    #[serde(default)]
    pub enable_alerts: bool,
    pub alert_webhook: Option<String>,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

fn default_log_file() -> String { "trading_bot.log".to_string() }
fn default_metrics_port() -> u16 { 9090 }

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub enabled: bool,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalConfig {
    /// JSON trade history file; in-memory only when unset
    pub path: Option<String>,
}
