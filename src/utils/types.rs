//! Common types used throughout the application

use serde::{Deserialize, Serialize};
use std::fmt;

/// OHLCV candle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Indicator values for a single decision cycle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub ema_200: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    /// 0-100
    pub rsi: f64,
    /// Average true range in price units
    pub atr: f64,
    /// Current volume divided by its moving average
    pub volume_ratio: f64,
    /// 0-100, trend strength regardless of direction
    pub adx: f64,
}

impl IndicatorSnapshot {
    pub fn is_finite(&self) -> bool {
        [
            self.ema_200,
            self.macd,
            self.macd_signal,
            self.macd_histogram,
            self.rsi,
            self.atr,
            self.volume_ratio,
            self.adx,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Trend strength bucket derived from ADX
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendStrength {
    Weak,
    Moderate,
    Strong,
}

impl TrendStrength {
    pub fn from_adx(adx: f64) -> Self {
        if adx < 25.0 {
            TrendStrength::Weak
        } else if adx < 50.0 {
            TrendStrength::Moderate
        } else {
            TrendStrength::Strong
        }
    }
}

impl fmt::Display for TrendStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendStrength::Weak => write!(f, "WEAK"),
            TrendStrength::Moderate => write!(f, "MODERATE"),
            TrendStrength::Strong => write!(f, "STRONG"),
        }
    }
}

/// Directional decision produced by the entry evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
    None,
}

impl TradeAction {
    /// Side of the position this action would open
    pub fn side(&self) -> Option<PositionSide> {
        match self {
            TradeAction::Buy => Some(PositionSide::Long),
            TradeAction::Sell => Some(PositionSide::Short),
            TradeAction::None => None,
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
            TradeAction::None => write!(f, "NONE"),
        }
    }
}

/// Position side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Long,
    Short,
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

/// An open position.
///
/// Held by the orchestrator as an explicit value; the only mutation after
/// creation is a trailing stop update through [`Position::with_stop_loss`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub side: PositionSide,
    pub quantity: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub opened_at: i64,
    #[serde(default)]
    pub entry_confidence: f64,
}

impl Position {
    /// Open a position from a fill, taking the bracket for `side` out of `risk`.
    pub fn open(
        id: impl Into<String>,
        side: PositionSide,
        quantity: f64,
        entry_price: f64,
        risk: &RiskParameters,
    ) -> Self {
        let (stop_loss, take_profit) = risk.bracket_for(side);
        Self {
            id: id.into(),
            side,
            quantity,
            entry_price,
            stop_loss,
            take_profit,
            opened_at: chrono::Utc::now().timestamp_millis(),
            entry_confidence: 0.0,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.entry_confidence = confidence;
        self
    }

    /// Copy of this position with a new stop
    pub fn with_stop_loss(&self, stop_loss: f64) -> Self {
        Self {
            stop_loss,
            ..self.clone()
        }
    }

    /// Stop below entry below target for longs, mirrored for shorts
    pub fn has_valid_bracket(&self) -> bool {
        match self.side {
            PositionSide::Long => {
                self.stop_loss < self.entry_price && self.entry_price < self.take_profit
            }
            PositionSide::Short => {
                self.take_profit < self.entry_price && self.entry_price < self.stop_loss
            }
        }
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match self.side {
            PositionSide::Long => (price - self.entry_price) * self.quantity,
            PositionSide::Short => (self.entry_price - price) * self.quantity,
        }
    }
}

/// Per-side result of the five entry conditions
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionSet {
    /// All conditions held
    pub valid: bool,
    /// Fraction of conditions that held
    pub confidence: f64,
    pub reasons: Vec<String>,
}

/// Entry decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySignal {
    pub action: TradeAction,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub bullish: ConditionSet,
    pub bearish: ConditionSet,
}

impl EntrySignal {
    pub fn none() -> Self {
        Self {
            action: TradeAction::None,
            confidence: 0.0,
            reasons: Vec::new(),
            bullish: ConditionSet::default(),
            bearish: ConditionSet::default(),
        }
    }
}

/// Which exit rule fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitKind {
    TrendReversal,
    WeakTrend,
}

/// Exit decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitSignal {
    pub should_exit: bool,
    pub reason: String,
    pub kind: Option<ExitKind>,
}

impl ExitSignal {
    pub fn hold() -> Self {
        Self {
            should_exit: false,
            reason: "No exit signal".to_string(),
            kind: None,
        }
    }

    pub fn exit(kind: ExitKind, reason: impl Into<String>) -> Self {
        Self {
            should_exit: true,
            reason: reason.into(),
            kind: Some(kind),
        }
    }
}

/// Sizing and bracket levels for a prospective trade.
///
/// The all-zero value means "do not trade".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskParameters {
    pub quantity: f64,
    pub risk_amount: f64,
    pub stop_distance: f64,
    pub target_distance: f64,
    pub stop_loss_long: f64,
    pub stop_loss_short: f64,
    pub take_profit_long: f64,
    pub take_profit_short: f64,
    pub risk_reward_ratio: f64,
}

impl RiskParameters {
    /// (stop_loss, take_profit) for the given side
    pub fn bracket_for(&self, side: PositionSide) -> (f64, f64) {
        match side {
            PositionSide::Long => (self.stop_loss_long, self.take_profit_long),
            PositionSide::Short => (self.stop_loss_short, self.take_profit_short),
        }
    }
}

/// One price level of an order book
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    pub price: f64,
    pub quantity: f64,
}

/// Bids best-first and asks best-first
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderBook {
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
}

impl OrderBook {
    /// No resting levels on either side
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
