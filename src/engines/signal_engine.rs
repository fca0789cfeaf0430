//! Signal Generation Engine
//!
//! Combines trend, momentum, overextension, volume and trend-strength checks
//! into entry decisions, and watches open positions for strategy exits:
//! - Entry: all five conditions of one side must hold to act
//! - Exit: trend reversal against the position, or a weak trend
//!
//! Stop-loss and take-profit price triggers are left to the bracket orders.

use tracing::{debug, info};

use crate::config::StrategyConfig;
use crate::utils::types::{
    ConditionSet, EntrySignal, ExitKind, ExitSignal, IndicatorSnapshot, Position, PositionSide,
    TradeAction,
};

/// Pure entry/exit evaluator
#[derive(Debug, Clone, Default)]
pub struct SignalEngine {
    config: StrategyConfig,
}

impl SignalEngine {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Evaluate both sides and pick a direction.
    ///
    /// `confidence` is the acting side's score; with no action it is the
    /// better of the two partial scores. `reasons` lists the acting side's
    /// conditions, or both sides (bullish first) when no side is valid.
    pub fn evaluate_entry(&self, price: f64, indicators: &IndicatorSnapshot) -> EntrySignal {
        if !price.is_finite() || price <= 0.0 || !indicators.is_finite() {
            debug!("Skipping entry evaluation on invalid input (price={})", price);
            return EntrySignal::none();
        }

        let bullish = self.check_bullish_conditions(price, indicators);
        let bearish = self.check_bearish_conditions(price, indicators);

        let (action, confidence, reasons) = if bullish.valid {
            (TradeAction::Buy, bullish.confidence, bullish.reasons.clone())
        } else if bearish.valid {
            (TradeAction::Sell, bearish.confidence, bearish.reasons.clone())
        } else {
            let reasons = bullish
                .reasons
                .iter()
                .chain(bearish.reasons.iter())
                .cloned()
                .collect();
            (TradeAction::None, bullish.confidence.max(bearish.confidence), reasons)
        };

        info!(
            "Entry signal: {} (confidence: {:.2}, bull {:.2} / bear {:.2})",
            action, confidence, bullish.confidence, bearish.confidence
        );

        EntrySignal {
            action,
            confidence,
            reasons,
            bullish,
            bearish,
        }
    }

    fn check_bullish_conditions(&self, price: f64, ind: &IndicatorSnapshot) -> ConditionSet {
        let cfg = &self.config;
        let mut set = Conditions::default();

        set.check(
            price > ind.ema_200,
            "Price above EMA 200 (bullish trend)".to_string(),
            "Price below EMA 200 (not bullish trend)".to_string(),
        );
        set.check(
            ind.macd_histogram > 0.0,
            "MACD histogram positive (bullish momentum)".to_string(),
            "MACD histogram not positive (not bullish momentum)".to_string(),
        );
        set.check(
            ind.rsi < cfg.rsi_overbought,
            format!("RSI {:.1} not overbought", ind.rsi),
            format!("RSI {:.1} overbought", ind.rsi),
        );
        self.check_shared(&mut set, ind);
        set.finish()
    }

    fn check_bearish_conditions(&self, price: f64, ind: &IndicatorSnapshot) -> ConditionSet {
        let cfg = &self.config;
        let mut set = Conditions::default();

        set.check(
            price < ind.ema_200,
            "Price below EMA 200 (bearish trend)".to_string(),
            "Price above EMA 200 (not bearish trend)".to_string(),
        );
        set.check(
            ind.macd_histogram < 0.0,
            "MACD histogram negative (bearish momentum)".to_string(),
            "MACD histogram not negative (not bearish momentum)".to_string(),
        );
        set.check(
            ind.rsi > cfg.rsi_oversold,
            format!("RSI {:.1} not oversold", ind.rsi),
            format!("RSI {:.1} oversold", ind.rsi),
        );
        self.check_shared(&mut set, ind);
        set.finish()
    }

    /// Volume and trend strength apply to both directions
    fn check_shared(&self, set: &mut Conditions, ind: &IndicatorSnapshot) {
        let cfg = &self.config;
        set.check(
            ind.volume_ratio > cfg.volume_multiplier,
            format!("Volume {:.1}x above average", ind.volume_ratio),
            format!("Volume {:.1}x below threshold", ind.volume_ratio),
        );
        set.check(
            ind.adx >= cfg.min_adx_for_trend,
            format!("ADX {:.1} shows strong trend", ind.adx),
            format!("ADX {:.1} shows weak trend", ind.adx),
        );
    }

    /// Strategy exit for an open position.
    ///
    /// The weak-trend check runs after the reversal check and fires for any
    /// side, including positions that are currently in profit.
    pub fn evaluate_exit(
        &self,
        price: f64,
        indicators: &IndicatorSnapshot,
        position: &Position,
    ) -> ExitSignal {
        if !price.is_finite() || price <= 0.0 || !indicators.is_finite() {
            return ExitSignal::hold();
        }
        let cfg = &self.config;

        match position.side {
            PositionSide::Long => {
                if price < indicators.ema_200
                    && indicators.macd_histogram < 0.0
                    && indicators.rsi > cfg.rsi_overbought
                {
                    return ExitSignal::exit(ExitKind::TrendReversal, "Trend reversal (bearish)");
                }
            }
            PositionSide::Short => {
                if price > indicators.ema_200
                    && indicators.macd_histogram > 0.0
                    && indicators.rsi < cfg.rsi_oversold
                {
                    return ExitSignal::exit(ExitKind::TrendReversal, "Trend reversal (bullish)");
                }
            }
        }

        if indicators.adx < cfg.weak_trend_adx {
            return ExitSignal::exit(
                ExitKind::WeakTrend,
                format!("Weak trend (ADX {:.1} < {})", indicators.adx, cfg.weak_trend_adx),
            );
        }

        ExitSignal::hold()
    }
}

#[derive(Default)]
struct Conditions {
    passed: usize,
    total: usize,
    reasons: Vec<String>,
}

impl Conditions {
    fn check(&mut self, holds: bool, pass: String, fail: String) {
        self.total += 1;
        if holds {
            self.passed += 1;
            self.reasons.push(pass);
        } else {
            self.reasons.push(fail);
        }
    }

    fn finish(self) -> ConditionSet {
        ConditionSet {
            valid: self.total > 0 && self.passed == self.total,
            confidence: self.passed as f64 / self.total.max(1) as f64,
            reasons: self.reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::types::RiskParameters;

    const PRICE: f64 = 51000.0;

    fn bullish() -> IndicatorSnapshot {
        IndicatorSnapshot {
            ema_200: 48000.0,
            macd: 120.0,
            macd_signal: 119.5,
            macd_histogram: 0.5,
            rsi: 65.0,
            atr: 500.0,
            volume_ratio: 2.0,
            adx: 30.0,
        }
    }

    fn bearish() -> IndicatorSnapshot {
        IndicatorSnapshot {
            ema_200: 52000.0,
            macd_histogram: -0.5,
            rsi: 35.0,
            ..bullish()
        }
    }

    fn position(side: PositionSide) -> Position {
        let risk = RiskParameters {
            quantity: 0.1,
            stop_loss_long: 49000.0,
            take_profit_long: 53000.0,
            stop_loss_short: 51000.0,
            take_profit_short: 47000.0,
            ..RiskParameters::default()
        };
        Position::open("test", side, 0.1, 50000.0, &risk)
    }

    #[test]
    fn test_bullish_entry_signal() {
        let signal = SignalEngine::default().evaluate_entry(PRICE, &bullish());
        assert_eq!(signal.action, TradeAction::Buy);
        assert_eq!(signal.confidence, 1.0);
        assert!(signal.bullish.valid);
        assert_eq!(signal.reasons.len(), 5);
    }

    #[test]
    fn test_bearish_entry_signal() {
        let signal = SignalEngine::default().evaluate_entry(PRICE, &bearish());
        assert_eq!(signal.action, TradeAction::Sell);
        assert_eq!(signal.confidence, 1.0);
        assert!(signal.bearish.valid);
        assert!(!signal.bullish.valid);
    }

    #[test]
    fn test_no_signal_mixed_conditions() {
        let mixed = IndicatorSnapshot { macd_histogram: -0.5, ..bullish() };
        let signal = SignalEngine::default().evaluate_entry(PRICE, &mixed);
        assert_eq!(signal.action, TradeAction::None);
        assert!(signal.confidence < 1.0);
        assert_eq!(signal.bullish.confidence, 0.8);
        assert_eq!(signal.reasons.len(), 10);
    }

    #[test]
    fn test_no_signal_low_volume() {
        let low_volume = IndicatorSnapshot { volume_ratio: 1.0, ..bullish() };
        let signal = SignalEngine::default().evaluate_entry(PRICE, &low_volume);
        assert_eq!(signal.action, TradeAction::None);
        assert_eq!(signal.bullish.confidence, 0.8);
        assert!(signal.reasons.iter().any(|r| r.contains("below threshold")));
    }

    #[test]
    fn test_volume_at_threshold_does_not_confirm() {
        let at_threshold = IndicatorSnapshot { volume_ratio: 1.5, ..bullish() };
        let signal = SignalEngine::default().evaluate_entry(PRICE, &at_threshold);
        assert_eq!(signal.action, TradeAction::None);
    }

    #[test]
    fn test_adx_at_threshold_confirms() {
        let at_threshold = IndicatorSnapshot { adx: 25.0, ..bullish() };
        let signal = SignalEngine::default().evaluate_entry(PRICE, &at_threshold);
        assert_eq!(signal.action, TradeAction::Buy);
    }

    #[test]
    fn test_no_signal_weak_trend() {
        let weak = IndicatorSnapshot { adx: 15.0, ..bullish() };
        let signal = SignalEngine::default().evaluate_entry(PRICE, &weak);
        assert_eq!(signal.action, TradeAction::None);
        assert!(signal.reasons.iter().any(|r| r.contains("weak trend")));
    }

    #[test]
    fn test_price_on_ema_fails_both_sides() {
        let on_ema = IndicatorSnapshot { ema_200: PRICE, ..bullish() };
        let signal = SignalEngine::default().evaluate_entry(PRICE, &on_ema);
        assert_eq!(signal.action, TradeAction::None);
        assert!(!signal.bullish.valid && !signal.bearish.valid);
    }

    #[test]
    fn test_invalid_price_yields_none() {
        let engine = SignalEngine::default();
        assert_eq!(engine.evaluate_entry(f64::NAN, &bullish()).action, TradeAction::None);
        assert_eq!(engine.evaluate_entry(0.0, &bullish()).action, TradeAction::None);
    }

    #[test]
    fn test_exit_long_on_reversal() {
        let reversal = IndicatorSnapshot {
            ema_200: 50000.0,
            macd_histogram: -1.0,
            rsi: 75.0,
            ..bullish()
        };
        let exit = SignalEngine::default().evaluate_exit(49500.0, &reversal, &position(PositionSide::Long));
        assert!(exit.should_exit);
        assert_eq!(exit.kind, Some(ExitKind::TrendReversal));
        assert!(exit.reason.contains("Trend reversal"));
    }

    #[test]
    fn test_exit_short_on_reversal() {
        let reversal = IndicatorSnapshot {
            ema_200: 50000.0,
            macd_histogram: 1.0,
            rsi: 25.0,
            ..bullish()
        };
        let exit = SignalEngine::default().evaluate_exit(50500.0, &reversal, &position(PositionSide::Short));
        assert!(exit.should_exit);
        assert_eq!(exit.kind, Some(ExitKind::TrendReversal));
    }

    #[test]
    fn test_exit_on_weak_trend_even_when_favorable() {
        let weak = IndicatorSnapshot { adx: 18.0, ..bullish() };
        let exit = SignalEngine::default().evaluate_exit(PRICE, &weak, &position(PositionSide::Long));
        assert!(exit.should_exit);
        assert_eq!(exit.kind, Some(ExitKind::WeakTrend));
        assert!(exit.reason.contains("Weak trend"));
    }

    #[test]
    fn test_hold_when_trend_intact() {
        let exit = SignalEngine::default().evaluate_exit(PRICE, &bullish(), &position(PositionSide::Long));
        assert!(!exit.should_exit);
        assert_eq!(exit.kind, None);
    }

    #[test]
    fn test_partial_reversal_holds() {
        // Below EMA with negative momentum but RSI not above 70
        let partial = IndicatorSnapshot {
            ema_200: 50000.0,
            macd_histogram: -1.0,
            rsi: 55.0,
            ..bullish()
        };
        let exit = SignalEngine::default().evaluate_exit(49500.0, &partial, &position(PositionSide::Long));
        assert!(!exit.should_exit);
    }
}
