//! Adaptive Risk Manager
//!
//! Converts volatility into trade risk:
//! - Fixed-fraction position sizing against an ATR stop
//! - Long and short bracket levels
//! - Minimum notional floor
//! - ADX-adaptive trailing stop that only ever tightens

use tracing::{debug, info, warn};

use crate::config::RiskConfig;
use crate::utils::helpers::{ceil_dp, round_dp, safe_div};
use crate::utils::types::{IndicatorSnapshot, Position, PositionSide, RiskParameters};

/// ADX level at which the trailing distance equals the base stop distance
const NEUTRAL_ADX: f64 = 25.0;

/// Risk manager
#[derive(Debug, Clone, Default)]
pub struct AdaptiveRiskManager {
    config: RiskConfig,
}

impl AdaptiveRiskManager {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Size a position so that a stop-out loses `risk_per_trade` of `balance`.
    ///
    /// Invalid input returns the all-zero parameter set.
    pub fn size_position(&self, balance: f64, price: f64, atr: f64) -> RiskParameters {
        let cfg = &self.config;

        if !(balance.is_finite() && price.is_finite() && atr.is_finite())
            || balance <= 0.0
            || price <= 0.0
            || atr < 0.0
        {
            warn!(
                "Invalid sizing input (balance={}, price={}, atr={}), not trading",
                balance, price, atr
            );
            return RiskParameters::default();
        }

        let risk_amount = balance * cfg.risk_per_trade;
        let stop_distance = cfg.atr_stop_multiplier * atr;
        let target_distance = cfg.atr_target_multiplier * atr;

        if stop_distance <= 0.0 || !stop_distance.is_finite() {
            warn!("Zero stop distance (atr={}), not trading", atr);
            return RiskParameters::default();
        }

        let mut quantity = round_dp(risk_amount / stop_distance, cfg.quantity_precision);

        if quantity * price < cfg.min_notional {
            // Round up so the floor survives rounding
            quantity = ceil_dp(cfg.min_notional / price, cfg.quantity_precision);
            let step = 10f64.powi(-(cfg.quantity_precision as i32));
            if quantity * price < cfg.min_notional {
                quantity += step;
            }
            warn!(
                "Position size adjusted to {} to meet minimum notional {}",
                quantity, cfg.min_notional
            );
        }

        let dp = cfg.price_precision;
        let params = RiskParameters {
            quantity,
            risk_amount,
            stop_distance,
            target_distance,
            stop_loss_long: round_dp(price - stop_distance, dp),
            stop_loss_short: round_dp(price + stop_distance, dp),
            take_profit_long: round_dp(price + target_distance, dp),
            take_profit_short: round_dp(price - target_distance, dp),
            risk_reward_ratio: target_distance / stop_distance,
        };

        if !params.quantity.is_finite() {
            return RiskParameters::default();
        }

        info!(
            "Position size calculated: {}, Risk: ${:.2}, R:R {:.2}",
            params.quantity, params.risk_amount, params.risk_reward_ratio
        );
        params
    }

    /// Distance the stop trails behind price; wider in strong trends
    pub fn trailing_distance(&self, atr: f64, adx: f64) -> f64 {
        let adx_multiplier = 1.0 + (adx - NEUTRAL_ADX) / 100.0;
        self.config.atr_stop_multiplier * atr * adx_multiplier
    }

    /// New stop for `position` at `price`.
    ///
    /// Returns the current stop unless the trailed level is strictly tighter:
    /// higher for longs, lower for shorts. With `trail_from_breakeven` the
    /// stop also has to reach the entry price before it starts to trail.
    pub fn update_trailing_stop(
        &self,
        position: &Position,
        price: f64,
        indicators: &IndicatorSnapshot,
    ) -> f64 {
        let current_stop = position.stop_loss;

        if !(price.is_finite() && indicators.atr.is_finite() && indicators.adx.is_finite())
            || price <= 0.0
            || indicators.atr < 0.0
        {
            debug!("Invalid trailing input (price={}), keeping stop", price);
            return current_stop;
        }

        let distance = self.trailing_distance(indicators.atr, indicators.adx);
        if !distance.is_finite() || distance <= 0.0 {
            return current_stop;
        }

        let dp = self.config.price_precision;
        let breakeven = self.config.trail_from_breakeven;

        let new_stop = match position.side {
            PositionSide::Long => {
                let candidate = round_dp(price - distance, dp);
                let armed = !breakeven || candidate >= position.entry_price;
                (armed && candidate > current_stop).then_some(candidate)
            }
            PositionSide::Short => {
                let candidate = round_dp(price + distance, dp);
                let armed = !breakeven || candidate <= position.entry_price;
                (armed && candidate < current_stop).then_some(candidate)
            }
        };

        match new_stop {
            Some(stop) => {
                info!(
                    "Trailing stop updated ({}): {:.8} -> {:.8}",
                    position.side, current_stop, stop
                );
                stop
            }
            None => current_stop,
        }
    }

    /// Copy of `position` with its trailing stop applied
    pub fn apply_trailing_stop(
        &self,
        position: &Position,
        price: f64,
        indicators: &IndicatorSnapshot,
    ) -> Position {
        position.with_stop_loss(self.update_trailing_stop(position, price, indicators))
    }

    /// Reward over risk for explicit levels; zero when risk is zero
    pub fn risk_reward_ratio(&self, entry_price: f64, stop_loss: f64, take_profit: f64) -> f64 {
        let risk = (entry_price - stop_loss).abs();
        let reward = (take_profit - entry_price).abs();
        safe_div(reward, risk)
    }

    /// Whether sized parameters are worth trading
    pub fn validate(&self, params: &RiskParameters) -> bool {
        for (name, value) in [
            ("quantity", params.quantity),
            ("risk_amount", params.risk_amount),
            ("stop_distance", params.stop_distance),
            ("target_distance", params.target_distance),
        ] {
            if !(value > 0.0) {
                warn!("Invalid risk parameter: {} = {}", name, value);
                return false;
            }
        }

        if params.risk_reward_ratio < self.config.min_risk_reward_ratio {
            warn!(
                "Low risk-reward ratio: {:.2} < {:.2}",
                params.risk_reward_ratio, self.config.min_risk_reward_ratio
            );
            return false;
        }
        true
    }

    /// Largest quantity allowed by `max_position_pct`, if configured
    pub fn max_position_size(&self, balance: f64, price: f64) -> Option<f64> {
        let pct = self.config.max_position_pct?;
        if balance <= 0.0 || price <= 0.0 {
            return Some(0.0);
        }
        Some(round_dp(balance * pct / price, self.config.quantity_precision))
    }
}
