//! Indicator Engine
//!
//! Turns a candle history into the per-cycle [`IndicatorSnapshot`]:
//! - EMA trend reference
//! - MACD line, signal and histogram
//! - RSI, ATR and ADX with Wilder smoothing
//! - Volume ratio against its moving average

use thiserror::Error;
use tracing::debug;

use crate::config::IndicatorConfig;
use crate::utils::types::{Candle, IndicatorSnapshot};

#[derive(Debug, Error, PartialEq)]
pub enum IndicatorError {
    #[error("insufficient candle history: need {required}, have {available}")]
    InsufficientData { required: usize, available: usize },
    #[error("indicator {0} is not finite")]
    NonFinite(&'static str),
}

/// Stateless indicator calculator
#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    config: IndicatorConfig,
}

impl IndicatorEngine {
    pub fn new(config: IndicatorConfig) -> Self {
        Self { config }
    }

    /// Compute the snapshot for the most recent candle
    pub fn calculate(&self, candles: &[Candle]) -> Result<IndicatorSnapshot, IndicatorError> {
        let required = self.config.min_candles();
        if candles.len() < required {
            return Err(IndicatorError::InsufficientData {
                required,
                available: candles.len(),
            });
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let cfg = &self.config;

        let ema_200 = last(&ema_series(&closes, cfg.ema_period));
        let (macd, macd_signal, macd_histogram) =
            macd(&closes, cfg.macd_fast, cfg.macd_slow, cfg.macd_signal);
        let rsi = rsi(&closes, cfg.rsi_period);
        let atr = atr(candles, cfg.atr_period);
        let adx = adx(candles, cfg.adx_period);
        let volume_ratio = volume_ratio(candles, cfg.volume_period);

        let snapshot = IndicatorSnapshot {
            ema_200,
            macd,
            macd_signal,
            macd_histogram,
            rsi,
            atr,
            volume_ratio,
            adx,
        };

        for (name, value) in [
            ("ema", ema_200),
            ("macd", macd),
            ("macd_signal", macd_signal),
            ("macd_histogram", macd_histogram),
            ("rsi", rsi),
            ("atr", atr),
            ("volume_ratio", volume_ratio),
            ("adx", adx),
        ] {
            if !value.is_finite() {
                return Err(IndicatorError::NonFinite(name));
            }
        }

        debug!(
            "Indicators: ema={:.2} hist={:.4} rsi={:.1} atr={:.4} vol={:.2}x adx={:.1}",
            ema_200, macd_histogram, rsi, atr, volume_ratio, adx
        );
        Ok(snapshot)
    }
}

fn last(values: &[f64]) -> f64 {
    values.last().copied().unwrap_or(f64::NAN)
}

/// EMA seeded with the first value, alpha = 2 / (period + 1)
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    smoothed_series(values, 2.0 / (period as f64 + 1.0))
}

/// Wilder smoothing seeded with the first value, alpha = 1 / period
fn wilder_series(values: &[f64], period: usize) -> Vec<f64> {
    smoothed_series(values, 1.0 / period as f64)
}

fn smoothed_series(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev = match values.first() {
        Some(v) => *v,
        None => return out,
    };
    out.push(prev);
    for v in &values[1..] {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// (line, signal, histogram) at the last close
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> (f64, f64, f64) {
    let fast_ema = ema_series(closes, fast);
    let slow_ema = ema_series(closes, slow);
    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = ema_series(&line, signal);

    let macd = last(&line);
    let sig = last(&signal_line);
    (macd, sig, macd - sig)
}

pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if closes.len() < 2 {
        return f64::NAN;
    }
    let (gains, losses): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let avg_gain = last(&wilder_series(&gains, period));
    let avg_loss = last(&wilder_series(&losses, period));
    let total = avg_gain + avg_loss;
    if total == 0.0 {
        // Flat market
        return 50.0;
    }
    100.0 * avg_gain / total
}

fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .windows(2)
        .map(|w| {
            let (prev, cur) = (&w[0], &w[1]);
            (cur.high - cur.low)
                .max((cur.high - prev.close).abs())
                .max((cur.low - prev.close).abs())
        })
        .collect()
}

/// Wilder ATR: mean of the first `period` true ranges, then recursive smoothing
pub fn atr(candles: &[Candle], period: usize) -> f64 {
    let tr = true_ranges(candles);
    if period == 0 || tr.len() < period {
        return f64::NAN;
    }
    let mut value = tr[..period].iter().sum::<f64>() / period as f64;
    for x in &tr[period..] {
        value = (value * (period as f64 - 1.0) + x) / period as f64;
    }
    value
}

pub fn adx(candles: &[Candle], period: usize) -> f64 {
    let tr = true_ranges(candles);
    if period == 0 || tr.len() < 2 * period {
        return f64::NAN;
    }

    let (plus_dm, minus_dm): (Vec<f64>, Vec<f64>) = candles
        .windows(2)
        .map(|w| {
            let up = w[1].high - w[0].high;
            let down = w[0].low - w[1].low;
            let plus = if up > down && up > 0.0 { up } else { 0.0 };
            let minus = if down > up && down > 0.0 { down } else { 0.0 };
            (plus, minus)
        })
        .unzip();

    let n = period as f64;
    let mut s_tr: f64 = tr[..period].iter().sum();
    let mut s_plus: f64 = plus_dm[..period].iter().sum();
    let mut s_minus: f64 = minus_dm[..period].iter().sum();

    let dx = |s_tr: f64, s_plus: f64, s_minus: f64| -> f64 {
        if s_tr <= 0.0 {
            return 0.0;
        }
        let plus_di = 100.0 * s_plus / s_tr;
        let minus_di = 100.0 * s_minus / s_tr;
        let sum = plus_di + minus_di;
        if sum > 0.0 {
            100.0 * (plus_di - minus_di).abs() / sum
        } else {
            0.0
        }
    };

    let mut dx_values = vec![dx(s_tr, s_plus, s_minus)];
    for i in period..tr.len() {
        s_tr = s_tr - s_tr / n + tr[i];
        s_plus = s_plus - s_plus / n + plus_dm[i];
        s_minus = s_minus - s_minus / n + minus_dm[i];
        dx_values.push(dx(s_tr, s_plus, s_minus));
    }

    let mut value = dx_values[..period].iter().sum::<f64>() / n;
    for x in &dx_values[period..] {
        value = (value * (n - 1.0) + x) / n;
    }
    value
}

/// Last volume over the mean of the last `period` volumes
pub fn volume_ratio(candles: &[Candle], period: usize) -> f64 {
    if period == 0 || candles.len() < period {
        return f64::NAN;
    }
    let window = &candles[candles.len() - period..];
    let mean = window.iter().map(|c| c.volume).sum::<f64>() / period as f64;
    if mean <= 0.0 {
        return 0.0;
    }
    window[period - 1].volume / mean
}
