//! Orderbook pressure check
//!
//! Pre-trade confirmation gate: a BUY needs more resting bid volume than ask
//! volume across the top levels, a SELL the reverse. It can veto a signal but
//! never produce one.

use tracing::info;

use crate::utils::types::{OrderBook, OrderBookLevel, TradeAction};

/// Summed quantities over the top levels of each side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookPressure {
    pub bid_volume: f64,
    pub ask_volume: f64,
}

impl BookPressure {
    pub fn from_book(orderbook: &OrderBook, levels: usize) -> Self {
        Self {
            bid_volume: side_volume(&orderbook.bids, levels),
            ask_volume: side_volume(&orderbook.asks, levels),
        }
    }

    /// Bid volume as a fraction of total resting volume
    pub fn imbalance(&self) -> f64 {
        let total = self.bid_volume + self.ask_volume;
        if total > 0.0 { self.bid_volume / total } else { 0.5 }
    }
}

fn side_volume(levels: &[OrderBookLevel], count: usize) -> f64 {
    levels.iter().take(count).map(|l| l.quantity).sum()
}

/// Whether resting liquidity supports `action`.
///
/// Ties and non-directional actions never validate. A missing side sums to
/// zero, so an asks-only book confirms a SELL and a bids-only book a BUY.
pub fn validate_orderbook_pressure(orderbook: &OrderBook, action: TradeAction, levels: usize) -> bool {
    if orderbook.is_empty() || levels == 0 {
        return false;
    }

    let pressure = BookPressure::from_book(orderbook, levels);
    if !pressure.bid_volume.is_finite() || !pressure.ask_volume.is_finite() {
        return false;
    }

    let valid = match action {
        TradeAction::Buy => pressure.bid_volume > pressure.ask_volume,
        TradeAction::Sell => pressure.ask_volume > pressure.bid_volume,
        TradeAction::None => false,
    };

    info!(
        "{} pressure check: Bids={:.2}, Asks={:.2}, Valid={}",
        action, pressure.bid_volume, pressure.ask_volume, valid
    );
    valid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(pairs: &[(f64, f64)]) -> Vec<OrderBookLevel> {
        pairs
            .iter()
            .map(|&(price, quantity)| OrderBookLevel { price, quantity })
            .collect()
    }

    fn bid_heavy() -> OrderBook {
        OrderBook {
            bids: levels(&[(50000.0, 1.0), (49950.0, 0.5), (49900.0, 0.3)]),
            asks: levels(&[(50050.0, 0.5), (50100.0, 0.3), (50150.0, 0.2)]),
        }
    }

    #[test]
    fn test_bid_pressure_confirms_buy_only() {
        let book = bid_heavy();
        assert!(validate_orderbook_pressure(&book, TradeAction::Buy, 5));
        assert!(!validate_orderbook_pressure(&book, TradeAction::Sell, 5));
    }

    #[test]
    fn test_ask_pressure_confirms_sell_only() {
        let book = OrderBook {
            bids: bid_heavy().asks,
            asks: bid_heavy().bids,
        };
        assert!(validate_orderbook_pressure(&book, TradeAction::Sell, 5));
        assert!(!validate_orderbook_pressure(&book, TradeAction::Buy, 5));
    }

    #[test]
    fn test_equal_volume_validates_neither() {
        let book = OrderBook {
            bids: levels(&[(100.0, 1.0), (99.0, 1.0)]),
            asks: levels(&[(101.0, 1.5), (102.0, 0.5)]),
        };
        assert!(!validate_orderbook_pressure(&book, TradeAction::Buy, 5));
        assert!(!validate_orderbook_pressure(&book, TradeAction::Sell, 5));
    }

    #[test]
    fn test_only_top_levels_count() {
        let book = OrderBook {
            bids: levels(&[(100.0, 1.0), (99.0, 10.0)]),
            asks: levels(&[(101.0, 2.0), (102.0, 0.1)]),
        };
        assert!(!validate_orderbook_pressure(&book, TradeAction::Buy, 1));
        assert!(validate_orderbook_pressure(&book, TradeAction::Buy, 2));
    }

    #[test]
    fn test_empty_book_and_none_action() {
        assert!(!validate_orderbook_pressure(&OrderBook::default(), TradeAction::Buy, 5));
        assert!(!validate_orderbook_pressure(&bid_heavy(), TradeAction::None, 5));
    }

    #[test]
    fn test_one_sided_book_counts_missing_side_as_zero() {
        let asks_only = OrderBook {
            bids: Vec::new(),
            asks: levels(&[(101.0, 0.4)]),
        };
        assert!(validate_orderbook_pressure(&asks_only, TradeAction::Sell, 5));
        assert!(!validate_orderbook_pressure(&asks_only, TradeAction::Buy, 5));

        let bids_only = OrderBook {
            bids: levels(&[(99.0, 0.4)]),
            asks: Vec::new(),
        };
        assert!(validate_orderbook_pressure(&bids_only, TradeAction::Buy, 5));
        assert!(!validate_orderbook_pressure(&bids_only, TradeAction::Sell, 5));
    }

    #[test]
    fn test_imbalance() {
        let pressure = BookPressure::from_book(&bid_heavy(), 5);
        assert!((pressure.bid_volume - 1.8).abs() < 1e-12);
        assert!((pressure.ask_volume - 1.0).abs() < 1e-12);
        assert!((pressure.imbalance() - 1.8 / 2.8).abs() < 1e-12);
    }
}
