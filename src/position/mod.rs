//! Trade Journal Module
//!
//! Keeps the history of closed trades:
//! - One record per closed position
//! - Performance summary (win rate, profit factor, drawdown)
//! - Optional JSON persistence between runs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::execution::CloseReport;
use crate::utils::types::{Position, PositionSide};

/// Closed trade record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub id: String,
    pub side: PositionSide,
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub pnl: f64,
    pub opened_at: i64,
    pub closed_at: i64,
    pub close_reason: String,
    #[serde(default)]
    pub entry_confidence: f64,
}

impl ClosedTrade {
    pub fn from_close(position: &Position, report: &CloseReport) -> Self {
        Self {
            id: position.id.clone(),
            side: position.side,
            quantity: position.quantity,
            entry_price: position.entry_price,
            exit_price: report.exit_price,
            pnl: report.pnl,
            opened_at: position.opened_at,
            closed_at: report.timestamp,
            close_reason: report.reason.clone(),
            entry_confidence: position.entry_confidence,
        }
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn hold_minutes(&self) -> f64 {
        (self.closed_at - self.opened_at) as f64 / 60_000.0
    }
}

/// Aggregate performance over the journal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percent of trades with positive PnL
    pub win_rate: f64,
    pub total_pnl: f64,
    pub average_win: f64,
    pub average_loss: f64,
    /// Gross profit over gross loss; infinite without losses
    pub profit_factor: f64,
    /// Largest peak-to-trough drop of cumulative PnL, in quote currency
    pub max_drawdown: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
}

impl PerformanceSummary {
    pub fn from_trades(trades: &[ClosedTrade]) -> Self {
        if trades.is_empty() {
            return Self::default();
        }

        let wins: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p > 0.0).collect();
        let losses: Vec<f64> = trades.iter().map(|t| t.pnl).filter(|p| *p < 0.0).collect();

        let gross_profit: f64 = wins.iter().sum();
        let gross_loss: f64 = losses.iter().sum();
        let mean = |v: &[f64], sum: f64| if v.is_empty() { 0.0 } else { sum / v.len() as f64 };

        let profit_factor = if losses.is_empty() {
            f64::INFINITY
        } else {
            (gross_profit / gross_loss).abs()
        };

        Self {
            total_trades: trades.len(),
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate: wins.len() as f64 / trades.len() as f64 * 100.0,
            total_pnl: trades.iter().map(|t| t.pnl).sum(),
            average_win: mean(&wins, gross_profit),
            average_loss: mean(&losses, gross_loss),
            profit_factor,
            max_drawdown: max_drawdown(trades),
            best_trade: trades.iter().map(|t| t.pnl).fold(f64::NEG_INFINITY, f64::max),
            worst_trade: trades.iter().map(|t| t.pnl).fold(f64::INFINITY, f64::min),
        }
    }
}

/// Maximum drawdown of cumulative PnL, starting from a zero peak
fn max_drawdown(trades: &[ClosedTrade]) -> f64 {
    let mut peak = 0.0_f64;
    let mut cumulative = 0.0;
    let mut max_dd = 0.0_f64;

    for trade in trades {
        cumulative += trade.pnl;
        peak = peak.max(cumulative);
        max_dd = max_dd.max(peak - cumulative);
    }
    max_dd
}

/// Closed-trade history with optional JSON file backing
pub struct TradeJournal {
    path: Option<PathBuf>,
    trades: RwLock<Vec<ClosedTrade>>,
}

impl TradeJournal {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            trades: RwLock::new(Vec::new()),
        }
    }

    /// Open a journal backed by `path`, loading existing history.
    ///
    /// A file that does not parse is an error; the journal never starts over
    /// an existing history it could not read.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let trades: Vec<ClosedTrade> = if path.exists() {
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read trade journal {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse trade journal {:?}", path))?
        } else {
            Vec::new()
        };

        info!("Trade journal loaded: {} trades", trades.len());
        Ok(Self {
            path: Some(path),
            trades: RwLock::new(trades),
        })
    }

    /// Journal for an optional configured path
    pub async fn from_config(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => Self::open(p).await,
            None => Ok(Self::in_memory()),
        }
    }

    pub async fn record(&self, trade: ClosedTrade) -> Result<()> {
        info!(
            "Trade recorded: {} {} | P&L: ${:.2} | {}",
            trade.side, trade.id, trade.pnl, trade.close_reason
        );
        self.trades.write().await.push(trade);
        self.save().await
    }

    async fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let content = {
            let trades = self.trades.read().await;
            serde_json::to_string_pretty(&*trades).context("Failed to serialize trades")?
        };
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write trade journal {:?}", path))?;

        debug!("Trade journal saved to {:?}", path);
        Ok(())
    }

    pub async fn trades(&self) -> Vec<ClosedTrade> {
        self.trades.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.trades.read().await.len()
    }

    pub async fn summary(&self) -> PerformanceSummary {
        PerformanceSummary::from_trades(&self.trades.read().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(id: &str, pnl: f64) -> ClosedTrade {
        ClosedTrade {
            id: id.to_string(),
            side: PositionSide::Long,
            quantity: 0.1,
            entry_price: 50000.0,
            exit_price: 50000.0 + pnl * 10.0,
            pnl,
            opened_at: 0,
            closed_at: 3_600_000,
            close_reason: "test".to_string(),
            entry_confidence: 1.0,
        }
    }

    #[test]
    fn test_summary() {
        let trades = vec![trade("1", 100.0), trade("2", -50.0), trade("3", 30.0), trade("4", -70.0)];
        let summary = PerformanceSummary::from_trades(&trades);

        assert_eq!(summary.total_trades, 4);
        assert_eq!(summary.winning_trades, 2);
        assert_eq!(summary.losing_trades, 2);
        assert_eq!(summary.win_rate, 50.0);
        assert_eq!(summary.total_pnl, 10.0);
        assert_eq!(summary.average_win, 65.0);
        assert_eq!(summary.average_loss, -60.0);
        assert_eq!(summary.profit_factor, 130.0 / 120.0);
        // peak 100 after trade 1, trough 10 after trade 4
        assert_eq!(summary.max_drawdown, 90.0);
        assert_eq!(summary.best_trade, 100.0);
        assert_eq!(summary.worst_trade, -70.0);
    }

    #[test]
    fn test_summary_without_losses() {
        let summary = PerformanceSummary::from_trades(&[trade("1", 10.0), trade("2", 0.0)]);
        assert!(summary.profit_factor.is_infinite());
        assert_eq!(summary.win_rate, 50.0);
        assert_eq!(summary.losing_trades, 0);
        assert_eq!(summary.max_drawdown, 0.0);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(PerformanceSummary::from_trades(&[]), PerformanceSummary::default());
    }

    #[test]
    fn test_hold_minutes() {
        assert_eq!(trade("1", 1.0).hold_minutes(), 60.0);
    }

    #[tokio::test]
    async fn test_journal_persists() {
        let path = std::env::temp_dir().join(format!("journal-{}.json", uuid::Uuid::new_v4()));

        let journal = TradeJournal::open(&path).await.unwrap();
        journal.record(trade("1", 25.0)).await.unwrap();
        journal.record(trade("2", -5.0)).await.unwrap();

        let reopened = TradeJournal::open(&path).await.unwrap();
        assert_eq!(reopened.len().await, 2);
        assert_eq!(reopened.summary().await.total_pnl, 20.0);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_in_memory_journal() {
        let journal = TradeJournal::from_config(None).await.unwrap();
        journal.record(trade("1", 5.0)).await.unwrap();
        assert_eq!(journal.trades().await[0].id, "1");
    }

    #[tokio::test]
    async fn test_corrupt_journal_is_left_untouched() {
        let path = std::env::temp_dir().join(format!("journal-{}.json", uuid::Uuid::new_v4()));
        let corrupt = "[{\"id\": \"1\", \"pnl\": ";
        std::fs::write(&path, corrupt).unwrap();

        let err = TradeJournal::open(&path).await.err().unwrap();
        assert!(format!("{:#}", err).contains("Failed to parse trade journal"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), corrupt);

        let _ = std::fs::remove_file(&path);
    }
}
