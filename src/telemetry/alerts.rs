//! Alert management for notifications

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::TelemetryConfig;
use crate::position::{ClosedTrade, PerformanceSummary};
use crate::utils::helpers::{format_price, format_usd};
use crate::utils::types::{Position, PositionSide};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl AlertLevel {
    pub fn emoji(&self) -> &str {
        match self {
            AlertLevel::Info => "ℹ️",
            AlertLevel::Warning => "⚠️",
            AlertLevel::Error => "❌",
            AlertLevel::Critical => "🚨",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub title: String,
    pub message: String,
    pub timestamp: i64,
}

impl Alert {
    pub fn new(level: AlertLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Info, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(AlertLevel::Error, title, message)
    }

    pub fn trade_opened(symbol: &str, position: &Position) -> Self {
        let marker = match position.side {
            PositionSide::Long => "🟢",
            PositionSide::Short => "🔴",
        };
        Self::info(
            format!("{} {} {} opened", marker, position.side, symbol),
            format!(
                "Entry: ${}\nQuantity: {}\nStop Loss: ${}\nTake Profit: ${}\nConfidence: {:.0}%",
                format_price(position.entry_price),
                position.quantity,
                format_price(position.stop_loss),
                format_price(position.take_profit),
                position.entry_confidence * 100.0
            ),
        )
    }

    pub fn trade_closed(symbol: &str, trade: &ClosedTrade) -> Self {
        let marker = if trade.is_winner() { "💰" } else { "📉" };
        Self::info(
            format!("{} {} {} closed", marker, trade.side, symbol),
            format!(
                "Reason: {}\nEntry: ${}\nExit: ${}\nP&L: ${:.2}\nHeld: {:.0} min",
                trade.close_reason,
                format_price(trade.entry_price),
                format_price(trade.exit_price),
                trade.pnl,
                trade.hold_minutes()
            ),
        )
    }

    pub fn performance(summary: &PerformanceSummary) -> Self {
        Self::info(
            "📊 Performance summary",
            format!(
                "Trades: {}\nWin Rate: {:.1}%\nTotal P&L: {}\nProfit Factor: {:.2}\nMax Drawdown: {}",
                summary.total_trades,
                summary.win_rate,
                format_usd(summary.total_pnl),
                summary.profit_factor,
                format_usd(summary.max_drawdown)
            ),
        )
    }

    fn text(&self) -> String {
        format!("{} {}\n\n{}", self.level.emoji(), self.title, self.message)
    }
}

/// Telegram destination
#[derive(Debug, Clone)]
struct TelegramTarget {
    bot_token: String,
    chat_id: String,
}

#[derive(Clone)]
pub struct AlertManager {
    enabled: bool,
    webhook_url: Option<String>,
    telegram: Option<TelegramTarget>,
    http_client: reqwest::Client,
}

impl AlertManager {
    pub fn new(config: &TelemetryConfig) -> Self {
        let telegram = match (&config.telegram.bot_token, &config.telegram.chat_id) {
            (Some(bot_token), Some(chat_id)) if config.telegram.enabled => Some(TelegramTarget {
                bot_token: bot_token.clone(),
                chat_id: chat_id.clone(),
            }),
            _ => {
                if config.telegram.enabled {
                    warn!("Telegram credentials not found, Telegram alerts disabled");
                }
                None
            }
        };

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            enabled: config.enable_alerts,
            webhook_url: config.alert_webhook.clone(),
            telegram,
            http_client,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            webhook_url: None,
            telegram: None,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn has_telegram(&self) -> bool {
        self.telegram.is_some()
    }

    pub async fn send(&self, alert: Alert) {
        if !self.enabled {
            return;
        }

        match alert.level {
            AlertLevel::Info => info!("[ALERT] {}: {}", alert.title, alert.message),
            AlertLevel::Warning => warn!("[ALERT] {}: {}", alert.title, alert.message),
            AlertLevel::Error => error!("[ALERT] {}: {}", alert.title, alert.message),
            AlertLevel::Critical => error!("[CRITICAL] {}: {}", alert.title, alert.message),
        }

        if let Some(url) = &self.webhook_url {
            if let Err(e) = self.send_webhook(url, &alert).await {
                warn!("Failed to send webhook alert: {}", e);
            }
        }

        if let Some(target) = &self.telegram {
            if let Err(e) = self.send_telegram(target, &alert).await {
                warn!("Failed to send Telegram alert: {}", e);
            }
        }
    }

    /// Deliver in the background so a slow endpoint never stalls a cycle
    pub fn notify(&self, alert: Alert) {
        if !self.enabled {
            return;
        }
        let manager = self.clone();
        tokio::spawn(async move { manager.send(alert).await });
    }

    async fn send_webhook(&self, url: &str, alert: &Alert) -> Result<()> {
        let payload = serde_json::json!({
            "text": alert.text(),
            "level": alert.level,
            "timestamp": alert.timestamp,
        });

        self.http_client
            .post(url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn send_telegram(&self, target: &TelegramTarget, alert: &Alert) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", target.bot_token);

        let payload = serde_json::json!({
            "chat_id": target.chat_id,
            "text": alert.text(),
        });

        self.http_client
            .post(&url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
