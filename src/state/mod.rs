//! Shared State Module
//!
//! Lock-free runtime figures shared between the trading loop, the executor
//! and telemetry.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use crate::utils::helpers::current_timestamp_millis;

/// Atomic floating point wrapper using u64 bit representation
#[derive(Debug, Default)]
pub struct AtomicF64 {
    inner: AtomicU64,
}

impl AtomicF64 {
    pub fn new(val: f64) -> Self {
        Self {
            inner: AtomicU64::new(val.to_bits()),
        }
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.inner.load(Ordering::SeqCst))
    }

    pub fn store(&self, val: f64) {
        self.inner.store(val.to_bits(), Ordering::SeqCst);
    }
}

/// Central shared state store
#[derive(Debug, Default)]
pub struct SharedState {
    // Market
    pub last_price: AtomicF64,
    pub last_price_update: AtomicI64,

    // P&L
    pub realized_pnl: AtomicF64,
    pub unrealized_pnl: AtomicF64,

    // System
    pub cycle_count: AtomicU64,
    pub error_count: AtomicU64,
    pub trade_count: AtomicU64,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_price(&self, price: f64) {
        self.last_price.store(price);
        self.last_price_update
            .store(current_timestamp_millis(), Ordering::SeqCst);
    }

    pub fn last_price(&self) -> f64 {
        self.last_price.load()
    }

    pub fn record_realized_pnl(&self, pnl: f64) {
        self.realized_pnl.store(self.realized_pnl.load() + pnl);
        self.unrealized_pnl.store(0.0);
    }

    pub fn increment_cycle_count(&self) -> u64 {
        self.cycle_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn increment_error_count(&self) {
        self.error_count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_trade_count(&self) {
        self.trade_count.fetch_add(1, Ordering::SeqCst);
    }
}
