//! Benchmarks for performance-critical paths
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use trend_follow_bot::agent::AdaptiveRiskManager;
use trend_follow_bot::engines::{validate_orderbook_pressure, IndicatorEngine, SignalEngine};
use trend_follow_bot::state::AtomicF64;
use trend_follow_bot::utils::types::{
    Candle, IndicatorSnapshot, OrderBook, OrderBookLevel, Position, PositionSide, TradeAction,
};

fn snapshot() -> IndicatorSnapshot {
    IndicatorSnapshot {
        ema_200: 49000.0,
        macd: 50.0,
        macd_signal: 30.0,
        macd_histogram: 20.0,
        rsi: 55.0,
        atr: 500.0,
        volume_ratio: 2.0,
        adx: 30.0,
    }
}

fn candles(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let close = 50000.0 + (i as f64 * 0.1).sin() * 500.0 + i as f64;
            Candle {
                open_time: i as i64 * 300_000,
                open: close - 5.0,
                high: close + 25.0,
                low: close - 25.0,
                close,
                volume: 100.0 + (i % 7) as f64 * 10.0,
            }
        })
        .collect()
}

/// Benchmark atomic price updates
fn bench_atomic_price_update(c: &mut Criterion) {
    let price = AtomicF64::new(50000.0);

    c.bench_function("atomic_price_update", |b| {
        b.iter(|| {
            price.store(black_box(50012.345));
            black_box(price.load())
        })
    });
}

/// Benchmark entry and exit evaluation
fn bench_signals(c: &mut Criterion) {
    let engine = SignalEngine::default();
    let snap = snapshot();
    let position = Position {
        id: "bench".to_string(),
        side: PositionSide::Long,
        quantity: 0.1,
        entry_price: 50000.0,
        stop_loss: 49000.0,
        take_profit: 53000.0,
        opened_at: 0,
        entry_confidence: 1.0,
    };

    c.bench_function("evaluate_entry", |b| {
        b.iter(|| engine.evaluate_entry(black_box(50000.0), black_box(&snap)))
    });
    c.bench_function("evaluate_exit", |b| {
        b.iter(|| engine.evaluate_exit(black_box(50000.0), black_box(&snap), &position))
    });
}

/// Benchmark sizing and the trailing stop
fn bench_risk(c: &mut Criterion) {
    let manager = AdaptiveRiskManager::default();
    let snap = snapshot();
    let position = Position {
        id: "bench".to_string(),
        side: PositionSide::Long,
        quantity: 0.1,
        entry_price: 50000.0,
        stop_loss: 49000.0,
        take_profit: 53000.0,
        opened_at: 0,
        entry_confidence: 1.0,
    };

    c.bench_function("size_position", |b| {
        b.iter(|| manager.size_position(black_box(10000.0), black_box(50000.0), black_box(500.0)))
    });
    c.bench_function("update_trailing_stop", |b| {
        b.iter(|| manager.update_trailing_stop(&position, black_box(52000.0), &snap))
    });
}

/// Benchmark orderbook pressure at different depths
fn bench_orderbook(c: &mut Criterion) {
    let mut group = c.benchmark_group("orderbook_pressure");

    for depth in [5usize, 20, 100] {
        let book = OrderBook {
            bids: (0..depth)
                .map(|i| OrderBookLevel { price: 50000.0 - i as f64, quantity: 1.0 })
                .collect(),
            asks: (0..depth)
                .map(|i| OrderBookLevel { price: 50001.0 + i as f64, quantity: 0.9 })
                .collect(),
        };

        group.bench_with_input(BenchmarkId::from_parameter(depth), &book, |b, book| {
            b.iter(|| validate_orderbook_pressure(black_box(book), TradeAction::Buy, depth))
        });
    }

    group.finish();
}

/// Benchmark the full indicator snapshot
fn bench_indicators(c: &mut Criterion) {
    let engine = IndicatorEngine::default();
    let mut group = c.benchmark_group("indicator_snapshot");

    for size in [250usize, 500, 1000] {
        let data = candles(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| engine.calculate(black_box(data)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_atomic_price_update,
    bench_signals,
    bench_risk,
    bench_orderbook,
    bench_indicators,
);
criterion_main!(benches);
