#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use flowgate::aggregator::ExchangeFrames;
pub use flowgate::market_data::{Candle, CandleWindow};
use flowgate::{AccountState, EngineConfig, EntryExitStrategy, MarketRegimeDetector};

pub const MINUTE_MS: i64 = 60_000;
pub const QUARTER_MS: i64 = 15 * MINUTE_MS;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// Quiet one-minute candles around `price` where takers buy `buy_share` of
/// the volume.
pub fn quiet_minutes(n: usize, price: f64, buy_share: f64) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let close = if i % 2 == 0 { price + 0.05 } else { price - 0.05 };
            Candle {
                timestamp: i as i64 * MINUTE_MS,
                open: price,
                high: price + 0.2,
                low: price - 0.2,
                close,
                volume: 10.0,
                taker_buy_volume: 10.0 * buy_share,
            }
        })
        .collect()
}

/// Append one candle after the last.
pub fn push_candle(candles: &mut Vec<Candle>, open: f64, close: f64, volume: f64, buy: f64) {
    let step = if candles.len() >= 2 {
        candles[1].timestamp - candles[0].timestamp
    } else {
        MINUTE_MS
    };
    let timestamp = candles.last().map(|c| c.timestamp + step).unwrap_or(0);
    candles.push(Candle {
        timestamp,
        open,
        high: open.max(close) + 0.1,
        low: open.min(close) - 0.1,
        close,
        volume,
        taker_buy_volume: buy,
    });
}

/// Candles with closes moving `step` per bar.
pub fn trending(n: usize, start: f64, step: f64, interval_ms: i64) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let close = start + step * i as f64;
            let open = close - step * 0.5;
            Candle {
                timestamp: i as i64 * interval_ms,
                open,
                high: open.max(close) + step.abs() * 0.2,
                low: open.min(close) - step.abs() * 0.2,
                close,
                volume: 100.0,
                taker_buy_volume: 50.0,
            }
        })
        .collect()
}

/// One-minute window ending in an aggressive, buyer-driven jump.
pub fn pump_primary() -> Vec<Candle> {
    let mut candles = quiet_minutes(120, 100.0, 0.7);
    push_candle(&mut candles, 100.0, 103.0, 50.0, 40.0);
    candles
}

/// One-minute window ending in an aggressive, seller-driven drop.
pub fn dump_primary() -> Vec<Candle> {
    let mut candles = quiet_minutes(120, 100.0, 0.3);
    push_candle(&mut candles, 100.0, 97.0, 50.0, 10.0);
    candles
}

pub fn rising_quarters() -> Vec<Candle> {
    trending(100, 90.0, 0.1, QUARTER_MS)
}

pub fn falling_quarters() -> Vec<Candle> {
    trending(100, 110.0, -0.1, QUARTER_MS)
}

pub fn bull_reference() -> CandleWindow {
    CandleWindow::new(trending(100, 30_000.0, 50.0, HOUR_MS)).unwrap()
}

pub fn bear_reference() -> CandleWindow {
    CandleWindow::new(trending(100, 40_000.0, -50.0, HOUR_MS)).unwrap()
}

pub fn frames(exchange: &str, primary: Vec<Candle>, confirmation: Vec<Candle>) -> ExchangeFrames {
    ExchangeFrames {
        exchange: exchange.to_string(),
        primary,
        confirmation: Some(confirmation),
    }
}

pub fn account(open_positions: u32) -> AccountState {
    AccountState {
        balance: 10_000.0,
        risk_pct: 2.0,
        open_positions,
    }
}

pub fn strategy() -> EntryExitStrategy {
    strategy_with(EngineConfig::default())
}

pub fn strategy_with(config: EngineConfig) -> EntryExitStrategy {
    let regime = Arc::new(MarketRegimeDetector::new(config.regime.clone()));
    EntryExitStrategy::new(&config, regime)
}
