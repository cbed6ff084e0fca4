// =============================================================================
// Average True Range (ATR) — Wilder's Smoothing Method
// =============================================================================
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is then the smoothed average of TR using Wilder's method:
//   ATR_0   = SMA of first `period` TR values
//   ATR_t   = (ATR_{t-1} * (period - 1) + TR_t) / period
//
// Default period: 14
// =============================================================================

use crate::error::{EngineError, EngineResult};
use crate::market_data::Candle;

pub const DEFAULT_ATR_PERIOD: usize = 14;

/// Compute the most recent ATR value from a slice of candles (oldest first).
///
/// # Errors
/// - `Configuration` when `period` is zero.
/// - `InsufficientData` when there are fewer than `period + 1` candles (each
///   TR value needs a previous close).
/// - `Analysis` when an intermediate value is non-finite.
pub fn calculate_atr(candles: &[Candle], period: usize) -> EngineResult<f64> {
    if period == 0 {
        return Err(EngineError::configuration("ATR period must be positive"));
    }
    if candles.len() < period + 1 {
        return Err(EngineError::insufficient("ATR", candles.len(), period + 1));
    }
    // f64::max swallows NaN, so non-finite inputs must be rejected up front.
    if candles
        .iter()
        .any(|c| !(c.high.is_finite() && c.low.is_finite() && c.close.is_finite()))
    {
        return Err(EngineError::analysis("ATR input contains non-finite prices"));
    }

    // --- Step 1: True Range for each consecutive pair ------------------------
    let tr_values: Vec<f64> = candles
        .windows(2)
        .map(|pair| pair[1].true_range(pair[0].close))
        .collect();

    // --- Step 2: Seed with SMA of first `period` TR values -------------------
    let seed: f64 = tr_values[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return Err(EngineError::analysis("ATR seed is not finite"));
    }

    // --- Step 3: Wilder's smoothing for the remaining TR values --------------
    let period_f = period as f64;
    let mut atr = seed;
    for &tr in &tr_values[period..] {
        atr = (atr * (period_f - 1.0) + tr) / period_f;
        if !atr.is_finite() {
            return Err(EngineError::analysis("ATR became non-finite"));
        }
    }

    Ok(atr.max(0.0))
}

/// Mean true range over the slice (first bar uses its own high-low range).
///
/// Fallback volatility read for windows too short for a smoothed ATR.
pub fn mean_true_range(candles: &[Candle]) -> f64 {
    if candles.is_empty() {
        return 0.0;
    }
    let first = candles[0].high - candles[0].low;
    let rest: f64 = candles
        .windows(2)
        .map(|pair| pair[1].true_range(pair[0].close))
        .sum();
    (first + rest) / candles.len() as f64
}
