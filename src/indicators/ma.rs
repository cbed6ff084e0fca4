// =============================================================================
// Simple Moving Averages & Trend Slope
// =============================================================================
//
// SMA_t = mean(values[t - period + 1 ..= t])
//
// Trend classification looks at the last `k` points of the SMA series and
// compares the relative change between the first and the last of them.
// =============================================================================

use crate::error::{EngineError, EngineResult};
use crate::types::Trend;

/// Relative slope below which a moving average counts as flat.
pub const FLAT_TOLERANCE: f64 = 1e-4;

/// Most recent simple moving average over `period` values.
pub fn sma(values: &[f64], period: usize) -> EngineResult<f64> {
    if period == 0 {
        return Err(EngineError::configuration("SMA period must be positive"));
    }
    if values.len() < period {
        return Err(EngineError::insufficient("SMA", values.len(), period));
    }
    let window = &values[values.len() - period..];
    Ok(window.iter().sum::<f64>() / period as f64)
}

/// Full SMA series. Element `i` is the average ending at `values[i + period - 1]`.
pub fn sma_series(values: &[f64], period: usize) -> EngineResult<Vec<f64>> {
    if period == 0 {
        return Err(EngineError::configuration("SMA period must be positive"));
    }
    if values.len() < period {
        return Err(EngineError::insufficient("SMA series", values.len(), period));
    }

    let mut result = Vec::with_capacity(values.len() - period + 1);
    let mut sum: f64 = values[..period].iter().sum();
    result.push(sum / period as f64);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        result.push(sum / period as f64);
    }
    Ok(result)
}

/// Relative change of the SMA over its last `k` points:
/// `(ma_last - ma_first) / ma_first`.
///
/// Needs `period + k - 1` values.
pub fn ma_slope(values: &[f64], period: usize, k: usize) -> EngineResult<f64> {
    if k < 2 {
        return Err(EngineError::configuration("slope needs at least 2 points"));
    }
    let need = period + k - 1;
    if values.len() < need {
        return Err(EngineError::insufficient("MA slope", values.len(), need));
    }
    let series = sma_series(values, period)?;
    let tail = &series[series.len() - k..];
    let first = tail[0];
    let last = tail[k - 1];
    if first == 0.0 {
        return Err(EngineError::analysis("moving average is zero"));
    }
    Ok((last - first) / first)
}

/// Classify the slope of the SMA over its last `k` points.
pub fn trend(values: &[f64], period: usize, k: usize) -> EngineResult<Trend> {
    let slope = ma_slope(values, period, k)?;
    Ok(if slope > FLAT_TOLERANCE {
        Trend::Rising
    } else if slope < -FLAT_TOLERANCE {
        Trend::Falling
    } else {
        Trend::Flat
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn ascending(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64).collect()
    }

    #[test]
    fn sma_last_window() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((sma(&v, 3).unwrap() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn sma_insufficient() {
        assert!(sma(&[1.0, 2.0], 3).unwrap_err().is_insufficient_data());
        assert!(matches!(
            sma(&[1.0], 0),
            Err(EngineError::Configuration { .. })
        ));
    }

    #[test]
    fn sma_series_matches_pointwise() {
        let v = ascending(10);
        let series = sma_series(&v, 4).unwrap();
        assert_eq!(series.len(), 7);
        for (i, value) in series.iter().enumerate() {
            let expected = sma(&v[..i + 4], 4).unwrap();
            assert!((value - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn trend_rising_falling_flat() {
        assert_eq!(trend(&ascending(40), 10, 5).unwrap(), Trend::Rising);
        let falling: Vec<f64> = ascending(40).into_iter().rev().collect();
        assert_eq!(trend(&falling, 10, 5).unwrap(), Trend::Falling);
        assert_eq!(trend(&[100.0; 40], 10, 5).unwrap(), Trend::Flat);
    }

    #[test]
    fn trend_needs_period_plus_k_minus_one() {
        let v = ascending(13);
        assert!(trend(&v, 10, 5).unwrap_err().is_insufficient_data());
        assert!(trend(&ascending(14), 10, 5).is_ok());
    }

    #[test]
    fn slope_of_linear_series() {
        // SMA(2) of 1..=6 is 1.5, 2.5, ..., 5.5; last three: 3.5, 4.5, 5.5
        let slope = ma_slope(&ascending(6), 2, 3).unwrap();
        assert!((slope - (5.5 - 3.5) / 3.5).abs() < 1e-12);
    }
}
