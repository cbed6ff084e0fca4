// =============================================================================
// Steady Growth Detector — orderly MA-aligned uptrend (medium timeframe)
// =============================================================================
//
// Conditions, all evaluated on the last `alignment_bars` bars:
//   1. close > MA_fast > ... > MA_slow on every bar
//   2. relative slope of MA_fast >= min_slope
//   3. share of bar-over-bar rising closes >= min_rising_fraction
//   4. no candle body larger than max_candle_change_pct (that is a pump)
//   5. optional: mean volume of the last 3 bars >= volume_expansion x the
//      mean of the 10 bars before them
//
// The slowest MA is reported as the trend-following stop anchor.
// =============================================================================

use tracing::debug;

use super::{mean, undersized_as_none, DetectionEvent, DetectorInput, SignalDetector};
use crate::config::SteadyGrowthParams;
use crate::error::{EngineError, EngineResult};
use crate::indicators::{calculate_atr, sma_series};
use crate::signals::SignalKind;
use crate::types::Direction;

const RECENT_VOLUME_BARS: usize = 3;
const BASELINE_VOLUME_BARS: usize = 10;

#[derive(Debug, Clone)]
pub struct SteadyGrowthDetector {
    params: SteadyGrowthParams,
}

impl SteadyGrowthDetector {
    pub fn new(params: SteadyGrowthParams) -> Self {
        Self { params }
    }

    fn evaluate(&self, input: &DetectorInput<'_>) -> EngineResult<Option<DetectionEvent>> {
        let p = &self.params;
        let Some(medium) = input.confirmation else {
            return Ok(None);
        };
        let Some(&slowest) = p.ma_periods.last() else {
            return Err(EngineError::configuration(
                "steady growth needs at least one MA period",
            ));
        };
        let k = p.alignment_bars;
        if k < 2 {
            return Err(EngineError::configuration(
                "steady growth alignment_bars must be >= 2",
            ));
        }

        let need = (slowest + k - 1)
            .max(k + 1)
            .max(p.atr_period + 1)
            .max(RECENT_VOLUME_BARS + BASELINE_VOLUME_BARS);
        medium.require("steady growth", need)?;

        let candles = medium.candles();
        let closes = medium.closes();
        let n = closes.len();

        // --- Step 1: MA alignment on each of the last k bars ----------------
        let series = p
            .ma_periods
            .iter()
            .map(|&period| sma_series(&closes, period))
            .collect::<EngineResult<Vec<_>>>()?;

        for back in 0..k {
            let close = closes[n - 1 - back];
            let mut upper = close;
            for s in &series {
                let ma = s[s.len() - 1 - back];
                if upper <= ma {
                    return Ok(None);
                }
                upper = ma;
            }
        }

        // --- Step 2: slope of the fastest MA ----------------------------------
        let fast = &series[0];
        let fast_first = fast[fast.len() - k];
        let fast_last = fast[fast.len() - 1];
        if fast_first <= 0.0 {
            return Ok(None);
        }
        let slope = (fast_last - fast_first) / fast_first;
        if slope < p.min_slope {
            return Ok(None);
        }

        // --- Step 3: consistency of the advance -------------------------------
        let rising = closes[n - k - 1..]
            .windows(2)
            .filter(|pair| pair[1] > pair[0])
            .count();
        let rising_fraction = rising as f64 / k as f64;
        if rising_fraction < p.min_rising_fraction {
            return Ok(None);
        }

        // --- Step 4: no single outsized candle ----------------------------------
        let recent = &candles[n - k..];
        if recent
            .iter()
            .any(|c| c.body_pct().abs() > p.max_candle_change_pct)
        {
            return Ok(None);
        }

        // --- Step 5: volume expansion -------------------------------------------
        let recent_volume = mean(candles[n - RECENT_VOLUME_BARS..].iter().map(|c| c.volume));
        let baseline_volume = mean(
            candles[n - RECENT_VOLUME_BARS - BASELINE_VOLUME_BARS..n - RECENT_VOLUME_BARS]
                .iter()
                .map(|c| c.volume),
        );
        let volume_ratio = match (recent_volume, baseline_volume) {
            (Some(r), Some(b)) if b > 0.0 => r / b,
            _ => 0.0,
        };
        if let Some(expansion) = p.volume_expansion {
            if volume_ratio < expansion {
                return Ok(None);
            }
        }

        let atr = calculate_atr(candles, p.atr_period)?;
        let total_volume: f64 = recent.iter().map(|c| c.volume).sum();
        let taker_share = if total_volume > 0.0 {
            recent.iter().map(|c| c.taker_buy_volume).sum::<f64>() / total_volume
        } else {
            0.0
        };
        let anchor = series[series.len() - 1][series[series.len() - 1].len() - 1];
        let last = &candles[n - 1];

        debug!(
            slope = format!("{:.5}", slope),
            rising_fraction = format!("{:.2}", rising_fraction),
            volume_ratio = format!("{:.2}", volume_ratio),
            anchor = format!("{:.4}", anchor),
            "steady growth detected"
        );

        Ok(Some(DetectionEvent {
            kind: SignalKind::SteadyGrowth,
            direction: Direction::Long,
            timestamp: last.timestamp,
            price: last.close,
            atr,
            magnitude_pct: slope * 100.0,
            threshold_pct: p.min_slope * 100.0,
            volume_ratio,
            taker_share,
            slope: Some(slope),
            anchor: Some(anchor),
        }))
    }
}

impl Default for SteadyGrowthDetector {
    fn default() -> Self {
        Self::new(SteadyGrowthParams::default())
    }
}

impl SignalDetector for SteadyGrowthDetector {
    fn kind(&self) -> SignalKind {
        SignalKind::SteadyGrowth
    }

    fn detect(&self, input: &DetectorInput<'_>) -> EngineResult<Option<DetectionEvent>> {
        undersized_as_none(self.evaluate(input))
    }
}
