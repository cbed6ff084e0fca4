// =============================================================================
// Volume Spike Detector
// =============================================================================
//
//   spike_volume = Σ volume of the last `spike_bars`
//   baseline     = mean volume of the `history_bars` before them
//   ratio        = spike_volume / (baseline * spike_bars)
//
// Fires when ratio >= factor and the close moved at least
// `min_price_change_pct` across the spike bars. Direction follows the move.

use tracing::debug;

use super::{mean, undersized_as_none, DetectionEvent, DetectorInput, SignalDetector};
use crate::config::VolumeSpikeParams;
use crate::error::{EngineError, EngineResult};
use crate::indicators::calculate_atr;
use crate::signals::SignalKind;
use crate::types::Direction;

#[derive(Debug, Clone)]
pub struct VolumeSpikeDetector {
    params: VolumeSpikeParams,
}

impl VolumeSpikeDetector {
    pub fn new(params: VolumeSpikeParams) -> Self {
        Self { params }
    }

    fn evaluate(&self, input: &DetectorInput<'_>) -> EngineResult<Option<DetectionEvent>> {
        let p = &self.params;
        if p.spike_bars == 0 || p.history_bars == 0 {
            return Err(EngineError::configuration(
                "volume spike bar counts must be positive",
            ));
        }

        let primary = input.primary;
        let need = (p.spike_bars + p.history_bars).max(p.atr_period + 1);
        primary.require("volume spike", need)?;

        let candles = primary.candles();
        let n = candles.len();
        let spike = &candles[n - p.spike_bars..];
        let history = &candles[n - p.spike_bars - p.history_bars..n - p.spike_bars];

        let baseline = mean(history.iter().map(|c| c.volume)).unwrap_or(0.0);
        if baseline <= 0.0 {
            return Ok(None);
        }
        let spike_volume: f64 = spike.iter().map(|c| c.volume).sum();
        let volume_ratio = spike_volume / (baseline * p.spike_bars as f64);
        if volume_ratio < p.factor {
            return Ok(None);
        }

        // Change is measured from the close just before the spike.
        let base_close = candles[n - p.spike_bars - 1].close;
        let last = &candles[n - 1];
        if base_close <= 0.0 {
            return Ok(None);
        }
        let change_pct = (last.close - base_close) / base_close * 100.0;
        if change_pct.abs() < p.min_price_change_pct || change_pct == 0.0 {
            return Ok(None);
        }
        let direction = if change_pct > 0.0 {
            Direction::Long
        } else {
            Direction::Short
        };

        let side_volume: f64 = spike
            .iter()
            .map(|c| match direction {
                Direction::Long => c.taker_buy_volume,
                Direction::Short => c.taker_sell_volume(),
            })
            .sum();
        let taker_share = if spike_volume > 0.0 {
            side_volume / spike_volume
        } else {
            0.0
        };

        let atr = calculate_atr(candles, p.atr_period)?;

        debug!(
            direction = %direction,
            volume_ratio = format!("{:.2}", volume_ratio),
            change_pct = format!("{:.3}", change_pct),
            "volume spike detected"
        );

        Ok(Some(DetectionEvent {
            kind: SignalKind::VolumeSpike,
            direction,
            timestamp: last.timestamp,
            price: last.close,
            atr,
            magnitude_pct: change_pct.abs(),
            threshold_pct: p.min_price_change_pct,
            volume_ratio,
            taker_share,
            slope: None,
            anchor: None,
        }))
    }
}

impl Default for VolumeSpikeDetector {
    fn default() -> Self {
        Self::new(VolumeSpikeParams::default())
    }
}

impl SignalDetector for VolumeSpikeDetector {
    fn kind(&self) -> SignalKind {
        SignalKind::VolumeSpike
    }

    fn detect(&self, input: &DetectorInput<'_>) -> EngineResult<Option<DetectionEvent>> {
        undersized_as_none(self.evaluate(input))
    }
}
