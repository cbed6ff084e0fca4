// =============================================================================
// Signal Detectors Module
// =============================================================================
//
// Pattern detectors that run independently on one exchange's candles:
// - EarlyPump     — fast up-move on the short timeframe, confirmed above
//                   the longer-timeframe MA
// - PanicDump     — mirror image of EarlyPump
// - SteadyGrowth  — MA-aligned, low-volatility uptrend on the medium timeframe
// - VolumeSpike   — short burst of volume with a directional price change
//
// Every detector is stateless. An undersized window is "no detection", never
// an error; malformed values still surface as `EngineError::Analysis`.
// =============================================================================

pub mod early_pump;
mod impulse;
pub mod panic_dump;
pub mod steady_growth;
pub mod volume_spike;

use serde::{Deserialize, Serialize};

use crate::config::DetectorParams;
use crate::error::EngineResult;
use crate::market_data::CandleWindow;
use crate::signals::SignalKind;
use crate::types::Direction;

pub use early_pump::EarlyPumpDetector;
pub use panic_dump::PanicDumpDetector;
pub use steady_growth::SteadyGrowthDetector;
pub use volume_spike::VolumeSpikeDetector;

/// Candle windows handed to a detector for one exchange.
#[derive(Debug, Clone, Copy)]
pub struct DetectorInput<'a> {
    /// Short timeframe (1-minute scale).
    pub primary: &'a CandleWindow,
    /// Longer timeframe (15-minute scale), when available.
    pub confirmation: Option<&'a CandleWindow>,
}

/// A detector firing on one exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    pub kind: SignalKind,
    pub direction: Direction,
    /// Timestamp (ms) of the candle that completed the pattern.
    pub timestamp: i64,
    pub price: f64,
    pub atr: f64,
    /// Size of the observed move, in percent (always positive in the
    /// event's direction).
    pub magnitude_pct: f64,
    /// Threshold the move had to clear, in percent.
    pub threshold_pct: f64,
    pub volume_ratio: f64,
    /// Share of volume traded by aggressors on the event's side.
    pub taker_share: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slope: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<f64>,
}

pub trait SignalDetector {
    fn kind(&self) -> SignalKind;

    fn detect(&self, input: &DetectorInput<'_>) -> EngineResult<Option<DetectionEvent>>;
}

/// The closed set of detectors the aggregator runs.
#[derive(Debug, Clone)]
pub enum Detector {
    EarlyPump(EarlyPumpDetector),
    SteadyGrowth(SteadyGrowthDetector),
    PanicDump(PanicDumpDetector),
    VolumeSpike(VolumeSpikeDetector),
}

impl Detector {
    /// One detector of each kind, configured from `params`.
    pub fn standard_set(params: &DetectorParams) -> Vec<Detector> {
        vec![
            Detector::EarlyPump(EarlyPumpDetector::new(params.early_pump.clone())),
            Detector::SteadyGrowth(SteadyGrowthDetector::new(params.steady_growth.clone())),
            Detector::PanicDump(PanicDumpDetector::new(params.panic_dump.clone())),
            Detector::VolumeSpike(VolumeSpikeDetector::new(params.volume_spike.clone())),
        ]
    }
}

impl SignalDetector for Detector {
    fn kind(&self) -> SignalKind {
        match self {
            Detector::EarlyPump(d) => d.kind(),
            Detector::SteadyGrowth(d) => d.kind(),
            Detector::PanicDump(d) => d.kind(),
            Detector::VolumeSpike(d) => d.kind(),
        }
    }

    fn detect(&self, input: &DetectorInput<'_>) -> EngineResult<Option<DetectionEvent>> {
        match self {
            Detector::EarlyPump(d) => d.detect(input),
            Detector::SteadyGrowth(d) => d.detect(input),
            Detector::PanicDump(d) => d.detect(input),
            Detector::VolumeSpike(d) => d.detect(input),
        }
    }
}

/// Map `InsufficientData` to "no detection"; every other error propagates.
pub(crate) fn undersized_as_none(
    result: EngineResult<Option<DetectionEvent>>,
) -> EngineResult<Option<DetectionEvent>> {
    match result {
        Err(e) if e.is_insufficient_data() => Ok(None),
        other => other,
    }
}

/// Mean of a slice; `None` when empty.
pub(crate) fn mean(values: impl ExactSizeIterator<Item = f64>) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    Some(values.sum::<f64>() / n as f64)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::market_data::{Candle, CandleWindow};

    /// Flat, quiet candles around `price` with a 50/50 taker split.
    pub fn quiet(n: usize, price: f64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let wobble = if i % 2 == 0 { 0.05 } else { -0.05 };
                let close = price + wobble;
                Candle {
                    timestamp: i as i64 * 60_000,
                    open: price,
                    high: price + 0.2,
                    low: price - 0.2,
                    close,
                    volume: 10.0,
                    taker_buy_volume: 5.0,
                }
            })
            .collect()
    }

    /// Append a candle one minute after the last one.
    pub fn push(candles: &mut Vec<Candle>, open: f64, close: f64, volume: f64, buy: f64) {
        let ts = candles.last().map(|c| c.timestamp + 60_000).unwrap_or(0);
        candles.push(Candle {
            timestamp: ts,
            open,
            high: open.max(close) + 0.1,
            low: open.min(close) - 0.1,
            close,
            volume,
            taker_buy_volume: buy,
        });
    }

    /// Closes moving by `step` per bar (negative for a decline).
    pub fn trending(n: usize, start: f64, step: f64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let close = start + step * i as f64;
                let open = close - step * 0.5;
                Candle {
                    timestamp: i as i64 * 900_000,
                    open,
                    high: open.max(close) + step.abs() * 0.2,
                    low: open.min(close) - step.abs() * 0.2,
                    close,
                    volume: 10.0,
                    taker_buy_volume: 6.0,
                }
            })
            .collect()
    }

    pub fn window(candles: Vec<Candle>) -> CandleWindow {
        CandleWindow::new(candles).unwrap()
    }
}
