use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single normalized OHLCV candle with aggressor (taker) buy volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub taker_buy_volume: f64,
}

impl Candle {
    /// Aggressor sell volume (`volume - taker_buy_volume`).
    pub fn taker_sell_volume(&self) -> f64 {
        self.volume - self.taker_buy_volume
    }

    /// True range against the previous close.
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// Body change in percent (`(close - open) / open * 100`).
    pub fn body_pct(&self) -> f64 {
        if self.open > 0.0 {
            (self.close - self.open) / self.open * 100.0
        } else {
            0.0
        }
    }
}

/// Composite key that identifies one candle series.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowKey {
    pub exchange: String,
    pub symbol: String,
    pub timeframe: String,
}

impl std::fmt::Display for WindowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}@{}", self.exchange, self.symbol, self.timeframe)
    }
}

// ---------------------------------------------------------------------------
// CandleWindow -- validated, ordered candle sequence
// ---------------------------------------------------------------------------

/// Ordered candles for one `(exchange, symbol, timeframe)` series.
///
/// Construction validates that timestamps are strictly increasing, that
/// every price and volume is finite and non-negative, and that open and
/// close lie within `[low, high]`. Minimum length is the
/// consumer's concern; an empty window is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandleWindow {
    candles: Vec<Candle>,
}

impl CandleWindow {
    pub fn new(candles: Vec<Candle>) -> EngineResult<Self> {
        for (i, c) in candles.iter().enumerate() {
            let fields = [c.open, c.high, c.low, c.close, c.volume, c.taker_buy_volume];
            if fields.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(EngineError::analysis(format!(
                    "candle {} (ts {}) has a non-finite or negative field",
                    i, c.timestamp
                )));
            }
            let range = c.low..=c.high;
            if range.is_empty() || !range.contains(&c.open) || !range.contains(&c.close) {
                return Err(EngineError::analysis(format!(
                    "candle {} (ts {}) has inconsistent range: O {} H {} L {} C {}",
                    i, c.timestamp, c.open, c.high, c.low, c.close
                )));
            }
            if c.taker_buy_volume > c.volume {
                return Err(EngineError::analysis(format!(
                    "candle {} (ts {}) taker buy volume {} exceeds volume {}",
                    i, c.timestamp, c.taker_buy_volume, c.volume
                )));
            }
            if i > 0 && c.timestamp <= candles[i - 1].timestamp {
                return Err(EngineError::analysis(format!(
                    "non-monotonic timestamps at index {}: {} after {}",
                    i,
                    c.timestamp,
                    candles[i - 1].timestamp
                )));
            }
        }
        Ok(Self { candles })
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// The most recent `count` candles (oldest first). Returns the whole
    /// window when it is shorter than `count`.
    pub fn tail(&self, count: usize) -> &[Candle] {
        let start = self.candles.len().saturating_sub(count);
        &self.candles[start..]
    }

    /// Close prices, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Timestamp of the newest candle.
    pub fn last_timestamp(&self) -> Option<i64> {
        self.candles.last().map(|c| c.timestamp)
    }

    /// Fail with `InsufficientData` unless at least `need` candles exist.
    pub fn require(&self, what: &'static str, need: usize) -> EngineResult<()> {
        if self.candles.len() < need {
            return Err(EngineError::insufficient(what, self.candles.len(), need));
        }
        Ok(())
    }
}
