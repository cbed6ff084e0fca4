// =============================================================================
// Taker Flow Analyzer — aggressor buy/sell pressure over a trailing window
// =============================================================================
//
// For every candle in the trailing window:
//   buy  = taker_buy_volume
//   sell = volume - taker_buy_volume
//
//   net_flow        = Σ(buy - sell)
//   buy_sell_ratio  = Σbuy / Σsell   (undefined when Σsell == 0)
//
// Support / resistance are the lowest / highest close in the window. ATR is
// Wilder-smoothed when the window is long enough, otherwise the mean true
// range of the window.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FlowParams;
use crate::error::{EngineError, EngineResult};
use crate::indicators::{calculate_atr, mean_true_range};
use crate::market_data::CandleWindow;

/// Buy/sell volume ratio. Total sell volume of zero leaves it undefined
/// rather than infinite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum BuySellRatio {
    Value(f64),
    Undefined,
}

impl BuySellRatio {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            Self::Undefined => None,
        }
    }

    /// Buyers dominate by more than `strong_ratio`.
    pub fn is_buy_dominant(self, strong_ratio: f64) -> bool {
        matches!(self, Self::Value(v) if v > strong_ratio)
    }

    /// Sellers dominate by more than `strong_ratio`.
    pub fn is_sell_dominant(self, strong_ratio: f64) -> bool {
        matches!(self, Self::Value(v) if strong_ratio > 0.0 && v < 1.0 / strong_ratio)
    }
}

impl std::fmt::Display for BuySellRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v:.3}"),
            Self::Undefined => write!(f, "undefined"),
        }
    }
}

/// Flow summary for one exchange's primary window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowMetrics {
    pub net_flow: f64,
    pub total_buy: f64,
    pub total_sell: f64,
    pub buy_sell_ratio: BuySellRatio,
    pub current_price: f64,
    pub support: f64,
    pub resistance: f64,
    pub atr: f64,
}

#[derive(Debug, Clone)]
pub struct TakerFlowAnalyzer {
    window: usize,
    atr_period: usize,
}

impl TakerFlowAnalyzer {
    pub fn new(params: &FlowParams) -> Self {
        Self {
            window: params.window,
            atr_period: params.atr_period,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Summarise aggressor flow over the trailing window.
    ///
    /// Fails with `InsufficientData` when the window holds fewer candles than
    /// the configured length.
    pub fn analyze(&self, candles: &CandleWindow) -> EngineResult<FlowMetrics> {
        if self.window == 0 {
            return Err(EngineError::configuration("flow window must be positive"));
        }
        candles.require("taker flow", self.window)?;

        let recent = candles.tail(self.window);

        let mut total_buy = 0.0;
        let mut total_sell = 0.0;
        let mut support = f64::INFINITY;
        let mut resistance = f64::NEG_INFINITY;
        for c in recent {
            total_buy += c.taker_buy_volume;
            total_sell += c.taker_sell_volume();
            support = support.min(c.close);
            resistance = resistance.max(c.close);
        }

        let buy_sell_ratio = if total_sell > 0.0 {
            BuySellRatio::Value(total_buy / total_sell)
        } else {
            BuySellRatio::Undefined
        };

        let atr = match calculate_atr(recent, self.atr_period) {
            Ok(v) => v,
            Err(e) if e.is_insufficient_data() => mean_true_range(recent),
            Err(e) => return Err(e),
        };

        // `require` guarantees at least one candle here.
        let current_price = recent.last().map(|c| c.close).unwrap_or_default();

        let metrics = FlowMetrics {
            net_flow: total_buy - total_sell,
            total_buy,
            total_sell,
            buy_sell_ratio,
            current_price,
            support,
            resistance,
            atr,
        };

        debug!(
            net_flow = format!("{:.2}", metrics.net_flow),
            ratio = %metrics.buy_sell_ratio,
            price = metrics.current_price,
            atr = format!("{:.4}", metrics.atr),
            "taker flow analysed"
        );

        Ok(metrics)
    }
}

impl Default for TakerFlowAnalyzer {
    fn default() -> Self {
        Self::new(&FlowParams::default())
    }
}
