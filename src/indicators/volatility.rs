// =============================================================================
// Volatility Tiers
// =============================================================================
//
// Buckets ATR% (ATR / price * 100) into LOW / NORMAL / HIGH:
//   atr_pct <  low   => LOW
//   atr_pct >= high  => HIGH
//   otherwise        => NORMAL

use crate::types::VolatilityTier;

pub const DEFAULT_LOW_THRESHOLD_PCT: f64 = 2.0;
pub const DEFAULT_HIGH_THRESHOLD_PCT: f64 = 5.0;

/// Classify an ATR percentage. A non-finite reading is treated as NORMAL.
pub fn volatility_tier(atr_pct: f64, low: f64, high: f64) -> VolatilityTier {
    if !atr_pct.is_finite() {
        return VolatilityTier::Normal;
    }
    if atr_pct < low {
        VolatilityTier::Low
    } else if atr_pct >= high {
        VolatilityTier::High
    } else {
        VolatilityTier::Normal
    }
}

/// Classify from a raw ATR and a reference price.
pub fn tier_for(atr: f64, price: f64, low: f64, high: f64) -> VolatilityTier {
    if price <= 0.0 {
        return VolatilityTier::Normal;
    }
    volatility_tier(atr / price * 100.0, low, high)
}
