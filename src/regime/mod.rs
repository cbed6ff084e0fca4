// =============================================================================
// Regime Detection Module
// =============================================================================
//
// Broad market regime (BULL / BEAR / NEUTRAL) classified from a reference
// asset's higher-timeframe candles, cached with a TTL and used as the
// direction gate for every symbol.

pub mod detector;

pub use detector::{MarketRegimeDetector, Regime, RegimeLabel};
