// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators used by the
// analyzers and detectors. Every fallible function returns `EngineResult<T>`
// so callers must handle the insufficient-data case explicitly.

pub mod atr;
pub mod ma;
pub mod volatility;

pub use atr::{calculate_atr, mean_true_range, DEFAULT_ATR_PERIOD};
pub use ma::{ma_slope, sma, sma_series, trend};
pub use volatility::{tier_for, volatility_tier};
