// =============================================================================
// flowgate — multi-exchange signal aggregation and trading decision engine
// =============================================================================
//
// Candles from several exchanges flow through per-exchange analysis (taker
// flow, pattern detectors), are merged into a cross-exchange consensus and
// graded signals, gated by the broad market regime, and turned into a single
// sized recommendation per symbol per cycle.

pub mod aggregator;
pub mod config;
pub mod cycle;
pub mod detectors;
pub mod error;
pub mod flow;
pub mod indicators;
pub mod market_data;
pub mod regime;
pub mod signals;
pub mod sizing;
pub mod strategy;
pub mod types;

pub use aggregator::{Consensus, ConsensusLabel, MultiPlatformAggregator, PlatformMap};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use market_data::{Candle, CandleWindow};
pub use regime::{MarketRegimeDetector, Regime, RegimeLabel};
pub use signals::{Grade, Signal, SignalKind};
pub use strategy::{AccountState, EntryExitStrategy, Recommendation};
pub use types::{Direction, Side};
