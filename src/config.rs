// =============================================================================
// Engine Configuration — JSON settings with atomic save
// =============================================================================
//
// Every tunable threshold of the decision pipeline lives here: detector
// thresholds, consensus agreement levels, the point-scoring table, grade
// cutoffs, sizing limits and stop/target policy. None of these values are
// treated as law; they are policy knobs applied consistently.
//
// All structs carry `#[serde(default)]` so that adding new fields never breaks
// loading an older config file, and persistence uses an atomic tmp + rename.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::indicators::volatility::{DEFAULT_HIGH_THRESHOLD_PCT, DEFAULT_LOW_THRESHOLD_PCT};
use crate::indicators::DEFAULT_ATR_PERIOD;
use crate::signals::{Grade, GradeCutoffs, ScoreWeights};

// =============================================================================
// Flow
// =============================================================================

/// Trailing window used by the taker-flow analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowParams {
    /// Number of trailing candles summed (50 one-minute candles by default).
    pub window: usize,
    pub atr_period: usize,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            window: 50,
            atr_period: DEFAULT_ATR_PERIOD,
        }
    }
}

// =============================================================================
// Detectors
// =============================================================================

/// Thresholds shared by the two impulse detectors (early pump / panic dump).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpulseParams {
    /// Bars over which the price move is measured.
    pub lookback: usize,
    pub atr_period: usize,
    /// The move must exceed `ATR * atr_multiplier`.
    pub atr_multiplier: f64,
    /// Bars used for the trailing average volume.
    pub volume_history: usize,
    /// Last-bar volume must be at least this multiple of the trailing average.
    pub volume_factor: f64,
    /// Minimum aggressor share (buy share for pumps, sell share for dumps).
    pub min_taker_share: f64,
    /// SMA period on the longer timeframe used for resonance confirmation.
    pub confirm_ma_period: usize,
}

impl Default for ImpulseParams {
    fn default() -> Self {
        Self {
            lookback: 1,
            atr_period: DEFAULT_ATR_PERIOD,
            atr_multiplier: 2.0,
            volume_history: 60,
            volume_factor: 3.0,
            min_taker_share: 0.6,
            confirm_ma_period: 20,
        }
    }
}

/// Thresholds for the steady-growth detector (medium timeframe).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteadyGrowthParams {
    /// Moving-average periods, strictly ascending.
    pub ma_periods: Vec<usize>,
    /// Bars on which the bullish alignment must hold.
    pub alignment_bars: usize,
    /// Minimum relative slope of the fastest MA over `alignment_bars`.
    pub min_slope: f64,
    /// Minimum fraction of bar-over-bar rising closes over `alignment_bars`.
    pub min_rising_fraction: f64,
    /// Largest single-candle body (%) tolerated; bigger bars are pumps.
    pub max_candle_change_pct: f64,
    /// Recent-3 vs previous-10 mean volume factor; `None` disables the check.
    pub volume_expansion: Option<f64>,
    pub atr_period: usize,
}

impl Default for SteadyGrowthParams {
    fn default() -> Self {
        Self {
            ma_periods: vec![20, 60],
            alignment_bars: 5,
            min_slope: 0.0005,
            min_rising_fraction: 0.6,
            max_candle_change_pct: 3.0,
            volume_expansion: Some(1.3),
            atr_period: DEFAULT_ATR_PERIOD,
        }
    }
}

/// Thresholds for the volume-spike detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeSpikeParams {
    /// Bars summed for the current volume.
    pub spike_bars: usize,
    /// Bars before the spike used for the trailing average.
    pub history_bars: usize,
    /// Required multiple of the trailing average.
    pub factor: f64,
    /// Minimum absolute price change (%) across the spike bars.
    pub min_price_change_pct: f64,
    pub atr_period: usize,
}

impl Default for VolumeSpikeParams {
    fn default() -> Self {
        Self {
            spike_bars: 3,
            history_bars: 60,
            factor: 3.0,
            min_price_change_pct: 0.5,
            atr_period: DEFAULT_ATR_PERIOD,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    pub early_pump: ImpulseParams,
    pub panic_dump: ImpulseParams,
    pub steady_growth: SteadyGrowthParams,
    pub volume_spike: VolumeSpikeParams,
}

// =============================================================================
// Regime / consensus / scoring
// =============================================================================

/// Upper bound for `regime.ttl_secs` (one week).
pub const MAX_REGIME_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeParams {
    /// Cached regime lifetime in seconds.
    pub ttl_secs: i64,
    pub ma_short: usize,
    pub ma_long: usize,
    /// Points of the short MA used to classify its slope.
    pub slope_points: usize,
}

impl Default for RegimeParams {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            ma_short: 20,
            ma_long: 60,
            slope_points: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusParams {
    /// Agreeing fraction required for a STRONG label.
    pub strong_fraction: f64,
    /// Minimum agreeing exchanges for STRONG, and for any bullish label.
    pub min_exchanges: usize,
    /// Flows within `±flow_deadband` count as neither side.
    pub flow_deadband: f64,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            strong_fraction: 0.8,
            min_exchanges: 2,
            flow_deadband: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringParams {
    pub weights: ScoreWeights,
    pub cutoffs: GradeCutoffs,
    /// Buy/sell ratio above which (or below its inverse) flow counts as
    /// one-sided.
    pub strong_ratio: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::DEFAULT,
            cutoffs: GradeCutoffs::DEFAULT,
            strong_ratio: 1.15,
        }
    }
}

// =============================================================================
// Sizing / strategy
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingParams {
    pub max_positions: u32,
    /// Size multiplier applied in the HIGH volatility tier.
    pub high_volatility_multiplier: f64,
    /// Optional cap on `size * entry` in quote currency.
    pub max_notional: Option<f64>,
    /// ATR% below which volatility is LOW.
    pub low_volatility_pct: f64,
    /// ATR% at or above which volatility is HIGH.
    pub high_volatility_pct: f64,
}

impl Default for SizingParams {
    fn default() -> Self {
        Self {
            max_positions: 5,
            high_volatility_multiplier: 0.5,
            max_notional: None,
            low_volatility_pct: DEFAULT_LOW_THRESHOLD_PCT,
            high_volatility_pct: DEFAULT_HIGH_THRESHOLD_PCT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    /// ATR multiple for impulse / spike / consensus stops.
    pub atr_stop_multiplier: f64,
    /// Stop distance floor as a percentage of entry.
    pub min_stop_pct: f64,
    /// Stop distance ceiling as a percentage of entry.
    pub max_stop_pct: f64,
    /// ATR multiple subtracted from the MA anchor for trend-following stops.
    pub trend_stop_atr_multiplier: f64,
    pub rr_floor: f64,
    pub rr_ceiling: f64,
    /// Signals graded below this never become entries.
    pub min_grade: Grade,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            atr_stop_multiplier: 1.5,
            min_stop_pct: 1.0,
            max_stop_pct: 3.0,
            trend_stop_atr_multiplier: 2.0,
            rr_floor: 1.5,
            rr_ceiling: 4.0,
            min_grade: Grade::BPlus,
        }
    }
}

// =============================================================================
// Cycle driver
// =============================================================================

fn default_exchanges() -> Vec<String> {
    vec![
        "binance".to_string(),
        "okx".to_string(),
        "bybit".to_string(),
        "coinbase".to_string(),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleParams {
    pub exchanges: Vec<String>,
    pub primary_timeframe: String,
    pub confirmation_timeframe: String,
    pub primary_limit: usize,
    pub confirmation_limit: usize,
    /// Reference asset used for regime classification.
    pub reference_exchange: String,
    pub reference_symbol: String,
    pub reference_timeframe: String,
    pub reference_limit: usize,
    pub fetch_timeout_secs: u64,
}

impl Default for CycleParams {
    fn default() -> Self {
        Self {
            exchanges: default_exchanges(),
            primary_timeframe: "1m".to_string(),
            confirmation_timeframe: "15m".to_string(),
            primary_limit: 300,
            confirmation_limit: 100,
            reference_exchange: "binance".to_string(),
            reference_symbol: "BTC/USDT".to_string(),
            reference_timeframe: "1h".to_string(),
            reference_limit: 100,
            fetch_timeout_secs: 10,
        }
    }
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Top-level configuration for the decision engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub flow: FlowParams,
    pub detectors: DetectorParams,
    pub regime: RegimeParams,
    pub consensus: ConsensusParams,
    pub scoring: ScoringParams,
    pub sizing: SizingParams,
    pub strategy: StrategyParams,
    pub cycle: CycleParams,
}

impl EngineConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error so the caller can fall back to defaults with
    /// a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("invalid engine config in {}", path.display()))?;

        info!(
            path = %path.display(),
            exchanges = ?config.cycle.exchanges,
            regime_ttl_secs = config.regime.ttl_secs,
            "engine config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration using an atomic write (tmp file, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content =
            serde_json::to_string_pretty(self).context("failed to serialise engine config")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }

    /// Reject parameter combinations the pipeline cannot run with.
    pub fn validate(&self) -> EngineResult<()> {
        fn check(ok: bool, reason: &str) -> EngineResult<()> {
            if ok {
                Ok(())
            } else {
                Err(EngineError::configuration(reason))
            }
        }

        check(self.flow.window > 0, "flow.window must be positive")?;

        for (name, p) in [
            ("early_pump", &self.detectors.early_pump),
            ("panic_dump", &self.detectors.panic_dump),
        ] {
            check(
                p.lookback > 0 && p.atr_period > 0 && p.volume_history > 0 && p.confirm_ma_period > 0,
                &format!("detectors.{name}: periods must be positive"),
            )?;
            check(
                (0.0..=1.0).contains(&p.min_taker_share),
                &format!("detectors.{name}.min_taker_share must be within [0, 1]"),
            )?;
        }

        let sg = &self.detectors.steady_growth;
        check(
            !sg.ma_periods.is_empty() && sg.ma_periods.windows(2).all(|w| w[0] < w[1]),
            "detectors.steady_growth.ma_periods must be non-empty and strictly ascending",
        )?;
        check(
            sg.ma_periods[0] > 0 && sg.alignment_bars >= 2,
            "detectors.steady_growth: periods must be positive and alignment_bars >= 2",
        )?;

        let vs = &self.detectors.volume_spike;
        check(
            vs.spike_bars > 0 && vs.history_bars > 0,
            "detectors.volume_spike: bar counts must be positive",
        )?;

        check(
            self.regime.ttl_secs > 0 && self.regime.ttl_secs <= MAX_REGIME_TTL_SECS,
            "regime.ttl_secs must be positive and at most one week",
        )?;
        check(
            self.regime.ma_short > 0 && self.regime.ma_short < self.regime.ma_long,
            "regime.ma_short must be positive and below regime.ma_long",
        )?;
        check(self.regime.slope_points >= 2, "regime.slope_points must be >= 2")?;

        check(
            self.consensus.strong_fraction > 0.5 && self.consensus.strong_fraction <= 1.0,
            "consensus.strong_fraction must be within (0.5, 1]",
        )?;
        check(self.consensus.min_exchanges >= 1, "consensus.min_exchanges must be >= 1")?;

        let c = &self.scoring.cutoffs;
        check(
            c.a_plus >= c.a && c.a >= c.b_plus,
            "scoring.cutoffs must be ordered a_plus >= a >= b_plus",
        )?;
        check(self.scoring.strong_ratio >= 1.0, "scoring.strong_ratio must be >= 1")?;

        let s = &self.sizing;
        check(
            s.high_volatility_multiplier > 0.0 && s.high_volatility_multiplier <= 1.0,
            "sizing.high_volatility_multiplier must be within (0, 1]",
        )?;
        check(
            s.low_volatility_pct < s.high_volatility_pct,
            "sizing.low_volatility_pct must be below sizing.high_volatility_pct",
        )?;

        let st = &self.strategy;
        check(
            st.min_stop_pct > 0.0 && st.min_stop_pct <= st.max_stop_pct,
            "strategy stop band must satisfy 0 < min_stop_pct <= max_stop_pct",
        )?;
        check(
            st.rr_floor > 0.0 && st.rr_floor <= st.rr_ceiling,
            "strategy reward:risk band must satisfy 0 < rr_floor <= rr_ceiling",
        )?;

        Ok(())
    }
}
