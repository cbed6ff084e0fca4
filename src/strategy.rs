// =============================================================================
// Entry/Exit Strategy — turns graded signals into a single recommendation
// =============================================================================
//
// Evaluates one symbol per cycle and produces exactly one Recommendation.
//
// Pipeline:
//   1. Regime (cached or fresh) from the MarketRegimeDetector
//   2. Consensus + graded signals from the MultiPlatformAggregator
//   3. Regime gate: BULL keeps LONG, BEAR keeps SHORT, NEUTRAL keeps nothing
//   4. Best remaining signal; below the minimum grade => no entry
//   5. Stop distance:
//        impulse / spike / consensus — ATR * 1.5, clamped to [1%, 3%] of entry
//        steady growth               — anchor MA - ATR * 2, ATR policy fallback
//   6. Reward:risk from trend strength, clamped to [1.5, 4.0]
//   7. Position size (fixed-fraction, volatility tier, position cap)
//   8. Recommendation
//
// Any suppression yields side NONE with the reason in the rationale. The
// record carries no random ids and no wall-clock time of its own, so the same
// inputs always produce the same recommendation.
// =============================================================================

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregator::{
    Consensus, ConsensusLabel, ExchangeFrames, MultiPlatformAggregator, PlatformMap,
};
use crate::config::{EngineConfig, StrategyParams};
use crate::market_data::CandleWindow;
use crate::regime::{MarketRegimeDetector, Regime, RegimeLabel};
use crate::signals::{Grade, Signal, SignalKind};
use crate::sizing::{PositionSizer, SizeLimit};
use crate::types::{Direction, Side};

// =============================================================================
// Inputs
// =============================================================================

fn default_risk_pct() -> f64 {
    2.0
}

/// Account facts supplied by the caller each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    pub balance: f64,
    /// Percentage of balance risked per trade.
    #[serde(default = "default_risk_pct")]
    pub risk_pct: f64,
    #[serde(default)]
    pub open_positions: u32,
}

/// Everything `evaluate` needs, already resolved for this cycle.
#[derive(Debug, Clone, Copy)]
pub struct StrategyInput<'a> {
    pub symbol: &'a str,
    pub regime: &'a Regime,
    pub consensus: &'a Consensus,
    /// Graded signals, best first.
    pub signals: &'a [Signal],
    pub platforms: &'a PlatformMap,
    pub account: &'a AccountState,
}

// =============================================================================
// Output
// =============================================================================

/// Why a cycle ended without a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SuppressionReason {
    NoExchangeData,
    NoSignals,
    RegimeNeutral,
    RegimeMismatch,
    LowGrade(Grade),
    PositionCap,
    Sizing(String),
}

impl std::fmt::Display for SuppressionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoExchangeData => write!(f, "no exchange data"),
            Self::NoSignals => write!(f, "no signals"),
            Self::RegimeNeutral => write!(f, "regime neutral"),
            Self::RegimeMismatch => write!(f, "regime mismatch"),
            Self::LowGrade(grade) => write!(f, "low grade ({grade})"),
            Self::PositionCap => write!(f, "position cap reached"),
            Self::Sizing(reason) => write!(f, "sizing failed: {reason}"),
        }
    }
}

/// The signal a recommendation was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRef {
    pub kind: SignalKind,
    pub direction: Direction,
    pub grade: Grade,
    pub score: i32,
}

impl From<&Signal> for SignalRef {
    fn from(signal: &Signal) -> Self {
        Self {
            kind: signal.kind,
            direction: signal.direction,
            grade: signal.grade,
            score: signal.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rationale {
    pub regime: RegimeLabel,
    pub regime_computed_at: DateTime<Utc>,
    pub consensus: ConsensusLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<SignalRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppressed: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub symbol: String,
    pub side: Side,
    pub entry_price: Option<f64>,
    pub stop_price: Option<f64>,
    pub target_price: Option<f64>,
    pub reward_risk: Option<f64>,
    pub size: f64,
    pub rationale: Rationale,
}

impl Recommendation {
    pub fn is_actionable(&self) -> bool {
        self.side != Side::None && self.size > 0.0
    }
}

/// Computed price levels for one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Levels {
    entry: f64,
    stop: f64,
    target: f64,
    stop_distance: f64,
    reward_risk: f64,
    atr: f64,
}

// =============================================================================
// EntryExitStrategy
// =============================================================================

pub struct EntryExitStrategy {
    params: StrategyParams,
    sizer: PositionSizer,
    aggregator: MultiPlatformAggregator,
    regime: Arc<MarketRegimeDetector>,
}

impl EntryExitStrategy {
    /// The regime detector is shared so every symbol sees the same cached
    /// regime.
    pub fn new(config: &EngineConfig, regime: Arc<MarketRegimeDetector>) -> Self {
        Self {
            params: config.strategy.clone(),
            sizer: PositionSizer::new(config.sizing.clone()),
            aggregator: MultiPlatformAggregator::new(config),
            regime,
        }
    }

    pub fn aggregator(&self) -> &MultiPlatformAggregator {
        &self.aggregator
    }

    pub fn regime_detector(&self) -> &MarketRegimeDetector {
        &self.regime
    }

    /// Full cycle for one symbol as of `now`: regime, collection, consensus,
    /// signals, then `evaluate`.
    pub fn run_cycle(
        &self,
        symbol: &str,
        reference: &CandleWindow,
        frames: Vec<ExchangeFrames>,
        account: &AccountState,
        now: DateTime<Utc>,
    ) -> Recommendation {
        // ── 1. Regime ────────────────────────────────────────────────────
        let regime = self.regime.analyze_at(reference, false, now);

        // ── 2. Consensus + signals ───────────────────────────────────────
        let collected = self.aggregator.collect(symbol, frames);
        let consensus = self.aggregator.get_market_consensus(&collected.platforms);
        let as_of = collected.data_timestamp().unwrap_or_default();
        let signals = self
            .aggregator
            .analyze_signals(&collected.platforms, symbol, as_of);

        let mut recommendation = self.evaluate(&StrategyInput {
            symbol,
            regime: &regime,
            consensus: &consensus,
            signals: &signals,
            platforms: &collected.platforms,
            account,
        });

        let mut failures: Vec<String> = collected
            .failures
            .iter()
            .map(|f| format!("{} dropped: {}", f.exchange, f.error))
            .collect();
        failures.sort();
        recommendation.rationale.notes.extend(failures);

        recommendation
    }

    /// Decide on one symbol from already-resolved inputs.
    pub fn evaluate(&self, input: &StrategyInput<'_>) -> Recommendation {
        let mut notes = Vec::new();
        if input.consensus.trap_suspected {
            notes.push("single-platform or minority bullish flow, possible trap".to_string());
        }

        if input.platforms.is_empty() {
            return self.suppress(input, None, None, SuppressionReason::NoExchangeData, notes);
        }
        if input.signals.is_empty() {
            return self.suppress(input, None, None, SuppressionReason::NoSignals, notes);
        }

        // ── 3. Regime gate ───────────────────────────────────────────────
        if input.regime.label == RegimeLabel::Neutral {
            notes.push(input.regime.description.clone());
            return self.suppress(input, None, None, SuppressionReason::RegimeNeutral, notes);
        }

        let best = input
            .signals
            .iter()
            .filter(|s| input.regime.label.permits(s.direction))
            .min_by(|a, b| {
                b.grade
                    .cmp(&a.grade)
                    .then(b.score.cmp(&a.score))
                    .then(a.kind.cmp(&b.kind))
                    .then(a.direction.cmp(&b.direction))
            });

        let Some(best) = best else {
            return self.suppress(input, None, None, SuppressionReason::RegimeMismatch, notes);
        };

        // ── 4. Grade floor ───────────────────────────────────────────────
        if best.grade < self.params.min_grade {
            return self.suppress(
                input,
                Some(best),
                None,
                SuppressionReason::LowGrade(best.grade),
                notes,
            );
        }

        // ── 5–6. Stop and target ─────────────────────────────────────────
        let Some(levels) = self.levels(best, input, &mut notes) else {
            return self.suppress(
                input,
                Some(best),
                None,
                SuppressionReason::Sizing("no valid entry price or ATR".to_string()),
                notes,
            );
        };

        // ── 7. Position size ─────────────────────────────────────────────
        let tier = self.sizer.tier(levels.atr, levels.entry);
        let account = input.account;
        let position = match self.sizer.compute_size(
            account.balance,
            account.risk_pct,
            levels.stop_distance,
            tier,
            account.open_positions,
        ) {
            Ok(position) => self.sizer.cap_notional(position, levels.entry),
            Err(e) => {
                return self.suppress(
                    input,
                    Some(best),
                    Some(levels),
                    SuppressionReason::Sizing(e.to_string()),
                    notes,
                );
            }
        };

        if position.limit == SizeLimit::PositionCap {
            return self.suppress(
                input,
                Some(best),
                Some(levels),
                SuppressionReason::PositionCap,
                notes,
            );
        }
        if position.size <= 0.0 {
            return self.suppress(
                input,
                Some(best),
                Some(levels),
                SuppressionReason::Sizing("computed size is zero".to_string()),
                notes,
            );
        }
        notes.push(format!("volatility {tier}, sizing {}", position.limit));

        // ── 8. Recommendation ────────────────────────────────────────────
        info!(
            symbol = input.symbol,
            side = %best.direction,
            kind = %best.kind,
            grade = %best.grade,
            score = best.score,
            regime = %input.regime.label,
            entry = levels.entry,
            stop = levels.stop,
            target = levels.target,
            reward_risk = levels.reward_risk,
            size = position.size,
            "recommendation generated"
        );

        Recommendation {
            symbol: input.symbol.to_string(),
            side: Side::from(best.direction),
            entry_price: Some(levels.entry),
            stop_price: Some(levels.stop),
            target_price: Some(levels.target),
            reward_risk: Some(levels.reward_risk),
            size: position.size,
            rationale: Rationale {
                regime: input.regime.label,
                regime_computed_at: input.regime.computed_at,
                consensus: input.consensus.label,
                signal: Some(SignalRef::from(best)),
                suppressed: None,
                notes,
            },
        }
    }

    // -------------------------------------------------------------------------
    // Levels
    // -------------------------------------------------------------------------

    fn levels(
        &self,
        signal: &Signal,
        input: &StrategyInput<'_>,
        notes: &mut Vec<String>,
    ) -> Option<Levels> {
        let entry = self.entry_price(signal, input.platforms);
        let atr = signal.snapshot.atr;
        if !(entry > 0.0 && entry.is_finite()) || !(atr > 0.0 && atr.is_finite()) {
            return None;
        }
        let sign = signal.direction.sign();

        let trend_distance = match (signal.kind, signal.snapshot.anchor) {
            (SignalKind::SteadyGrowth, Some(anchor)) => {
                let stop = anchor - sign * atr * self.params.trend_stop_atr_multiplier;
                let distance = (entry - stop) * sign;
                if distance > 0.0 {
                    notes.push(format!("stop anchored on MA {anchor:.4}"));
                    Some(distance)
                } else {
                    notes.push("anchor stop invalid, using ATR stop".to_string());
                    None
                }
            }
            _ => None,
        };
        let stop_distance = trend_distance.unwrap_or_else(|| self.atr_stop_distance(entry, atr));

        let reward_risk = self.reward_risk(signal, input.consensus);

        let levels = Levels {
            entry,
            stop: entry - sign * stop_distance,
            target: entry + sign * stop_distance * reward_risk,
            stop_distance,
            reward_risk,
            atr,
        };

        debug!(
            symbol = input.symbol,
            kind = %signal.kind,
            entry,
            atr,
            stop_distance,
            reward_risk,
            "levels computed"
        );

        Some(levels)
    }

    /// Median latest price across the signal's exchanges, falling back to the
    /// signal snapshot.
    fn entry_price(&self, signal: &Signal, platforms: &PlatformMap) -> f64 {
        let mut prices: Vec<f64> = signal
            .exchanges
            .iter()
            .filter_map(|ex| platforms.get(ex))
            .map(|m| m.flow.current_price)
            .collect();
        if prices.is_empty() {
            return signal.snapshot.price;
        }
        prices.sort_by(f64::total_cmp);
        let n = prices.len();
        if n % 2 == 1 {
            prices[n / 2]
        } else {
            (prices[n / 2 - 1] + prices[n / 2]) / 2.0
        }
    }

    /// `ATR * multiplier` clamped to `[min_stop_pct, max_stop_pct]` of entry.
    fn atr_stop_distance(&self, entry: f64, atr: f64) -> f64 {
        let floor = entry * self.params.min_stop_pct / 100.0;
        let ceiling = entry * self.params.max_stop_pct / 100.0;
        (atr * self.params.atr_stop_multiplier).clamp(floor, ceiling)
    }

    fn reward_risk(&self, signal: &Signal, consensus: &Consensus) -> f64 {
        let rr: f64 = match signal.kind {
            SignalKind::SteadyGrowth => match signal.snapshot.slope {
                Some(slope) if slope > 0.002 => 4.0,
                Some(slope) if slope > 0.001 => 3.5,
                _ => 3.0,
            },
            _ => match consensus.label.direction() {
                Some(d) if d == signal.direction && consensus.label.is_strong() => 3.0,
                Some(d) if d == signal.direction => 2.5,
                _ => 2.0,
            },
        };
        rr.clamp(self.params.rr_floor, self.params.rr_ceiling)
    }

    fn suppress(
        &self,
        input: &StrategyInput<'_>,
        signal: Option<&Signal>,
        levels: Option<Levels>,
        reason: SuppressionReason,
        notes: Vec<String>,
    ) -> Recommendation {
        debug!(
            symbol = input.symbol,
            regime = %input.regime.label,
            consensus = %input.consensus.label,
            reason = %reason,
            "no position"
        );

        Recommendation {
            symbol: input.symbol.to_string(),
            side: Side::None,
            entry_price: levels.map(|l| l.entry),
            stop_price: levels.map(|l| l.stop),
            target_price: levels.map(|l| l.target),
            reward_risk: levels.map(|l| l.reward_risk),
            size: 0.0,
            rationale: Rationale {
                regime: input.regime.label,
                regime_computed_at: input.regime.computed_at,
                consensus: input.consensus.label,
                signal: signal.map(SignalRef::from),
                suppressed: Some(reason.to_string()),
                notes,
            },
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::PlatformMetrics;
    use crate::flow::{BuySellRatio, FlowMetrics};
    use crate::signals::{ScoreBreakdown, SignalSnapshot};
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn regime(label: RegimeLabel) -> Regime {
        Regime {
            label,
            description: "test".to_string(),
            computed_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            reference_price: 60_000.0,
            ma_short: Some(59_000.0),
            ma_long: Some(58_000.0),
        }
    }

    fn consensus(label: ConsensusLabel) -> Consensus {
        Consensus {
            label,
            agreeing: 3,
            total: 3,
            bullish: 3,
            bearish: 0,
            total_flow: 1_000.0,
            trap_suspected: false,
        }
    }

    fn platforms(price: f64, atr: f64) -> PlatformMap {
        let mut map = PlatformMap::new();
        map.insert(
            "binance".to_string(),
            PlatformMetrics {
                exchange: "binance".to_string(),
                as_of: 0,
                flow: FlowMetrics {
                    net_flow: 1_000.0,
                    total_buy: 2_000.0,
                    total_sell: 1_000.0,
                    buy_sell_ratio: BuySellRatio::Value(2.0),
                    current_price: price,
                    support: price * 0.95,
                    resistance: price * 1.05,
                    atr,
                },
                events: vec![],
            },
        );
        map
    }

    fn signal(kind: SignalKind, direction: Direction, grade: Grade, score: i32) -> Signal {
        Signal {
            grade,
            kind,
            direction,
            symbol: "ETH/USDT".to_string(),
            timestamp: 0,
            score,
            exchanges: vec!["binance".to_string()],
            breakdown: ScoreBreakdown {
                total: score,
                contributions: vec![],
            },
            snapshot: SignalSnapshot {
                price: 100.0,
                atr: 1.0,
                total_net_flow: 1_000.0,
                magnitude: 3.0,
                slope: None,
                anchor: None,
            },
        }
    }

    fn account(open_positions: u32) -> AccountState {
        AccountState {
            balance: 10_000.0,
            risk_pct: 2.0,
            open_positions,
        }
    }

    fn strategy() -> EntryExitStrategy {
        EntryExitStrategy::new(
            &EngineConfig::default(),
            Arc::new(MarketRegimeDetector::default()),
        )
    }

    fn evaluate(
        regime_label: RegimeLabel,
        consensus_label: ConsensusLabel,
        signals: &[Signal],
        open_positions: u32,
    ) -> Recommendation {
        let r = regime(regime_label);
        let c = consensus(consensus_label);
        let p = platforms(100.0, 1.0);
        let a = account(open_positions);
        strategy().evaluate(&StrategyInput {
            symbol: "ETH/USDT",
            regime: &r,
            consensus: &c,
            signals,
            platforms: &p,
            account: &a,
        })
    }

    #[test]
    fn bull_long_pump_is_recommended() {
        let signals = [signal(SignalKind::EarlyPump, Direction::Long, Grade::APlus, 85)];
        let rec = evaluate(RegimeLabel::Bull, ConsensusLabel::StrongBullish, &signals, 0);

        assert_eq!(rec.side, Side::Long);
        // ATR 1.0 * 1.5 = 1.5, within [1, 3] for entry 100.
        assert_relative_eq!(rec.stop_price.unwrap(), 98.5);
        assert_relative_eq!(rec.reward_risk.unwrap(), 3.0);
        assert_relative_eq!(rec.target_price.unwrap(), 104.5);
        // risk 200 / 1.5
        assert_relative_eq!(rec.size, 200.0 / 1.5, epsilon = 1e-9);
        assert!(rec.is_actionable());
        assert!(rec.rationale.suppressed.is_none());
    }

    #[test]
    fn atr_stop_is_clamped() {
        let s = strategy();
        assert_relative_eq!(s.atr_stop_distance(100.0, 0.1), 1.0);
        assert_relative_eq!(s.atr_stop_distance(100.0, 10.0), 3.0);
    }

    #[test]
    fn neutral_regime_suppresses() {
        let signals = [signal(SignalKind::EarlyPump, Direction::Long, Grade::APlus, 85)];
        let rec = evaluate(RegimeLabel::Neutral, ConsensusLabel::StrongBullish, &signals, 0);
        assert_eq!(rec.side, Side::None);
        assert_eq!(rec.rationale.suppressed.as_deref(), Some("regime neutral"));
    }

    #[test]
    fn bull_regime_filters_short_signals() {
        let signals = [signal(SignalKind::PanicDump, Direction::Short, Grade::A, 70)];
        let rec = evaluate(RegimeLabel::Bull, ConsensusLabel::Bearish, &signals, 0);
        assert_eq!(rec.side, Side::None);
        assert_eq!(rec.rationale.suppressed.as_deref(), Some("regime mismatch"));
    }

    #[test]
    fn low_grade_is_suppressed() {
        let signals = [signal(SignalKind::VolumeSpike, Direction::Long, Grade::C, 40)];
        let rec = evaluate(RegimeLabel::Bull, ConsensusLabel::Neutral, &signals, 0);
        assert_eq!(rec.side, Side::None);
        assert_eq!(rec.rationale.suppressed.as_deref(), Some("low grade (C)"));
        assert_eq!(rec.rationale.signal.as_ref().map(|s| s.grade), Some(Grade::C));
    }

    #[test]
    fn position_cap_suppresses_with_reason() {
        let signals = [signal(SignalKind::EarlyPump, Direction::Long, Grade::APlus, 85)];
        let rec = evaluate(RegimeLabel::Bull, ConsensusLabel::StrongBullish, &signals, 5);
        assert_eq!(rec.side, Side::None);
        assert_eq!(rec.size, 0.0);
        assert_eq!(
            rec.rationale.suppressed.as_deref(),
            Some("position cap reached")
        );
    }

    #[test]
    fn sizing_error_is_reported() {
        let r = regime(RegimeLabel::Bull);
        let c = consensus(ConsensusLabel::StrongBullish);
        let p = platforms(100.0, 1.0);
        let a = AccountState {
            balance: 0.0,
            risk_pct: 2.0,
            open_positions: 0,
        };
        let signals = [signal(SignalKind::EarlyPump, Direction::Long, Grade::APlus, 85)];
        let rec = strategy().evaluate(&StrategyInput {
            symbol: "ETH/USDT",
            regime: &r,
            consensus: &c,
            signals: &signals,
            platforms: &p,
            account: &a,
        });
        assert_eq!(rec.side, Side::None);
        assert!(rec
            .rationale
            .suppressed
            .as_deref()
            .unwrap()
            .starts_with("sizing failed"));
    }

    #[test]
    fn steady_growth_uses_anchor_and_slope() {
        let mut s = signal(SignalKind::SteadyGrowth, Direction::Long, Grade::A, 70);
        s.snapshot.anchor = Some(97.0);
        s.snapshot.slope = Some(0.0025);
        let rec = evaluate(RegimeLabel::Bull, ConsensusLabel::Neutral, &[s], 0);
        assert_eq!(rec.side, Side::Long);
        // 97 - 2 * 1.0 = 95
        assert_relative_eq!(rec.stop_price.unwrap(), 95.0);
        assert_relative_eq!(rec.reward_risk.unwrap(), 4.0);
        assert_relative_eq!(rec.target_price.unwrap(), 120.0);
    }

    #[test]
    fn reward_risk_tiers() {
        let st = strategy();
        let mut s = signal(SignalKind::SteadyGrowth, Direction::Long, Grade::A, 70);
        s.snapshot.slope = Some(0.0015);
        assert_relative_eq!(st.reward_risk(&s, &consensus(ConsensusLabel::Neutral)), 3.5);
        s.snapshot.slope = Some(0.0006);
        assert_relative_eq!(st.reward_risk(&s, &consensus(ConsensusLabel::Neutral)), 3.0);

        let pump = signal(SignalKind::EarlyPump, Direction::Long, Grade::A, 70);
        assert_relative_eq!(st.reward_risk(&pump, &consensus(ConsensusLabel::Bullish)), 2.5);
        assert_relative_eq!(st.reward_risk(&pump, &consensus(ConsensusLabel::Neutral)), 2.0);
        assert_relative_eq!(st.reward_risk(&pump, &consensus(ConsensusLabel::Bearish)), 2.0);
    }

    #[test]
    fn reward_risk_is_clamped_to_configured_band() {
        let mut config = EngineConfig::default();
        config.strategy.rr_floor = 2.2;
        config.strategy.rr_ceiling = 3.2;
        let st = EntryExitStrategy::new(&config, Arc::new(MarketRegimeDetector::default()));

        let mut s = signal(SignalKind::SteadyGrowth, Direction::Long, Grade::A, 70);
        s.snapshot.slope = Some(0.003);
        assert_relative_eq!(st.reward_risk(&s, &consensus(ConsensusLabel::Neutral)), 3.2);

        let pump = signal(SignalKind::EarlyPump, Direction::Long, Grade::A, 70);
        assert_relative_eq!(st.reward_risk(&pump, &consensus(ConsensusLabel::Neutral)), 2.2);
    }

    #[test]
    fn empty_inputs_are_suppressed() {
        let rec = evaluate(RegimeLabel::Bull, ConsensusLabel::Neutral, &[], 0);
        assert_eq!(rec.rationale.suppressed.as_deref(), Some("no signals"));

        let r = regime(RegimeLabel::Bull);
        let c = consensus(ConsensusLabel::Neutral);
        let rec = strategy().evaluate(&StrategyInput {
            symbol: "ETH/USDT",
            regime: &r,
            consensus: &c,
            signals: &[],
            platforms: &PlatformMap::new(),
            account: &account(0),
        });
        assert_eq!(rec.rationale.suppressed.as_deref(), Some("no exchange data"));
    }

    #[test]
    fn evaluate_is_idempotent() {
        let signals = [signal(SignalKind::EarlyPump, Direction::Long, Grade::APlus, 85)];
        let a = evaluate(RegimeLabel::Bull, ConsensusLabel::StrongBullish, &signals, 0);
        let b = evaluate(RegimeLabel::Bull, ConsensusLabel::StrongBullish, &signals, 0);
        assert_eq!(a, b);
    }
}
