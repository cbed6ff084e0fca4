// =============================================================================
// Multi-Platform Aggregator — cross-exchange consensus and graded signals
// =============================================================================
//
// Per cycle, for one symbol:
//   1. collect()              — per-exchange flow + detectors, with failures
//                               isolated to the exchange that produced them
//   2. get_market_consensus() — count exchanges with positive / negative net
//                               taker flow and label the agreement
//   3. analyze_signals()      — one candidate per (detector kind, direction)
//                               plus the consensus itself, scored with the
//                               fixed weight table and graded
//
// Anti-manipulation: a bullish reading carried by fewer than `min_exchanges`
// exchanges is downgraded to NEUTRAL and flagged as a suspected trap.
//
// Everything here is a pure function of the platform map. Exchange lists are
// sorted and snapshot aggregates use medians, so the output never depends on
// map iteration order.
// =============================================================================

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{ConsensusParams, EngineConfig, ScoringParams};
use crate::detectors::{DetectionEvent, Detector, DetectorInput, SignalDetector};
use crate::error::{EngineError, EngineResult};
use crate::flow::{FlowMetrics, TakerFlowAnalyzer};
use crate::market_data::{Candle, CandleWindow};
use crate::signals::weighted_score::{self, ConsensusAlignment, ScoreInputs};
use crate::signals::{Signal, SignalKind, SignalSnapshot};
use crate::types::Direction;

// =============================================================================
// Types
// =============================================================================

/// Raw candles fetched from one exchange for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeFrames {
    pub exchange: String,
    pub primary: Vec<Candle>,
    #[serde(default)]
    pub confirmation: Option<Vec<Candle>>,
}

/// Everything one exchange contributed to the cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformMetrics {
    pub exchange: String,
    /// Timestamp (ms) of the newest primary candle.
    pub as_of: i64,
    pub flow: FlowMetrics,
    pub events: Vec<DetectionEvent>,
}

pub type PlatformMap = HashMap<String, PlatformMetrics>;

/// An exchange dropped from the cycle and why.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeFailure {
    pub exchange: String,
    pub error: EngineError,
}

#[derive(Debug, Clone, Default)]
pub struct CollectedMetrics {
    pub platforms: PlatformMap,
    pub failures: Vec<ExchangeFailure>,
}

impl CollectedMetrics {
    /// Newest candle timestamp across every surviving exchange.
    pub fn data_timestamp(&self) -> Option<i64> {
        self.platforms.values().map(|p| p.as_of).max()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsensusLabel {
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    StrongBearish,
}

impl ConsensusLabel {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::StrongBullish | Self::Bullish => Some(Direction::Long),
            Self::StrongBearish | Self::Bearish => Some(Direction::Short),
            Self::Neutral => None,
        }
    }

    pub fn is_strong(self) -> bool {
        matches!(self, Self::StrongBullish | Self::StrongBearish)
    }

    /// How this consensus relates to a signal pointing `direction`.
    pub fn alignment(self, direction: Direction) -> ConsensusAlignment {
        match self.direction() {
            None => ConsensusAlignment::Neutral,
            Some(d) if d != direction => ConsensusAlignment::Opposing,
            Some(_) if self.is_strong() => ConsensusAlignment::Strong,
            Some(_) => ConsensusAlignment::Simple,
        }
    }
}

impl std::fmt::Display for ConsensusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StrongBullish => write!(f, "STRONG_BULLISH"),
            Self::Bullish => write!(f, "BULLISH"),
            Self::Neutral => write!(f, "NEUTRAL"),
            Self::Bearish => write!(f, "BEARISH"),
            Self::StrongBearish => write!(f, "STRONG_BEARISH"),
        }
    }
}

/// Cross-exchange agreement on direction. Recomputed every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consensus {
    pub label: ConsensusLabel,
    /// Exchanges on the majority side.
    pub agreeing: usize,
    pub total: usize,
    pub bullish: usize,
    pub bearish: usize,
    pub total_flow: f64,
    pub trap_suspected: bool,
}

impl Consensus {
    fn empty() -> Self {
        Self {
            label: ConsensusLabel::Neutral,
            agreeing: 0,
            total: 0,
            bullish: 0,
            bearish: 0,
            total_flow: 0.0,
            trap_suspected: false,
        }
    }
}

// =============================================================================
// MultiPlatformAggregator
// =============================================================================

pub struct MultiPlatformAggregator {
    flow: TakerFlowAnalyzer,
    detectors: Vec<Detector>,
    consensus: ConsensusParams,
    scoring: ScoringParams,
}

impl MultiPlatformAggregator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            flow: TakerFlowAnalyzer::new(&config.flow),
            detectors: Detector::standard_set(&config.detectors),
            consensus: config.consensus.clone(),
            scoring: config.scoring.clone(),
        }
    }

    // -------------------------------------------------------------------------
    // Step 1: per-exchange collection
    // -------------------------------------------------------------------------

    /// Run the flow analyzer and every detector on each exchange. A failing
    /// exchange is recorded and dropped; the rest proceed.
    pub fn collect(&self, symbol: &str, frames: Vec<ExchangeFrames>) -> CollectedMetrics {
        let mut collected = CollectedMetrics::default();

        for frame in frames {
            let exchange = frame.exchange.clone();
            match self.analyze_exchange(frame) {
                Ok(metrics) => {
                    if collected.platforms.insert(exchange.clone(), metrics).is_some() {
                        warn!(symbol, exchange = %exchange, "duplicate exchange frames, keeping the last");
                    }
                }
                Err(error) => {
                    warn!(symbol, exchange = %exchange, error = %error, "exchange dropped from cycle");
                    collected.failures.push(ExchangeFailure { exchange, error });
                }
            }
        }

        debug!(
            symbol,
            exchanges = collected.platforms.len(),
            failures = collected.failures.len(),
            "platform metrics collected"
        );

        collected
    }

    fn analyze_exchange(&self, frame: ExchangeFrames) -> EngineResult<PlatformMetrics> {
        let primary = CandleWindow::new(frame.primary)?;
        let confirmation = frame.confirmation.map(CandleWindow::new).transpose()?;

        let flow = self.flow.analyze(&primary)?;
        let as_of = primary.last_timestamp().unwrap_or_default();

        let input = DetectorInput {
            primary: &primary,
            confirmation: confirmation.as_ref(),
        };
        let mut events = Vec::new();
        for detector in &self.detectors {
            if let Some(event) = detector.detect(&input)? {
                events.push(event);
            }
        }

        Ok(PlatformMetrics {
            exchange: frame.exchange,
            as_of,
            flow,
            events,
        })
    }

    // -------------------------------------------------------------------------
    // Step 2: consensus
    // -------------------------------------------------------------------------

    pub fn get_market_consensus(&self, platforms: &PlatformMap) -> Consensus {
        let consensus = self.consensus_of(platforms);

        info!(
            consensus = %consensus.label,
            bullish = consensus.bullish,
            bearish = consensus.bearish,
            total = consensus.total,
            total_flow = format!("{:.2}", consensus.total_flow),
            trap = consensus.trap_suspected,
            "market consensus"
        );

        consensus
    }

    fn consensus_of(&self, platforms: &PlatformMap) -> Consensus {
        if platforms.is_empty() {
            return Consensus::empty();
        }

        let p = &self.consensus;
        let total = platforms.len();
        let bullish = platforms
            .values()
            .filter(|m| m.flow.net_flow > p.flow_deadband)
            .count();
        let bearish = platforms
            .values()
            .filter(|m| m.flow.net_flow < -p.flow_deadband)
            .count();
        let total_flow = sorted_sum(platforms.values().map(|m| m.flow.net_flow));
        let agreeing = bullish.max(bearish);

        let strong = agreeing as f64 / total as f64 >= p.strong_fraction
            && agreeing >= p.min_exchanges;
        let majority = agreeing * 2 > total;

        let mut label = if bullish > bearish {
            if strong {
                ConsensusLabel::StrongBullish
            } else if majority {
                ConsensusLabel::Bullish
            } else {
                ConsensusLabel::Neutral
            }
        } else if bearish > bullish {
            if strong {
                ConsensusLabel::StrongBearish
            } else if majority {
                ConsensusLabel::Bearish
            } else {
                ConsensusLabel::Neutral
            }
        } else {
            ConsensusLabel::Neutral
        };

        let mut trap_suspected = false;
        if label.direction() == Some(Direction::Long) && bullish < p.min_exchanges {
            label = ConsensusLabel::Neutral;
            trap_suspected = true;
        }
        if bullish > 0 && bearish > 0 && bullish < bearish {
            trap_suspected = true;
        }

        Consensus {
            label,
            agreeing,
            total,
            bullish,
            bearish,
            total_flow,
            trap_suspected,
        }
    }

    // -------------------------------------------------------------------------
    // Step 3: graded signals
    // -------------------------------------------------------------------------

    /// Score every candidate for `symbol`. `as_of` is the data timestamp
    /// stamped on each signal.
    pub fn analyze_signals(&self, platforms: &PlatformMap, symbol: &str, as_of: i64) -> Vec<Signal> {
        if platforms.is_empty() {
            return Vec::new();
        }

        let consensus = self.consensus_of(platforms);
        let total_net_flow = consensus.total_flow;

        // (kind, direction) -> supporting events, keyed deterministically.
        let mut candidates: BTreeMap<(SignalKind, Direction), Vec<(&str, &DetectionEvent)>> =
            BTreeMap::new();
        for (exchange, metrics) in platforms {
            for event in &metrics.events {
                candidates
                    .entry((event.kind, event.direction))
                    .or_default()
                    .push((exchange.as_str(), event));
            }
        }

        let mut signals = Vec::with_capacity(candidates.len() + 1);

        for ((kind, direction), support) in candidates {
            let mut exchanges: Vec<String> = support.iter().map(|(ex, _)| ex.to_string()).collect();
            exchanges.sort();
            exchanges.dedup();

            let snapshot = SignalSnapshot {
                price: median(support.iter().map(|(_, e)| e.price)),
                atr: median(support.iter().map(|(_, e)| e.atr)),
                total_net_flow,
                magnitude: support
                    .iter()
                    .map(|(_, e)| e.magnitude_pct)
                    .fold(0.0, f64::max),
                slope: median_opt(support.iter().filter_map(|(_, e)| e.slope)),
                anchor: median_opt(support.iter().filter_map(|(_, e)| e.anchor)),
            };

            signals.push(self.grade(
                symbol,
                as_of,
                kind,
                direction,
                consensus.label.alignment(direction),
                exchanges,
                self.ratios_aligned(platforms, direction),
                consensus.trap_suspected,
                snapshot,
            ));
        }

        if let Some(direction) = consensus.label.direction() {
            let mut exchanges: Vec<String> = platforms
                .iter()
                .filter(|(_, m)| m.flow.net_flow * direction.sign() > self.consensus.flow_deadband)
                .map(|(ex, _)| ex.clone())
                .collect();
            exchanges.sort();

            let supporting: Vec<&PlatformMetrics> =
                exchanges.iter().filter_map(|ex| platforms.get(ex)).collect();
            let snapshot = SignalSnapshot {
                price: median(supporting.iter().map(|m| m.flow.current_price)),
                atr: median(supporting.iter().map(|m| m.flow.atr)),
                total_net_flow,
                magnitude: consensus.agreeing as f64 / consensus.total as f64 * 100.0,
                slope: None,
                anchor: None,
            };

            signals.push(self.grade(
                symbol,
                as_of,
                SignalKind::Consensus,
                direction,
                consensus.label.alignment(direction),
                exchanges,
                self.ratios_aligned(platforms, direction),
                consensus.trap_suspected,
                snapshot,
            ));
        }

        signals.sort_by(|a, b| {
            b.grade
                .cmp(&a.grade)
                .then(b.score.cmp(&a.score))
                .then(a.kind.cmp(&b.kind))
                .then(a.direction.cmp(&b.direction))
        });

        signals
    }

    #[allow(clippy::too_many_arguments)]
    fn grade(
        &self,
        symbol: &str,
        as_of: i64,
        kind: SignalKind,
        direction: Direction,
        alignment: ConsensusAlignment,
        exchanges: Vec<String>,
        ratios_aligned: bool,
        trap_suspected: bool,
        snapshot: SignalSnapshot,
    ) -> Signal {
        let breakdown = weighted_score::score(
            &self.scoring.weights,
            &ScoreInputs {
                kind,
                direction,
                alignment,
                supporting_exchanges: exchanges.len(),
                ratios_aligned,
                trap_suspected,
            },
        );
        let grade = self.scoring.cutoffs.grade(breakdown.total);

        debug!(
            symbol,
            kind = %kind,
            direction = %direction,
            score = breakdown.total,
            grade = %grade,
            exchanges = ?exchanges,
            "signal graded"
        );

        Signal {
            grade,
            kind,
            direction,
            symbol: symbol.to_string(),
            timestamp: as_of,
            score: breakdown.total,
            exchanges,
            breakdown,
            snapshot,
        }
    }

    /// Every reporting exchange shows one-sided flow in `direction`.
    fn ratios_aligned(&self, platforms: &PlatformMap, direction: Direction) -> bool {
        let strong = self.scoring.strong_ratio;
        !platforms.is_empty()
            && platforms.values().all(|m| match direction {
                Direction::Long => m.flow.buy_sell_ratio.is_buy_dominant(strong),
                Direction::Short => m.flow.buy_sell_ratio.is_sell_dominant(strong),
            })
    }
}

// =============================================================================
// Order-independent aggregates
// =============================================================================

fn sorted(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.collect();
    v.sort_by(f64::total_cmp);
    v
}

/// Sum in sorted order so the result is identical for any input order.
fn sorted_sum(values: impl Iterator<Item = f64>) -> f64 {
    sorted(values).iter().sum()
}

/// Median (mean of the middle pair for even counts); 0 when empty.
fn median(values: impl Iterator<Item = f64>) -> f64 {
    median_opt(values).unwrap_or(0.0)
}

fn median_opt(values: impl Iterator<Item = f64>) -> Option<f64> {
    let v = sorted(values);
    let n = v.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(v[n / 2]),
        _ => Some((v[n / 2 - 1] + v[n / 2]) / 2.0),
    }
}
