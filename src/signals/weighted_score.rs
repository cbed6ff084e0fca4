// =============================================================================
// Point Scorer — fixed weight table and grade cutoffs
// =============================================================================
//
// Every contributing condition adds a fixed number of points taken from
// `ScoreWeights`. The total maps to a grade through `GradeCutoffs`. Both
// tables are plain data so they can be loaded from config and tested in
// isolation; nothing here is learned or adjusted at runtime.

use serde::{Deserialize, Serialize};

use super::{Grade, SignalKind};
use crate::types::Direction;

/// How the cross-exchange consensus relates to a candidate signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusAlignment {
    /// Strong consensus in the signal's direction.
    Strong,
    /// Simple-majority consensus in the signal's direction.
    Simple,
    /// Neutral consensus.
    Neutral,
    /// Consensus points the other way.
    Opposing,
}

/// Point values for each scoring condition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub early_pump: i32,
    pub panic_dump: i32,
    pub steady_growth: i32,
    pub volume_spike: i32,
    pub consensus: i32,
    pub strong_consensus: i32,
    pub simple_consensus: i32,
    pub opposing_consensus: i32,
    pub per_extra_exchange: i32,
    pub max_extra_exchanges: usize,
    pub flow_ratio_alignment: i32,
    /// Applied to long candidates when bullish flow looks like a trap.
    pub trap_penalty: i32,
}

impl ScoreWeights {
    pub const DEFAULT: Self = Self {
        early_pump: 45,
        panic_dump: 45,
        steady_growth: 40,
        volume_spike: 30,
        consensus: 25,
        strong_consensus: 30,
        simple_consensus: 15,
        opposing_consensus: -25,
        per_extra_exchange: 10,
        max_extra_exchanges: 2,
        flow_ratio_alignment: 10,
        trap_penalty: -30,
    };

    /// Base points for a signal kind.
    pub fn base(&self, kind: SignalKind) -> i32 {
        match kind {
            SignalKind::EarlyPump => self.early_pump,
            SignalKind::PanicDump => self.panic_dump,
            SignalKind::SteadyGrowth => self.steady_growth,
            SignalKind::VolumeSpike => self.volume_spike,
            SignalKind::Consensus => self.consensus,
        }
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Minimum scores for each grade. Anything below `b_plus` is a C.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeCutoffs {
    pub a_plus: i32,
    pub a: i32,
    pub b_plus: i32,
}

impl GradeCutoffs {
    pub const DEFAULT: Self = Self {
        a_plus: 85,
        a: 70,
        b_plus: 55,
    };

    pub fn grade(&self, score: i32) -> Grade {
        if score >= self.a_plus {
            Grade::APlus
        } else if score >= self.a {
            Grade::A
        } else if score >= self.b_plus {
            Grade::BPlus
        } else {
            Grade::C
        }
    }
}

impl Default for GradeCutoffs {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Facts about one candidate signal that the scorer turns into points.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs {
    pub kind: SignalKind,
    pub direction: Direction,
    pub alignment: ConsensusAlignment,
    /// Number of exchanges that support the candidate (at least 1).
    pub supporting_exchanges: usize,
    /// Every reporting exchange's buy/sell ratio points the signal's way.
    pub ratios_aligned: bool,
    /// Bullish flow came from a single exchange or a minority.
    pub trap_suspected: bool,
}

/// Points awarded by a single condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub name: String,
    pub points: i32,
}

/// Total score plus the conditions that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub total: i32,
    pub contributions: Vec<Contribution>,
}

impl ScoreBreakdown {
    fn push(&mut self, name: &str, points: i32) {
        if points != 0 {
            self.total += points;
            self.contributions.push(Contribution {
                name: name.to_string(),
                points,
            });
        }
    }
}

/// Apply the weight table to one candidate.
pub fn score(weights: &ScoreWeights, inputs: &ScoreInputs) -> ScoreBreakdown {
    let mut breakdown = ScoreBreakdown {
        total: 0,
        contributions: Vec::new(),
    };

    breakdown.push("base", weights.base(inputs.kind));

    let consensus_points = match inputs.alignment {
        ConsensusAlignment::Strong => weights.strong_consensus,
        ConsensusAlignment::Simple => weights.simple_consensus,
        ConsensusAlignment::Neutral => 0,
        ConsensusAlignment::Opposing => weights.opposing_consensus,
    };
    breakdown.push("consensus", consensus_points);

    let extra = inputs
        .supporting_exchanges
        .saturating_sub(1)
        .min(weights.max_extra_exchanges);
    breakdown.push("cross_exchange", weights.per_extra_exchange * extra as i32);

    if inputs.ratios_aligned {
        breakdown.push("flow_ratio", weights.flow_ratio_alignment);
    }

    if inputs.trap_suspected && inputs.direction == Direction::Long {
        breakdown.push("trap", weights.trap_penalty);
    }

    breakdown
}
