// =============================================================================
// Signals Module
// =============================================================================
//
// Graded signal records emitted by the aggregator:
// - Grade / SignalKind / Signal record types
// - Fixed point-scoring table and grade cutoffs (weighted_score)

pub mod weighted_score;

use serde::{Deserialize, Serialize};

use crate::types::Direction;

pub use weighted_score::{GradeCutoffs, ScoreBreakdown, ScoreWeights};

/// Tiered confidence label. Ordering follows strength: `C < B+ < A < A+`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "C")]
    C,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A+")]
    APlus,
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::C => write!(f, "C"),
            Self::BPlus => write!(f, "B+"),
            Self::A => write!(f, "A"),
            Self::APlus => write!(f, "A+"),
        }
    }
}

/// What produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    EarlyPump,
    SteadyGrowth,
    PanicDump,
    VolumeSpike,
    Consensus,
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EarlyPump => write!(f, "EARLY_PUMP"),
            Self::SteadyGrowth => write!(f, "STEADY_GROWTH"),
            Self::PanicDump => write!(f, "PANIC_DUMP"),
            Self::VolumeSpike => write!(f, "VOLUME_SPIKE"),
            Self::Consensus => write!(f, "CONSENSUS"),
        }
    }
}

/// Metrics captured at the moment a signal was graded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    /// Median last price across the supporting exchanges.
    pub price: f64,
    /// Median ATR across the supporting exchanges.
    pub atr: f64,
    /// Net taker flow summed over every reporting exchange.
    pub total_net_flow: f64,
    /// Largest event magnitude (% move or volume multiple) among supporters.
    pub magnitude: f64,
    /// Trend slope reported by a steady-growth detection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slope: Option<f64>,
    /// Moving average used as a trend-following stop anchor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<f64>,
}

/// A graded signal for one symbol. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub grade: Grade,
    pub kind: SignalKind,
    pub direction: Direction,
    pub symbol: String,
    /// Data timestamp (ms) of the cycle that produced the signal.
    pub timestamp: i64,
    pub score: i32,
    /// Supporting exchanges, sorted by name.
    pub exchanges: Vec<String>,
    pub breakdown: ScoreBreakdown,
    pub snapshot: SignalSnapshot,
}
