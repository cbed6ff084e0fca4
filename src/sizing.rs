// =============================================================================
// Position Sizer — fixed-fraction risk with volatility and exposure limits
// =============================================================================
//
//   risk_amount = balance * risk_pct / 100
//   size        = risk_amount / stop_distance
//
// Adjustments, applied in order:
//   1. Position cap      — open_positions >= max_positions  => size 0
//   2. High volatility   — size *= high_volatility_multiplier (0.5)
//   3. Notional cap      — size * entry <= max_notional (optional, cap_notional)
//
// Low volatility never increases size: the loss at the stop can never exceed
// risk_amount.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SizingParams;
use crate::error::{EngineError, EngineResult};
use crate::indicators::tier_for;
use crate::types::VolatilityTier;

/// The constraint that last reduced a position size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeLimit {
    /// Plain fixed-fraction size.
    Unconstrained,
    /// Open-position cap reached; size is zero.
    PositionCap,
    /// Halved for the HIGH volatility tier.
    VolatilityHaircut,
    /// Trimmed to the maximum notional exposure.
    NotionalCap,
}

impl std::fmt::Display for SizeLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unconstrained => write!(f, "UNCONSTRAINED"),
            Self::PositionCap => write!(f, "POSITION_CAP"),
            Self::VolatilityHaircut => write!(f, "VOLATILITY_HAIRCUT"),
            Self::NotionalCap => write!(f, "NOTIONAL_CAP"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSize {
    /// Quantity in base units.
    pub size: f64,
    /// Maximum loss allowed by the risk fraction.
    pub risk_amount: f64,
    pub stop_distance: f64,
    pub tier: VolatilityTier,
    pub limit: SizeLimit,
}

impl PositionSize {
    /// Loss incurred if the stop is hit.
    pub fn loss_at_stop(&self) -> f64 {
        self.size * self.stop_distance
    }
}

#[derive(Debug, Clone)]
pub struct PositionSizer {
    params: SizingParams,
}

impl PositionSizer {
    pub fn new(params: SizingParams) -> Self {
        Self { params }
    }

    pub fn max_positions(&self) -> u32 {
        self.params.max_positions
    }

    /// Volatility tier of `atr` relative to `price`, using the configured
    /// thresholds.
    pub fn tier(&self, atr: f64, price: f64) -> VolatilityTier {
        tier_for(
            atr,
            price,
            self.params.low_volatility_pct,
            self.params.high_volatility_pct,
        )
    }

    /// Fixed-fraction position size.
    ///
    /// # Errors
    /// `Configuration` when `stop_distance` is not a positive finite number,
    /// `balance` is not positive, or `risk_pct` is outside `(0, 100]`.
    pub fn compute_size(
        &self,
        balance: f64,
        risk_pct: f64,
        stop_distance: f64,
        tier: VolatilityTier,
        open_positions: u32,
    ) -> EngineResult<PositionSize> {
        if !stop_distance.is_finite() || stop_distance <= 0.0 {
            return Err(EngineError::configuration(format!(
                "stop distance must be positive, got {stop_distance}"
            )));
        }
        if !balance.is_finite() || balance <= 0.0 {
            return Err(EngineError::configuration(format!(
                "account balance must be positive, got {balance}"
            )));
        }
        if !(risk_pct > 0.0 && risk_pct <= 100.0) {
            return Err(EngineError::configuration(format!(
                "risk percentage must be within (0, 100], got {risk_pct}"
            )));
        }

        let risk_amount = balance * risk_pct / 100.0;

        if open_positions >= self.params.max_positions {
            debug!(
                open_positions,
                max_positions = self.params.max_positions,
                "position cap reached, size 0"
            );
            return Ok(PositionSize {
                size: 0.0,
                risk_amount,
                stop_distance,
                tier,
                limit: SizeLimit::PositionCap,
            });
        }

        let mut size = risk_amount / stop_distance;
        let mut limit = SizeLimit::Unconstrained;

        if tier == VolatilityTier::High {
            size *= self.params.high_volatility_multiplier;
            limit = SizeLimit::VolatilityHaircut;
        }

        debug!(
            balance,
            risk_pct,
            stop_distance,
            tier = %tier,
            size = format!("{:.6}", size),
            "position sized"
        );

        Ok(PositionSize {
            size,
            risk_amount,
            stop_distance,
            tier,
            limit,
        })
    }

    /// Trim `position` so that `size * entry` stays within `max_notional`.
    /// A no-op when no notional cap is configured.
    pub fn cap_notional(&self, position: PositionSize, entry: f64) -> PositionSize {
        let Some(max_notional) = self.params.max_notional else {
            return position;
        };
        if entry <= 0.0 || position.size * entry <= max_notional {
            return position;
        }

        let size = (max_notional / entry).max(0.0);
        debug!(
            requested = format!("{:.6}", position.size),
            capped = format!("{:.6}", size),
            max_notional,
            "position trimmed to notional cap"
        );

        PositionSize {
            size,
            limit: SizeLimit::NotionalCap,
            ..position
        }
    }
}

impl Default for PositionSizer {
    fn default() -> Self {
        Self::new(SizingParams::default())
    }
}
