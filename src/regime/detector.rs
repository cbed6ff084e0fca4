// =============================================================================
// Market Regime Detector
// =============================================================================
//
// Classifies the reference asset (BTC on 1H by default) with two moving
// averages and the slope of the shorter one:
//
//   BULL    — price > MA20 > MA60 and MA20 not falling
//   BEAR    — price < MA20 < MA60 and MA20 not rising
//   NEUTRAL — anything else (description notes the lean vs MA60)
//
// The result is cached for `ttl_secs`. While the cached value is fresh it is
// returned unchanged; afterwards (or on a forced refresh) it is recomputed and
// the version counter is bumped. An empty reference window (failed fetch)
// yields NEUTRAL without touching the cache, so the next cycle retries.
//
// Gate:
//   BULL    permits LONG only
//   BEAR    permits SHORT only
//   NEUTRAL permits nothing
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::{RegimeParams, MAX_REGIME_TTL_SECS};
use crate::error::EngineResult;
use crate::indicators::{sma, trend};
use crate::market_data::CandleWindow;
use crate::types::{Direction, Trend};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegimeLabel {
    Bull,
    Bear,
    Neutral,
}

impl RegimeLabel {
    /// Whether a signal pointing `direction` may become an entry.
    pub fn permits(self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (Self::Bull, Direction::Long) | (Self::Bear, Direction::Short)
        )
    }
}

impl std::fmt::Display for RegimeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bull => write!(f, "BULL"),
            Self::Bear => write!(f, "BEAR"),
            Self::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// A classified regime plus the readings that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regime {
    pub label: RegimeLabel,
    pub description: String,
    pub computed_at: DateTime<Utc>,
    /// Last reference close (0 when the window was empty).
    pub reference_price: f64,
    pub ma_short: Option<f64>,
    pub ma_long: Option<f64>,
}

impl Regime {
    /// Fresh iff `0 <= now - computed_at < ttl`. A negative age (clock moved
    /// backwards) is stale.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let age = now.signed_duration_since(self.computed_at);
        age >= Duration::zero() && age < ttl
    }
}

// =============================================================================
// MarketRegimeDetector
// =============================================================================

/// Thread-safe regime detector that caches the latest regime.
///
/// Designed to be wrapped in an `Arc` and shared across concurrent cycles.
/// Concurrent recomputation is harmless: the last writer wins.
pub struct MarketRegimeDetector {
    params: RegimeParams,
    cached: RwLock<Option<Regime>>,
    version: AtomicU64,
}

impl MarketRegimeDetector {
    pub fn new(params: RegimeParams) -> Self {
        Self {
            params,
            cached: RwLock::new(None),
            version: AtomicU64::new(0),
        }
    }

    /// Regime for the current wall-clock time.
    pub fn analyze(&self, reference: &CandleWindow, force_refresh: bool) -> Regime {
        self.analyze_at(reference, force_refresh, Utc::now())
    }

    /// Regime as of `now`. Returns the cached value unchanged while it is
    /// fresh, unless `force_refresh` is set.
    pub fn analyze_at(
        &self,
        reference: &CandleWindow,
        force_refresh: bool,
        now: DateTime<Utc>,
    ) -> Regime {
        let ttl = Duration::seconds(self.params.ttl_secs.clamp(0, MAX_REGIME_TTL_SECS));

        if !force_refresh {
            if let Some(regime) = self.cached.read().as_ref() {
                if regime.is_fresh(now, ttl) {
                    trace!(regime = %regime.label, "regime cache hit");
                    return regime.clone();
                }
            }
        }

        if reference.is_empty() {
            warn!("no reference candles, regime NEUTRAL until the next cycle");
            return Regime {
                label: RegimeLabel::Neutral,
                description: "no reference data".to_string(),
                computed_at: now,
                reference_price: 0.0,
                ma_short: None,
                ma_long: None,
            };
        }

        let regime = match self.classify(reference, now) {
            Ok(regime) => regime,
            Err(e) => {
                warn!(error = %e, "regime classification failed, falling back to NEUTRAL");
                Regime {
                    label: RegimeLabel::Neutral,
                    description: format!("regime unavailable: {e}"),
                    computed_at: now,
                    reference_price: reference.last().map(|c| c.close).unwrap_or(0.0),
                    ma_short: None,
                    ma_long: None,
                }
            }
        };

        *self.cached.write() = Some(regime.clone());
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;

        debug!(
            regime = %regime.label,
            description = %regime.description,
            price = regime.reference_price,
            version,
            forced = force_refresh,
            "regime recomputed"
        );

        regime
    }

    /// The cached regime, if any, without recomputing.
    pub fn current(&self) -> Option<Regime> {
        self.cached.read().clone()
    }

    /// Number of recomputations so far.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn classify(&self, reference: &CandleWindow, now: DateTime<Utc>) -> EngineResult<Regime> {
        let p = &self.params;
        let need = p.ma_long + p.slope_points;
        let reference_price = reference.last().map(|c| c.close).unwrap_or(0.0);

        if reference.len() < need {
            return Ok(Regime {
                label: RegimeLabel::Neutral,
                description: format!(
                    "insufficient reference data ({} of {} candles)",
                    reference.len(),
                    need
                ),
                computed_at: now,
                reference_price,
                ma_short: None,
                ma_long: None,
            });
        }

        let closes = reference.closes();
        let ma_short = sma(&closes, p.ma_short)?;
        let ma_long = sma(&closes, p.ma_long)?;
        let short_trend = trend(&closes, p.ma_short, p.slope_points)?;
        let price = reference_price;

        let (short, long) = (p.ma_short, p.ma_long);
        let (label, description) =
            if price > ma_short && ma_short > ma_long && short_trend != Trend::Falling {
                (
                    RegimeLabel::Bull,
                    format!("price above MA{short} above MA{long}, MA{short} {short_trend}"),
                )
            } else if price < ma_short && ma_short < ma_long && short_trend != Trend::Rising {
                (
                    RegimeLabel::Bear,
                    format!("price below MA{short} below MA{long}, MA{short} {short_trend}"),
                )
            } else if price > ma_long {
                (
                    RegimeLabel::Neutral,
                    format!("mixed averages, bullish lean (price above MA{})", p.ma_long),
                )
            } else {
                (
                    RegimeLabel::Neutral,
                    format!("mixed averages, bearish lean (price at or below MA{})", p.ma_long),
                )
            };

        Ok(Regime {
            label,
            description,
            computed_at: now,
            reference_price: price,
            ma_short: Some(ma_short),
            ma_long: Some(ma_long),
        })
    }
}

impl Default for MarketRegimeDetector {
    fn default() -> Self {
        Self::new(RegimeParams::default())
    }
}
