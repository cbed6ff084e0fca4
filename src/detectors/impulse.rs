// Shared rule for the two impulse detectors. A pump and a dump are the same
// pattern seen from opposite sides:
//
//   move      = close[n-1] - close[n-1-lookback]        (signed by direction)
//   threshold = ATR(period) * atr_multiplier
//   fires when  move > threshold
//           and last volume >= volume_factor * mean(previous volume_history)
//           and aggressor share of the last candle >= min_taker_share
//           and the confirmation close is on the right side of its SMA

use tracing::debug;

use super::{mean, DetectionEvent, DetectorInput};
use crate::config::ImpulseParams;
use crate::error::EngineResult;
use crate::indicators::{calculate_atr, sma};
use crate::signals::SignalKind;
use crate::types::Direction;

pub(super) fn detect_impulse(
    params: &ImpulseParams,
    kind: SignalKind,
    direction: Direction,
    input: &DetectorInput<'_>,
) -> EngineResult<Option<DetectionEvent>> {
    let primary = input.primary;
    let need = (params.lookback + 1)
        .max(params.atr_period + 1)
        .max(params.volume_history + 1);
    primary.require("impulse detector", need)?;

    let candles = primary.candles();
    let n = candles.len();
    let last = &candles[n - 1];
    let base = &candles[n - 1 - params.lookback];

    // --- Step 1: price move vs ATR threshold ---------------------------------
    let atr = calculate_atr(candles, params.atr_period)?;
    let threshold = atr * params.atr_multiplier;
    let signed_move = (last.close - base.close) * direction.sign();
    if threshold <= 0.0 || signed_move <= threshold || base.close <= 0.0 {
        return Ok(None);
    }

    // --- Step 2: volume burst -------------------------------------------------
    let history = &candles[n - 1 - params.volume_history..n - 1];
    let avg_volume = mean(history.iter().map(|c| c.volume)).unwrap_or(0.0);
    if avg_volume <= 0.0 {
        return Ok(None);
    }
    let volume_ratio = last.volume / avg_volume;
    if volume_ratio < params.volume_factor {
        return Ok(None);
    }

    // --- Step 3: aggressor share ---------------------------------------------
    if last.volume <= 0.0 {
        return Ok(None);
    }
    let taker_share = match direction {
        Direction::Long => last.taker_buy_volume / last.volume,
        Direction::Short => last.taker_sell_volume() / last.volume,
    };
    if taker_share < params.min_taker_share {
        return Ok(None);
    }

    // --- Step 4: longer-timeframe resonance -----------------------------------
    let Some(confirmation) = input.confirmation else {
        return Ok(None);
    };
    let confirm_closes = confirmation.closes();
    let confirm_ma = sma(&confirm_closes, params.confirm_ma_period)?;
    let confirm_close = confirm_closes[confirm_closes.len() - 1];
    let resonant = match direction {
        Direction::Long => confirm_close > confirm_ma,
        Direction::Short => confirm_close < confirm_ma,
    };
    if !resonant {
        debug!(
            kind = %kind,
            confirm_close,
            confirm_ma = format!("{:.4}", confirm_ma),
            "impulse rejected by confirmation timeframe"
        );
        return Ok(None);
    }

    let event = DetectionEvent {
        kind,
        direction,
        timestamp: last.timestamp,
        price: last.close,
        atr,
        magnitude_pct: signed_move / base.close * 100.0,
        threshold_pct: threshold / base.close * 100.0,
        volume_ratio,
        taker_share,
        slope: None,
        anchor: None,
    };

    debug!(
        kind = %kind,
        direction = %direction,
        move_pct = format!("{:.3}", event.magnitude_pct),
        threshold_pct = format!("{:.3}", event.threshold_pct),
        volume_ratio = format!("{:.2}", volume_ratio),
        taker_share = format!("{:.2}", taker_share),
        "impulse detected"
    );

    Ok(Some(event))
}
