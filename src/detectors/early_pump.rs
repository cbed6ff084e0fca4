// =============================================================================
// Early Pump Detector
// =============================================================================
//
// Catches the first leg of an aggressive up-move on the short timeframe:
// a price jump larger than twice the ATR, carried by a volume burst that is
// mostly aggressive buying, while the longer timeframe already trades above
// its MA20.

use super::impulse::detect_impulse;
use super::{undersized_as_none, DetectionEvent, DetectorInput, SignalDetector};
use crate::config::ImpulseParams;
use crate::error::EngineResult;
use crate::signals::SignalKind;
use crate::types::Direction;

#[derive(Debug, Clone)]
pub struct EarlyPumpDetector {
    params: ImpulseParams,
}

impl EarlyPumpDetector {
    pub fn new(params: ImpulseParams) -> Self {
        Self { params }
    }
}

impl Default for EarlyPumpDetector {
    fn default() -> Self {
        Self::new(ImpulseParams::default())
    }
}

impl SignalDetector for EarlyPumpDetector {
    fn kind(&self) -> SignalKind {
        SignalKind::EarlyPump
    }

    fn detect(&self, input: &DetectorInput<'_>) -> EngineResult<Option<DetectionEvent>> {
        undersized_as_none(detect_impulse(
            &self.params,
            SignalKind::EarlyPump,
            Direction::Long,
            input,
        ))
    }
}
