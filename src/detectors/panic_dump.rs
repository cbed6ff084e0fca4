// =============================================================================
// Panic Dump Detector
// =============================================================================
//
// Mirror image of the early pump: a drop larger than twice the ATR on a
// sell-dominated volume burst, with the longer timeframe below its MA20.

use super::impulse::detect_impulse;
use super::{undersized_as_none, DetectionEvent, DetectorInput, SignalDetector};
use crate::config::ImpulseParams;
use crate::error::EngineResult;
use crate::signals::SignalKind;
use crate::types::Direction;

#[derive(Debug, Clone)]
pub struct PanicDumpDetector {
    params: ImpulseParams,
}

impl PanicDumpDetector {
    pub fn new(params: ImpulseParams) -> Self {
        Self { params }
    }
}

impl Default for PanicDumpDetector {
    fn default() -> Self {
        Self::new(ImpulseParams::default())
    }
}

impl SignalDetector for PanicDumpDetector {
    fn kind(&self) -> SignalKind {
        SignalKind::PanicDump
    }

    fn detect(&self, input: &DetectorInput<'_>) -> EngineResult<Option<DetectionEvent>> {
        undersized_as_none(detect_impulse(
            &self.params,
            SignalKind::PanicDump,
            Direction::Short,
            input,
        ))
    }
}
