// =============================================================================
// Engine Errors
// =============================================================================
//
// Three failure classes flow through the decision pipeline:
//
//   InsufficientData — a window is too short for the requested indicator.
//                      Recoverable: callers treat it as "no signal".
//   Analysis         — malformed input (non-monotonic timestamps, non-finite
//                      prices). Isolated per exchange by the aggregator.
//   Configuration    — invalid risk / sizing / indicator parameters. Fatal for
//                      the step that raised it only.
// =============================================================================

/// Typed error for every fallible operation in the engine core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("insufficient data for {what}: have {have}, need {need}")]
    InsufficientData {
        what: &'static str,
        have: usize,
        need: usize,
    },

    #[error("analysis error: {reason}")]
    Analysis { reason: String },

    #[error("configuration error: {reason}")]
    Configuration { reason: String },
}

impl EngineError {
    pub fn insufficient(what: &'static str, have: usize, need: usize) -> Self {
        Self::InsufficientData { what, have, need }
    }

    pub fn analysis(reason: impl Into<String>) -> Self {
        Self::Analysis {
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// True for the recoverable "window too short" case.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
