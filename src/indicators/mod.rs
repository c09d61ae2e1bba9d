// =============================================================================
// Indicator Computations
// =============================================================================
//
// Pure functions over an already-fetched `Series`; the only side effect is
// logging. Soft data shortfalls come back as an `IndicatorResult` flagged
// insufficient with a defined fallback value; hard shortfalls are errors.
// =============================================================================

pub mod stats;
pub mod trend;
pub mod variation;
pub mod volatility;
pub mod volume;

use serde::Serialize;

/// An indicator value plus whether enough data backed it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorResult<T> {
    pub value: T,
    pub sufficient: bool,
}

impl<T> IndicatorResult<T> {
    pub fn ready(value: T) -> Self {
        Self {
            value,
            sufficient: true,
        }
    }

    /// A fallback value standing in for a computation that lacked data.
    pub fn insufficient(fallback: T) -> Self {
        Self {
            value: fallback,
            sufficient: false,
        }
    }
}
