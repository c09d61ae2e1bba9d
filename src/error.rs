// =============================================================================
// Engine error taxonomy
// =============================================================================
//
// Hard conditions (`UnsupportedGranularity`, `DataUnavailable`) propagate to
// the `analyze` boundary and fail the whole assessment. `InsufficientDataPoints`
// is soft: the indicator layer absorbs it into a defined fallback value.
// `SeriesNotPopulated` signals a caller-sequencing bug, never a data problem.
// `InvalidPeriod` rejects an anchor outside the representable UTC range before
// any window arithmetic or upstream I/O happens.
// =============================================================================

use thiserror::Error;

/// Errors produced by the analysis engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// A bar-duration identifier outside the supported set.
    #[error("unsupported granularity: {0}")]
    UnsupportedGranularity(String),

    /// Upstream returned no usable data for a window the caller needs.
    #[error("{what} data unavailable for {symbol}")]
    DataUnavailable { what: &'static str, symbol: String },

    /// Too few valid points for a computation; callers fall back to a default.
    #[error("insufficient data points: need {needed}, got {got}")]
    InsufficientDataPoints { needed: usize, got: usize },

    /// A dependent step ran before the series it reads was fetched.
    #[error("{what} series was never populated")]
    SeriesNotPopulated { what: &'static str },

    /// The anchor (epoch ms) cannot be represented as a UTC instant with room
    /// for the analysis windows around it.
    #[error("period {0} is out of range")]
    InvalidPeriod(i64),
}

impl AnalysisError {
    pub fn unavailable(what: &'static str, symbol: impl Into<String>) -> Self {
        Self::DataUnavailable {
            what,
            symbol: symbol.into(),
        }
    }

    /// `true` for conditions that must fail the whole assessment.
    pub fn is_hard(&self) -> bool {
        !matches!(self, Self::InsufficientDataPoints { .. })
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_points_is_soft() {
        let err = AnalysisError::InsufficientDataPoints { needed: 2, got: 1 };
        assert!(!err.is_hard());
        assert!(AnalysisError::unavailable("8h variation", "BTCUSDT").is_hard());
        assert!(AnalysisError::SeriesNotPopulated { what: "10m" }.is_hard());
        assert!(AnalysisError::InvalidPeriod(i64::MAX).is_hard());
    }

    #[test]
    fn display_names_symbol() {
        let err = AnalysisError::unavailable("average volume", "DOGEUSDT");
        assert_eq!(err.to_string(), "average volume data unavailable for DOGEUSDT");
    }
}
