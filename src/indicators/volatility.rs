// =============================================================================
// Volatility index — annualised std of log returns
// =============================================================================
//
//   r_t   = ln(close_t / close_{t-1})        (non-positive closes dropped)
//   sigma = sample_std(r)
//   index = sigma * sqrt(bars_per_year) * 100
//
// bars_per_year is 252 trading days expressed in bars of the series'
// granularity (252 * 1440 for 1m bars).
// =============================================================================

use tracing::{debug, warn};

use super::stats::{log_returns, sample_std};
use super::IndicatorResult;
use crate::error::{AnalysisError, AnalysisResult};
use crate::market_data::Series;

/// Compute the volatility index over the short-horizon series.
///
/// `short_series` is `None` when the step that owns it never ran; that is a
/// sequencing error and fails with [`AnalysisError::SeriesNotPopulated`].
/// Fewer than two log returns yields an unavailable (`None`) index.
pub fn volatility_index(short_series: Option<&Series>) -> AnalysisResult<IndicatorResult<Option<f64>>> {
    let series = short_series.ok_or(AnalysisError::SeriesNotPopulated {
        what: "short-horizon",
    })?;

    let returns = log_returns(&series.valid_closes());
    let sigma = match sample_std(&returns) {
        Ok(sigma) => sigma,
        Err(e) => {
            debug!(symbol = %series.symbol, error = %e, "volatility index unavailable");
            return Ok(IndicatorResult::insufficient(None));
        }
    };

    let index = sigma * series.granularity.bars_per_year().sqrt() * 100.0;
    if !index.is_finite() {
        warn!(symbol = %series.symbol, "volatility index is not finite");
        return Ok(IndicatorResult::insufficient(None));
    }

    Ok(IndicatorResult::ready(Some(index)))
}
