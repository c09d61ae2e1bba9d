// =============================================================================
// Volume — average traded volume and change against a baseline
// =============================================================================
//
// Volume columns that did not parse are skipped. An empty series is a hard
// failure; a series with only non-numeric volumes yields `NaN`.
// =============================================================================

use super::stats::mean;
use crate::error::{AnalysisError, AnalysisResult};
use crate::market_data::Series;

/// Mean traded volume over the series, skipping non-numeric entries.
///
/// An empty series is a hard failure. A series whose volumes are all
/// non-numeric yields `NaN`, which the report later marks unavailable.
pub fn average_volume(series: &Series, what: &'static str) -> AnalysisResult<f64> {
    if series.is_empty() {
        return Err(AnalysisError::unavailable(what, series.symbol.clone()));
    }
    Ok(mean(&series.valid_volumes()).unwrap_or(f64::NAN))
}

/// Percentage change of `current` against a `baseline` volume.
pub fn volume_change_pct(current: f64, baseline: f64) -> f64 {
    (current - baseline) / baseline * 100.0
}
