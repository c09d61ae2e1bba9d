// =============================================================================
// Series statistics shared by the indicators
// =============================================================================
//
// Conventions follow the usual dataframe semantics:
//   - rolling mean is undefined until the window is full,
//   - standard deviation is the sample estimate (n - 1 denominator),
//   - percentage change is (x_t / x_{t-1} - 1) * 100.
// =============================================================================

use crate::error::{AnalysisError, AnalysisResult};

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Simple moving average of the last `window` values.
///
/// `None` when `window == 0` or fewer than `window` values exist.
pub fn sma_last(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    mean(&values[values.len() - window..])
}

/// Sample standard deviation.
pub fn sample_std(values: &[f64]) -> AnalysisResult<f64> {
    let n = values.len();
    if n < 2 {
        return Err(AnalysisError::InsufficientDataPoints { needed: 2, got: n });
    }
    let m = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    Ok(var.sqrt())
}

/// Percentage change between consecutive values.
pub fn pct_changes(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| (w[1] / w[0] - 1.0) * 100.0)
        .filter(|c| c.is_finite())
        .collect()
}

/// Natural-log returns between consecutive values; non-positive values are
/// dropped before pairing.
pub fn log_returns(values: &[f64]) -> Vec<f64> {
    let positive: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();
    positive.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}
