// =============================================================================
// Price variation since the anchor period
// =============================================================================
//
// Short horizon (10 minutes of 1m bars):
//   (open_first - min_low) / min_low              as a ratio
// Medium horizon (8 hours of 1H bars, 4H fallback):
//   (open_first - close_last) / close_last * 100  as a percentage
// =============================================================================

use tracing::debug;

use super::IndicatorResult;
use crate::error::{AnalysisError, AnalysisResult};
use crate::market_data::Series;

/// Drawdown from the first open to the lowest low of the window.
///
/// Rows with a non-numeric close are discarded first. Fewer than two
/// remaining rows yields `0.0` flagged as insufficient.
pub fn short_horizon_variation(series: &Series) -> IndicatorResult<f64> {
    let rows = series.with_valid_close();
    if rows.len() < 2 {
        debug!(
            symbol = %series.symbol,
            rows = rows.len(),
            "not enough points for short-horizon variation"
        );
        return IndicatorResult::insufficient(0.0);
    }

    let start_price = rows[0].open;
    let lowest = rows
        .iter()
        .map(|c| c.low)
        .filter(|l| l.is_finite())
        .fold(f64::INFINITY, f64::min);

    IndicatorResult::ready((start_price - lowest) / lowest)
}

/// Percentage move from the first open to the last close.
///
/// An empty series is a hard failure: the caller has already exhausted its
/// granularity fallback.
pub fn medium_horizon_variation(series: &Series) -> AnalysisResult<f64> {
    let (first, last) = match (series.first(), series.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            return Err(AnalysisError::unavailable(
                "medium-horizon variation",
                series.symbol.clone(),
            ))
        }
    };
    Ok((first.open - last.close) / last.close * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::Granularity;
    use crate::types::Candle;

    fn series(candles: Vec<Candle>) -> Series {
        Series::from_candles("BTCUSDT", Granularity::M1, 0, 600_000, candles)
    }

    fn bar(ts: i64, open: f64, low: f64, close: f64) -> Candle {
        Candle::new(ts, open, open.max(close), low, close, 1.0, close)
    }

    #[test]
    fn short_variation_uses_lowest_low() {
        let s = series(vec![
            bar(0, 100.0, 99.0, 99.5),
            bar(60_000, 99.5, 95.0, 96.0),
            bar(120_000, 96.0, 96.0, 98.0),
        ]);
        let r = short_horizon_variation(&s);
        assert!(r.sufficient);
        assert!((r.value - (100.0 - 95.0) / 95.0).abs() < 1e-12);
    }

    #[test]
    fn short_variation_single_point_is_zero() {
        let s = series(vec![bar(0, 100.0, 99.0, 99.5)]);
        let r = short_horizon_variation(&s);
        assert!(!r.sufficient);
        assert_eq!(r.value, 0.0);
    }

    #[test]
    fn short_variation_ignores_nan_close_rows() {
        let s = series(vec![
            bar(0, f64::NAN, 10.0, f64::NAN),
            bar(60_000, 100.0, 99.0, 99.5),
            bar(120_000, 99.0, 98.0, 98.5),
        ]);
        let r = short_horizon_variation(&s);
        assert!(r.sufficient);
        assert!((r.value - (100.0 - 98.0) / 98.0).abs() < 1e-12);
    }

    #[test]
    fn medium_variation_percentage() {
        let s = series(vec![bar(0, 110.0, 100.0, 105.0), bar(3_600_000, 105.0, 99.0, 100.0)]);
        let v = medium_horizon_variation(&s).unwrap();
        assert!((v - 10.0).abs() < 1e-12);
    }

    #[test]
    fn medium_variation_empty_is_unavailable() {
        let err = medium_horizon_variation(&series(Vec::new())).unwrap_err();
        assert!(matches!(err, AnalysisError::DataUnavailable { .. }));
    }
}
