// =============================================================================
// Candle Series — ordered bars for one symbol, granularity and window
// =============================================================================
//
// Written only by the fetcher while it walks the chunk plan; every indicator
// reads it through the accessors below.
// =============================================================================

use serde::Serialize;

use crate::market_data::Granularity;
use crate::types::Candle;

/// Ordered candles for one `(symbol, granularity, window)` triple.
///
/// Built by the fetcher batch by batch and read-only afterwards. Derived
/// columns (price change, moving averages, log returns) are computed into
/// separate vectors by the indicators rather than stored here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub symbol: String,
    pub granularity: Granularity,
    pub start_ms: i64,
    pub end_ms: i64,
    candles: Vec<Candle>,
}

impl Series {
    pub fn new(symbol: impl Into<String>, granularity: Granularity, start_ms: i64, end_ms: i64) -> Self {
        Self {
            symbol: symbol.into(),
            granularity,
            start_ms,
            end_ms,
            candles: Vec::new(),
        }
    }

    /// Build a series directly from candles.
    #[cfg(test)]
    pub fn from_candles(
        symbol: impl Into<String>,
        granularity: Granularity,
        start_ms: i64,
        end_ms: i64,
        candles: Vec<Candle>,
    ) -> Self {
        Self {
            candles,
            ..Self::new(symbol, granularity, start_ms, end_ms)
        }
    }

    /// Append one upstream batch in arrival order.
    pub(crate) fn extend_batch(&mut self, batch: Vec<Candle>) {
        self.candles.extend(batch);
    }

    #[cfg(test)]
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Close prices of candles whose close is a finite number.
    pub fn valid_closes(&self) -> Vec<f64> {
        self.candles
            .iter()
            .map(|c| c.close)
            .filter(|c| c.is_finite())
            .collect()
    }

    /// Candles whose close is a finite number, in order.
    pub fn with_valid_close(&self) -> Vec<&Candle> {
        self.candles.iter().filter(|c| c.close.is_finite()).collect()
    }

    /// Volumes that are finite numbers.
    pub fn valid_volumes(&self) -> Vec<f64> {
        self.candles
            .iter()
            .map(|c| c.volume)
            .filter(|v| v.is_finite())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, close: f64, volume: f64) -> Candle {
        Candle::new(ts, close, close, close, close, volume, close * volume)
    }

    #[test]
    fn valid_columns_skip_nan() {
        let series = Series::from_candles(
            "BTCUSDT",
            Granularity::M1,
            0,
            180_000,
            vec![
                candle(0, 100.0, 5.0),
                candle(60_000, f64::NAN, f64::NAN),
                candle(120_000, 102.0, 7.0),
            ],
        );
        assert_eq!(series.len(), 3);
        assert_eq!(series.valid_closes(), vec![100.0, 102.0]);
        assert_eq!(series.valid_volumes(), vec![5.0, 7.0]);
        assert_eq!(series.with_valid_close().len(), 2);
    }

    #[test]
    fn batches_append_in_order() {
        let mut series = Series::new("ETHUSDT", Granularity::H1, 0, 0);
        assert!(series.is_empty());
        series.extend_batch(vec![candle(0, 1.0, 1.0)]);
        series.extend_batch(vec![candle(3_600_000, 2.0, 1.0)]);
        assert_eq!(series.first().map(|c| c.close), Some(1.0));
        assert_eq!(series.last().map(|c| c.close), Some(2.0));
    }
}
