// =============================================================================
// Candle Fetcher — walk the chunk plan and concatenate upstream batches
// =============================================================================
//
// One request per chunk, strictly in chunk order. The walk ends early when:
//   - a batch comes back empty,
//   - the last candle of a batch reaches the requested end,
//   - the upstream call fails (transport error or non-2xx status).
// All three return whatever was accumulated; callers treat a short or empty
// series as the signal.
// =============================================================================

use std::sync::Arc;

use tracing::{debug, warn};

use crate::market_data::{chunk, Granularity, MarketDataProvider, Series};

/// Fetches complete candle series through a [`MarketDataProvider`].
#[derive(Clone)]
pub struct CandleFetcher {
    provider: Arc<dyn MarketDataProvider>,
    max_bars_per_call: i64,
}

impl CandleFetcher {
    pub fn new(provider: Arc<dyn MarketDataProvider>, max_bars_per_call: u32) -> Self {
        Self {
            provider,
            max_bars_per_call: i64::from(max_bars_per_call.max(1)),
        }
    }

    /// Fetch the `[start_ms, end_ms)` window at `granularity` as one series.
    pub async fn fetch_series(
        &self,
        symbol: &str,
        granularity: Granularity,
        start_ms: i64,
        end_ms: i64,
    ) -> Series {
        let mut series = Series::new(symbol, granularity, start_ms, end_ms);
        let chunks = chunk(start_ms, end_ms, granularity.as_millis(), self.max_bars_per_call);

        debug!(
            symbol,
            granularity = %granularity,
            chunks = chunks.len(),
            "fetching candle series"
        );

        for (i, c) in chunks.iter().enumerate() {
            let batch = match self
                .provider
                .fetch_candles(
                    symbol,
                    granularity,
                    c.start_ms,
                    c.end_ms,
                    self.max_bars_per_call as u32,
                )
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(
                        symbol,
                        granularity = %granularity,
                        chunk = i,
                        error = %e,
                        "candle request failed, keeping accumulated series"
                    );
                    break;
                }
            };

            if batch.is_empty() {
                debug!(symbol, granularity = %granularity, chunk = i, "empty batch, stopping");
                break;
            }

            let last_ts = batch.last().map(|c| c.timestamp_ms).unwrap_or(i64::MIN);
            series.extend_batch(batch);

            if last_ts >= end_ms {
                break;
            }
        }

        debug!(symbol, granularity = %granularity, candles = series.len(), "candle series fetched");
        series
    }
}

// =============================================================================
// Fine-to-coarse fallback
// =============================================================================

/// Ordered list of granularities to try until one yields a non-empty series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPlan {
    tiers: Vec<Granularity>,
}

impl FallbackPlan {
    /// Try only `primary`.
    pub fn single(primary: Granularity) -> Self {
        Self {
            tiers: vec![primary],
        }
    }

    /// Try `primary`, then the next coarser granularity once.
    pub fn fine_to_coarse(primary: Granularity) -> Self {
        let mut plan = Self::single(primary);
        if let Some(coarser) = primary.coarser() {
            plan.tiers.push(coarser);
        }
        plan
    }

    /// Fetch with each tier in turn; `None` when every tier came back empty.
    pub async fn fetch(
        &self,
        fetcher: &CandleFetcher,
        symbol: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Option<Series> {
        for (attempt, &granularity) in self.tiers.iter().enumerate() {
            let series = fetcher.fetch_series(symbol, granularity, start_ms, end_ms).await;
            if !series.is_empty() {
                return Some(series);
            }
            if attempt + 1 < self.tiers.len() {
                warn!(
                    symbol,
                    granularity = %granularity,
                    "empty series, retrying at coarser granularity"
                );
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::market_data::provider::fixture::FixtureProvider;
    use crate::types::{Candle, FundingEvent};

    const MIN: i64 = 60_000;

    fn fetcher(provider: FixtureProvider, max: u32) -> (CandleFetcher, Arc<FixtureProvider>) {
        let provider = Arc::new(provider);
        (CandleFetcher::new(provider.clone(), max), provider)
    }

    #[tokio::test]
    async fn concatenates_chunks_in_order() {
        let (f, p) = fetcher(
            FixtureProvider::new().with_generated(Granularity::M1, 0, 25 * MIN, |i| 100.0 + i as f64, 1.0),
            10,
        );
        let series = f.fetch_series("BTCUSDT", Granularity::M1, 0, 25 * MIN).await;

        assert_eq!(p.calls_for(Granularity::M1), 3);
        let ts: Vec<i64> = series.candles().iter().map(|c| c.timestamp_ms).collect();
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
        // Bars 10 and 21 fall on a chunk end and are cut by the page limit.
        assert_eq!(series.len(), 23);
    }

    #[tokio::test]
    async fn empty_batch_stops_walk() {
        let (f, p) = fetcher(
            FixtureProvider::new().with_generated(Granularity::M1, 0, 5 * MIN, |_| 1.0, 1.0),
            10,
        );
        let series = f.fetch_series("BTCUSDT", Granularity::M1, 0, 40 * MIN).await;
        assert_eq!(series.len(), 5);
        // First chunk returned data, second was empty, remaining two never sent.
        assert_eq!(p.calls_for(Granularity::M1), 2);
    }

    #[tokio::test]
    async fn upstream_failure_returns_accumulated() {
        let (f, p) = fetcher(FixtureProvider::new().failing_on(Granularity::M1), 10);
        let series = f.fetch_series("BTCUSDT", Granularity::M1, 0, 40 * MIN).await;
        assert!(series.is_empty());
        assert_eq!(p.calls_for(Granularity::M1), 1);
    }

    /// Returns a batch ending at the window end regardless of the chunk.
    struct OvershootProvider {
        window_end: i64,
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl MarketDataProvider for OvershootProvider {
        async fn fetch_candles(
            &self,
            _symbol: &str,
            _granularity: Granularity,
            start_ms: i64,
            _end_ms: i64,
            _limit: u32,
        ) -> Result<Vec<Candle>> {
            *self.calls.lock() += 1;
            Ok(vec![
                Candle::new(start_ms, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0),
                Candle::new(self.window_end, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0),
            ])
        }

        async fn fetch_funding_rate_history(&self, _: &str, _: u32, _: u32) -> Result<Vec<FundingEvent>> {
            Ok(Vec::new())
        }

        async fn fetch_current_funding_rate(&self, _: &str) -> Result<f64> {
            Ok(0.0)
        }
    }

    #[tokio::test]
    async fn batch_reaching_end_stops_walk() {
        let provider = Arc::new(OvershootProvider {
            window_end: 30 * MIN,
            calls: Mutex::new(0),
        });
        let f = CandleFetcher::new(provider.clone(), 10);
        let series = f.fetch_series("BTCUSDT", Granularity::M1, 0, 30 * MIN).await;
        assert_eq!(*provider.calls.lock(), 1);
        assert_eq!(series.len(), 2);
    }

    #[tokio::test]
    async fn refetch_is_identical() {
        let (f, _) = fetcher(
            FixtureProvider::new().with_generated(Granularity::M15, 0, 200 * 15 * MIN, |i| (i as f64).sin() + 50.0, 3.0),
            50,
        );
        let a = f.fetch_series("ETHUSDT", Granularity::M15, 0, 200 * 15 * MIN).await;
        let b = f.fetch_series("ETHUSDT", Granularity::M15, 0, 200 * 15 * MIN).await;
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }

    #[tokio::test]
    async fn fallback_retries_once_at_coarser() {
        let hour = Granularity::H1.as_millis();
        let (f, p) = fetcher(
            FixtureProvider::new().with_generated(Granularity::H4, 0, 8 * hour, |_| 10.0, 1.0),
            1000,
        );
        let plan = FallbackPlan::fine_to_coarse(Granularity::H1);
        assert_eq!(plan.tiers, vec![Granularity::H1, Granularity::H4]);

        let series = plan.fetch(&f, "DOGEUSDT", 0, 8 * hour).await.unwrap();
        assert_eq!(series.granularity, Granularity::H4);
        assert_eq!(p.calls_for(Granularity::H1), 1);
        assert_eq!(p.calls_for(Granularity::H4), 1);
    }

    #[tokio::test]
    async fn fallback_exhausted_is_none() {
        let (f, p) = fetcher(FixtureProvider::new(), 1000);
        let plan = FallbackPlan::fine_to_coarse(Granularity::H1);
        assert!(plan.fetch(&f, "DOGEUSDT", 0, 8 * 3_600_000).await.is_none());
        assert_eq!(p.calls.lock().len(), 2);
    }
}
