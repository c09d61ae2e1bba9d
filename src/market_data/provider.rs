// =============================================================================
// Upstream market-data provider seam
// =============================================================================
//
// The engine only talks to upstream through this trait. `BitgetClient` is the
// production implementation; tests drive the engine with in-memory fixtures.
// =============================================================================

use anyhow::Result;
use async_trait::async_trait;

use crate::market_data::Granularity;
use crate::types::{Candle, FundingEvent};

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch at most `limit` candles in `[start_ms, end_ms]`, oldest first.
    async fn fetch_candles(
        &self,
        symbol: &str,
        granularity: Granularity,
        start_ms: i64,
        end_ms: i64,
        limit: u32,
    ) -> Result<Vec<Candle>>;

    /// Fetch one page (1-based) of historical funding settlements.
    async fn fetch_funding_rate_history(
        &self,
        symbol: &str,
        page_no: u32,
        page_size: u32,
    ) -> Result<Vec<FundingEvent>>;

    /// Current funding rate as a percentage.
    async fn fetch_current_funding_rate(&self, symbol: &str) -> Result<f64>;
}

#[cfg(test)]
pub mod fixture {
    //! In-memory provider serving candles from a static table.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::MarketDataProvider;
    use crate::market_data::Granularity;
    use crate::types::{Candle, FundingEvent};

    /// A recorded `fetch_candles` call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct CandleCall {
        pub symbol: String,
        pub granularity: Granularity,
        pub start_ms: i64,
        pub end_ms: i64,
    }

    #[derive(Default)]
    pub struct FixtureProvider {
        candles: HashMap<Granularity, Vec<Candle>>,
        failing: Vec<Granularity>,
        funding: Vec<FundingEvent>,
        funding_fails: bool,
        pub calls: Mutex<Vec<CandleCall>>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl FixtureProvider {
        pub fn new() -> Self {
            Self::default()
        }

        /// Serve `candles` (sorted by timestamp) for `granularity`.
        pub fn with_candles(mut self, granularity: Granularity, candles: Vec<Candle>) -> Self {
            self.candles.insert(granularity, candles);
            self
        }

        /// Generate a flat-ish series over `[start, end)` for `granularity`.
        pub fn with_generated(
            self,
            granularity: Granularity,
            start_ms: i64,
            end_ms: i64,
            price: impl Fn(usize) -> f64,
            volume: f64,
        ) -> Self {
            let step = granularity.as_millis();
            let candles = (0..)
                .map(|i| (i, start_ms + i as i64 * step))
                .take_while(|(_, ts)| *ts < end_ms)
                .map(|(i, ts)| {
                    let p = price(i);
                    Candle::new(ts, p, p * 1.001, p * 0.999, p, volume, p * volume)
                })
                .collect();
            self.with_candles(granularity, candles)
        }

        /// Every candle request for `granularity` fails at the transport level.
        pub fn failing_on(mut self, granularity: Granularity) -> Self {
            self.failing.push(granularity);
            self
        }

        pub fn with_funding(mut self, events: Vec<FundingEvent>) -> Self {
            self.funding = events;
            self
        }

        pub fn funding_fails(mut self) -> Self {
            self.funding_fails = true;
            self
        }

        pub fn calls_for(&self, granularity: Granularity) -> usize {
            self.calls
                .lock()
                .iter()
                .filter(|c| c.granularity == granularity)
                .count()
        }

        /// Most `fetch_candles` calls that were suspended at the same time.
        pub fn peak_in_flight(&self) -> usize {
            self.peak_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MarketDataProvider for FixtureProvider {
        async fn fetch_candles(
            &self,
            symbol: &str,
            granularity: Granularity,
            start_ms: i64,
            end_ms: i64,
            limit: u32,
        ) -> Result<Vec<Candle>> {
            self.calls.lock().push(CandleCall {
                symbol: symbol.to_string(),
                granularity,
                start_ms,
                end_ms,
            });

            // Suspend once so concurrently polled callers overlap here.
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(&granularity) {
                bail!("fixture: upstream returned 500");
            }

            Ok(self
                .candles
                .get(&granularity)
                .map(|all| {
                    all.iter()
                        .filter(|c| c.timestamp_ms >= start_ms && c.timestamp_ms <= end_ms)
                        .take(limit as usize)
                        .copied()
                        .collect()
                })
                .unwrap_or_default())
        }

        async fn fetch_funding_rate_history(
            &self,
            symbol: &str,
            page_no: u32,
            page_size: u32,
        ) -> Result<Vec<FundingEvent>> {
            if self.funding_fails {
                bail!("fixture: funding endpoint returned 429");
            }
            let skip = (page_no.saturating_sub(1) * page_size) as usize;
            Ok(self
                .funding
                .iter()
                .filter(|e| e.symbol == symbol)
                .skip(skip)
                .take(page_size as usize)
                .cloned()
                .collect())
        }

        async fn fetch_current_funding_rate(&self, symbol: &str) -> Result<f64> {
            match self.funding.iter().find(|e| e.symbol == symbol) {
                Some(e) => Ok(e.rate_pct),
                None => bail!("fixture: no funding rate for {symbol}"),
            }
        }
    }
}
