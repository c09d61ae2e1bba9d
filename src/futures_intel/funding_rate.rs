// =============================================================================
// Funding Rate Service — paged history, anchor lookup, spike detection
// =============================================================================
//
// Funding rates are periodic payments between longs and shorts that anchor the
// perpetual contract price to spot. Extreme settlements ("spikes") are the
// events the analysis engine is anchored on.
//
// Paging: pages 1..=max_pages of page_size events. Any upstream failure turns
// the whole history into an empty list; an empty page ends the walk.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{AnalysisError, AnalysisResult};
use crate::market_data::MarketDataProvider;
use crate::types::FundingEvent;

const HOUR_MS: i64 = 3_600_000;

/// Default |rate| (percent) from which a settlement counts as a spike.
pub const DEFAULT_SPIKE_THRESHOLD_PCT: f64 = 0.5;

/// Funding settlement cadence of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FundingInterval {
    pub hours: u32,
}

/// Reads funding history through a [`MarketDataProvider`].
#[derive(Clone)]
pub struct FundingRateService {
    provider: Arc<dyn MarketDataProvider>,
    page_size: u32,
    max_pages: u32,
}

impl FundingRateService {
    pub fn new(provider: Arc<dyn MarketDataProvider>, page_size: u32, max_pages: u32) -> Self {
        Self {
            provider,
            page_size: page_size.max(1),
            max_pages: max_pages.max(1),
        }
    }

    /// Full paged history, newest settlement first.
    pub async fn history(&self, symbol: &str) -> Vec<FundingEvent> {
        let mut events = Vec::new();

        for page_no in 1..=self.max_pages {
            match self
                .provider
                .fetch_funding_rate_history(symbol, page_no, self.page_size)
                .await
            {
                Ok(page) if page.is_empty() => break,
                Ok(page) => {
                    let short_page = (page.len() as u32) < self.page_size;
                    events.extend(page);
                    if short_page {
                        break;
                    }
                }
                Err(e) => {
                    warn!(symbol, page_no, error = %e, "funding history request failed");
                    return Vec::new();
                }
            }
        }

        events.sort_by(|a, b| b.funding_time.cmp(&a.funding_time));
        debug!(symbol, count = events.len(), "funding history fetched");
        events
    }

    /// The latest settlement at or before `period_ms`.
    pub async fn rate_at(&self, symbol: &str, period_ms: i64) -> Option<FundingEvent> {
        self.history(symbol)
            .await
            .into_iter()
            .find(|e| e.funding_time <= period_ms)
    }

    /// Settlements whose |rate| is at least `threshold_pct`, newest first.
    pub async fn spikes(&self, symbol: &str, threshold_pct: f64) -> Vec<FundingEvent> {
        self.history(symbol)
            .await
            .into_iter()
            .filter(|e| e.rate_pct.abs() >= threshold_pct)
            .collect()
    }

    /// Settlement cadence derived from the two most recent events.
    pub async fn funding_interval(&self, symbol: &str) -> AnalysisResult<FundingInterval> {
        let page = self
            .provider
            .fetch_funding_rate_history(symbol, 1, 3)
            .await
            .unwrap_or_else(|e| {
                warn!(symbol, error = %e, "funding interval request failed");
                Vec::new()
            });
        interval_from_events(&page)
            .ok_or_else(|| AnalysisError::unavailable("funding interval", symbol))
    }

    /// Current funding rate (percent, 4 decimals).
    pub async fn current_rate(&self, symbol: &str) -> Result<f64> {
        let rate = self
            .provider
            .fetch_current_funding_rate(symbol)
            .await
            .with_context(|| format!("current funding rate for {symbol}"))?;
        Ok((rate * 10_000.0).round() / 10_000.0)
    }
}

/// 8h or 4h when the two newest settlements are exactly that far apart.
fn interval_from_events(events: &[FundingEvent]) -> Option<FundingInterval> {
    let mut times: Vec<i64> = events.iter().map(|e| e.funding_time).collect();
    times.sort_unstable_by(|a, b| b.cmp(a));
    let diff = match times.as_slice() {
        [newest, previous, ..] => newest - previous,
        _ => return None,
    };
    match diff {
        d if d == 8 * HOUR_MS => Some(FundingInterval { hours: 8 }),
        d if d == 4 * HOUR_MS => Some(FundingInterval { hours: 4 }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::provider::fixture::FixtureProvider;

    fn event(time: i64, rate_pct: f64) -> FundingEvent {
        FundingEvent {
            symbol: "BTCUSDT".into(),
            rate_pct,
            funding_time: time,
        }
    }

    fn eight_hourly(n: i64) -> Vec<FundingEvent> {
        (0..n)
            .rev()
            .map(|i| event(i * 8 * HOUR_MS, if i % 10 == 0 { 0.6 } else { 0.01 }))
            .collect()
    }

    fn service(provider: FixtureProvider, page_size: u32, max_pages: u32) -> FundingRateService {
        FundingRateService::new(Arc::new(provider), page_size, max_pages)
    }

    #[tokio::test]
    async fn history_walks_pages_up_to_cap() {
        let svc = service(FixtureProvider::new().with_funding(eight_hourly(30)), 10, 2);
        let history = svc.history("BTCUSDT").await;
        assert_eq!(history.len(), 20);
        assert!(history.windows(2).all(|w| w[0].funding_time > w[1].funding_time));
    }

    #[tokio::test]
    async fn short_page_ends_walk() {
        let svc = service(FixtureProvider::new().with_funding(eight_hourly(15)), 10, 5);
        assert_eq!(svc.history("BTCUSDT").await.len(), 15);
    }

    #[tokio::test]
    async fn failure_yields_empty_history() {
        let svc = service(
            FixtureProvider::new().with_funding(eight_hourly(15)).funding_fails(),
            10,
            5,
        );
        assert!(svc.history("BTCUSDT").await.is_empty());
    }

    #[tokio::test]
    async fn rate_at_picks_latest_before_period() {
        let svc = service(FixtureProvider::new().with_funding(eight_hourly(10)), 100, 5);
        let e = svc.rate_at("BTCUSDT", 3 * 8 * HOUR_MS + 1).await.unwrap();
        assert_eq!(e.funding_time, 3 * 8 * HOUR_MS);
        assert!(svc.rate_at("BTCUSDT", -1).await.is_none());
    }

    #[tokio::test]
    async fn spikes_filter_by_magnitude() {
        let svc = service(FixtureProvider::new().with_funding(eight_hourly(25)), 100, 5);
        let spikes = svc.spikes("BTCUSDT", DEFAULT_SPIKE_THRESHOLD_PCT).await;
        let times: Vec<i64> = spikes.iter().map(|e| e.funding_time).collect();
        assert_eq!(times, vec![20 * 8 * HOUR_MS, 10 * 8 * HOUR_MS, 0]);
    }

    #[test]
    fn interval_detection() {
        assert_eq!(
            interval_from_events(&[event(8 * HOUR_MS, 0.0), event(0, 0.0)]),
            Some(FundingInterval { hours: 8 })
        );
        assert_eq!(
            interval_from_events(&[event(0, 0.0), event(4 * HOUR_MS, 0.0)]),
            Some(FundingInterval { hours: 4 })
        );
        assert_eq!(interval_from_events(&[event(0, 0.0), event(HOUR_MS, 0.0)]), None);
        assert_eq!(interval_from_events(&[event(0, 0.0)]), None);
    }

    #[tokio::test]
    async fn interval_unavailable_without_history() {
        let svc = service(FixtureProvider::new(), 100, 5);
        assert!(matches!(
            svc.funding_interval("BTCUSDT").await,
            Err(AnalysisError::DataUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn current_rate_rounded() {
        let svc = service(
            FixtureProvider::new().with_funding(vec![event(0, 0.012_345_6)]),
            100,
            5,
        );
        assert!((svc.current_rate("BTCUSDT").await.unwrap() - 0.0123).abs() < 1e-12);
    }
}
