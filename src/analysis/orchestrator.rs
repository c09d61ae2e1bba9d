// =============================================================================
// Analysis Orchestrator — one multi-timeframe assessment per call
// =============================================================================
//
// Phases:
//   Pending    -> fan out five independent computations, joined with
//                 `try_join!` so every task is in flight before any is awaited.
//   FannedOut  -> volatility index over the short-horizon series carried in the
//                 phase state (never re-fetched).
//   Fused      -> trailing-week volume and the funding rate at the period are
//                 fetched together, votes are fused into a sentiment label.
//   Done       -> report assembled and sanitised.
//
// Cancellation: the first hard failure (`DataUnavailable`) drops the sibling
// futures of the same phase and fails the whole call. No partial reports.
//
// Windows (p = period):
//   10m variation    [p, p+10m)      1m
//   8h variation     [p, p+8h)       1H, then 4H
//   daily trend      [p-24h, p)      15m
//   weekly trend     [p, p+7d)       1H
//   average volume   [p, p+24h)      1H
//   trailing volume  [p-7d, p)       4H
//
// The period is checked against that span up front: an anchor whose windows
// fall outside the representable UTC range fails with `InvalidPeriod` before
// any upstream call.
// =============================================================================

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::analysis::report::{Report, ReportDraft};
use crate::analysis::sentiment::{fuse, Votes};
use crate::error::{AnalysisError, AnalysisResult};
use crate::futures_intel::FundingRateService;
use crate::indicators::trend::{classify_series, TrendProfile};
use crate::indicators::variation::{medium_horizon_variation, short_horizon_variation};
use crate::indicators::volatility::volatility_index;
use crate::indicators::volume::{average_volume, volume_change_pct};
use crate::indicators::IndicatorResult;
use crate::market_data::{CandleFetcher, FallbackPlan, Granularity, Series};
use crate::types::{Sentiment, Trend};

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

pub const SHORT_HORIZON_MS: i64 = 10 * MINUTE_MS;
pub const MEDIUM_HORIZON_MS: i64 = 8 * HOUR_MS;
pub const VOLUME_WINDOW_MS: i64 = DAY_MS;
pub const TRAILING_VOLUME_WINDOW_MS: i64 = 7 * DAY_MS;
/// Furthest any window reaches past the period (weekly trend).
const FORWARD_SPAN_MS: i64 = 7 * DAY_MS;

/// State after the fan-out join.
#[derive(Debug)]
struct FannedOut {
    variation_8h: f64,
    variation_10m: IndicatorResult<f64>,
    /// Owned by the short-horizon task, read by the volatility step.
    short_series: Option<Series>,
    daily_trend: IndicatorResult<Trend>,
    weekly_trend: IndicatorResult<Trend>,
    average_volume: f64,
}

/// State after the volatility step; the short-horizon series is released.
#[derive(Debug)]
struct Measured {
    variation_8h: f64,
    variation_10m: f64,
    daily_trend: Trend,
    weekly_trend: Trend,
    volatility_index: Option<f64>,
    average_volume: f64,
}

/// Runs assessments against a market-data provider.
#[derive(Clone)]
pub struct MarketAnalyzer {
    fetcher: CandleFetcher,
    funding: FundingRateService,
    medium_horizon_plan: FallbackPlan,
}

impl MarketAnalyzer {
    pub fn new(fetcher: CandleFetcher, funding: FundingRateService) -> Self {
        Self {
            fetcher,
            funding,
            medium_horizon_plan: FallbackPlan::fine_to_coarse(Granularity::H1),
        }
    }

    pub fn funding(&self) -> &FundingRateService {
        &self.funding
    }

    pub fn fetcher(&self) -> &CandleFetcher {
        &self.fetcher
    }

    /// Produce the full assessment for `symbol` anchored at `period_ms`.
    #[instrument(skip(self), name = "analyzer::analyze")]
    pub async fn analyze(&self, symbol: &str, period_ms: i64) -> AnalysisResult<Report> {
        check_period(period_ms)?;
        let fanned = self.fan_out(symbol, period_ms).await?;
        let measured = measure(fanned)?;
        let sentiment = self.fuse_sentiment(symbol, period_ms, &measured).await?;

        let report = ReportDraft {
            period_ms,
            variation_8h: measured.variation_8h,
            variation_10m: measured.variation_10m,
            daily_trend: measured.daily_trend,
            weekly_trend: measured.weekly_trend,
            volatility_index: measured.volatility_index,
            average_volume: measured.average_volume,
            sentiment,
        }
        .finish();

        info!(
            symbol,
            period = %report.period,
            sentiment = %report.sentiment,
            "analysis complete"
        );
        Ok(report)
    }

    // -------------------------------------------------------------------------
    // Phase 1: fan-out
    // -------------------------------------------------------------------------

    async fn fan_out(&self, symbol: &str, period_ms: i64) -> AnalysisResult<FannedOut> {
        let daily = TrendProfile::daily();
        let weekly = TrendProfile::weekly();

        let ((variation_10m, short_series), variation_8h, daily_trend, weekly_trend, average_volume) = tokio::try_join!(
            self.variation_10m(symbol, period_ms),
            self.variation_8h(symbol, period_ms),
            self.trend(symbol, period_ms, &daily),
            self.trend(symbol, period_ms, &weekly),
            self.average_volume(symbol, period_ms),
        )?;

        debug!(
            symbol,
            variation_8h,
            variation_10m = variation_10m.value,
            daily_trend = %daily_trend.value,
            weekly_trend = %weekly_trend.value,
            average_volume,
            "fan-out joined"
        );

        Ok(FannedOut {
            variation_8h,
            variation_10m,
            short_series: Some(short_series),
            daily_trend,
            weekly_trend,
            average_volume,
        })
    }

    /// Short-horizon variation; also hands back the series for volatility.
    pub async fn variation_10m(
        &self,
        symbol: &str,
        period_ms: i64,
    ) -> AnalysisResult<(IndicatorResult<f64>, Series)> {
        let series = self
            .fetcher
            .fetch_series(symbol, Granularity::M1, period_ms, period_ms + SHORT_HORIZON_MS)
            .await;
        Ok((short_horizon_variation(&series), series))
    }

    /// Medium-horizon variation with the fine-to-coarse fallback.
    pub async fn variation_8h(&self, symbol: &str, period_ms: i64) -> AnalysisResult<f64> {
        let series = self
            .medium_horizon_plan
            .fetch(&self.fetcher, symbol, period_ms, period_ms + MEDIUM_HORIZON_MS)
            .await
            .ok_or_else(|| AnalysisError::unavailable("8h variation", symbol))?;
        medium_horizon_variation(&series)
    }

    pub async fn trend(
        &self,
        symbol: &str,
        period_ms: i64,
        profile: &TrendProfile,
    ) -> AnalysisResult<IndicatorResult<Trend>> {
        let (start, end) = profile.window(period_ms);
        let series = self
            .fetcher
            .fetch_series(symbol, profile.granularity, start, end)
            .await;
        Ok(classify_series(&series, profile))
    }

    /// Mean 1H volume over the 24 hours following the period.
    pub async fn average_volume(&self, symbol: &str, period_ms: i64) -> AnalysisResult<f64> {
        let series = self
            .fetcher
            .fetch_series(symbol, Granularity::H1, period_ms, period_ms + VOLUME_WINDOW_MS)
            .await;
        average_volume(&series, "average volume")
    }

    /// Mean 4H volume over the week preceding the period.
    pub async fn trailing_week_volume(&self, symbol: &str, period_ms: i64) -> AnalysisResult<f64> {
        let series = self
            .fetcher
            .fetch_series(
                symbol,
                Granularity::H4,
                period_ms - TRAILING_VOLUME_WINDOW_MS,
                period_ms,
            )
            .await;
        average_volume(&series, "trailing-week volume")
    }

    // -------------------------------------------------------------------------
    // Phase 3: fusion
    // -------------------------------------------------------------------------

    async fn fuse_sentiment(&self, symbol: &str, period_ms: i64, measured: &Measured) -> AnalysisResult<Sentiment> {
        let (baseline_volume, funding) = tokio::join!(
            self.trailing_week_volume(symbol, period_ms),
            self.funding.rate_at(symbol, period_ms),
        );
        let baseline_volume = baseline_volume?;

        let votes = Votes::new(
            funding.map(|e| e.rate_pct),
            measured.daily_trend,
            measured.volatility_index,
            volume_change_pct(measured.average_volume, baseline_volume),
        );
        let sentiment = fuse(&votes);

        debug!(symbol, votes = ?votes, sentiment = %sentiment, "sentiment fused");
        Ok(sentiment)
    }

    /// Close of the first 1m bar at the period.
    pub async fn price_at(&self, symbol: &str, period_ms: i64) -> AnalysisResult<f64> {
        check_period(period_ms)?;
        self.fetcher
            .fetch_series(symbol, Granularity::M1, period_ms, period_ms + MINUTE_MS)
            .await
            .first()
            .map(|c| c.close)
            .ok_or_else(|| AnalysisError::unavailable("period price", symbol))
    }
}

/// Every window derived from `period_ms` must stay inside chrono's range.
fn check_period(period_ms: i64) -> AnalysisResult<()> {
    let in_range =
        |ms: Option<i64>| ms.and_then(DateTime::<Utc>::from_timestamp_millis).is_some();
    if in_range(period_ms.checked_sub(TRAILING_VOLUME_WINDOW_MS))
        && in_range(period_ms.checked_add(FORWARD_SPAN_MS))
    {
        Ok(())
    } else {
        Err(AnalysisError::InvalidPeriod(period_ms))
    }
}

// -----------------------------------------------------------------------------
// Phase 2: dependent volatility step
// -----------------------------------------------------------------------------

fn measure(fanned: FannedOut) -> AnalysisResult<Measured> {
    let volatility = volatility_index(fanned.short_series.as_ref())?;

    Ok(Measured {
        variation_8h: fanned.variation_8h,
        variation_10m: fanned.variation_10m.value,
        daily_trend: fanned.daily_trend.value,
        weekly_trend: fanned.weekly_trend.value,
        volatility_index: volatility.value,
        average_volume: fanned.average_volume,
    })
}
