// =============================================================================
// Trend classification — moving-average cascades
// =============================================================================
//
// Inputs are taken from the last bar of the series: close, short SMA, long SMA,
// the sample std of percentage price changes, and the change from the first
// open to the last close.
//
// Moving-average cascade (daily), first match wins:
//   1. close < short < long        => strongly bearish
//      close > short > long        => strongly bullish
//   2. close < short               => bearish
//      close > short               => bullish
//   3. |short - long| / long < t   => sideways (overrides 1 and 2)
//   4. std > volatility threshold  => volatile [bullish|bearish]
//
// Momentum cascade (weekly), first match wins:
//   1. close > short > long        => strongly bullish if change > strong, else bullish
//      close < short < long        => strongly bearish if change < -strong, else bearish
//   2. |change| < flat band        => neutral
//   3. |short - long| / long < t   => sideways
//   4. change > 0                  => corrective
//   5. otherwise                   => volatile
//   6. std > volatility threshold  => volatile (replaces the label)
//
// An undefined moving average (series shorter than the lookback) yields
// neutral flagged as insufficient.
// =============================================================================

use std::cmp::Ordering;

use tracing::debug;

use super::stats::{pct_changes, sample_std, sma_last};
use super::IndicatorResult;
use crate::market_data::{Granularity, Series};
use crate::types::Trend;

const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Which decision cascade a profile runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cascade {
    MovingAverage,
    Momentum {
        /// Window change (%) separating "strongly" from plain direction.
        strong_move_pct: f64,
        /// Window change (%) below which the market counts as flat.
        flat_band_pct: f64,
    },
}

/// Window, granularity and thresholds of one trend variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendProfile {
    pub name: &'static str,
    pub granularity: Granularity,
    /// Window start relative to the anchor period.
    pub start_offset_ms: i64,
    /// Window end relative to the anchor period.
    pub end_offset_ms: i64,
    pub short_window: usize,
    pub long_window: usize,
    /// Relative SMA gap below which the market is sideways.
    pub sideways_threshold: f64,
    /// Std of % changes above which the market is volatile.
    pub volatility_threshold: f64,
    pub cascade: Cascade,
}

impl TrendProfile {
    /// Trailing 24 hours of 15m bars, SMA 5/15.
    pub const fn daily() -> Self {
        Self {
            name: "daily",
            granularity: Granularity::M15,
            start_offset_ms: -DAY_MS,
            end_offset_ms: 0,
            short_window: 5,
            long_window: 15,
            sideways_threshold: 0.003,
            volatility_threshold: 2.0,
            cascade: Cascade::MovingAverage,
        }
    }

    /// Seven days of 1H bars from the anchor, SMA 20/50.
    pub const fn weekly() -> Self {
        Self {
            name: "weekly",
            granularity: Granularity::H1,
            start_offset_ms: 0,
            end_offset_ms: 7 * DAY_MS,
            short_window: 20,
            long_window: 50,
            sideways_threshold: 0.01,
            volatility_threshold: 2.0,
            cascade: Cascade::Momentum {
                strong_move_pct: 5.0,
                flat_band_pct: 1.0,
            },
        }
    }

    /// `[start, end)` window for an anchor `period_ms`.
    pub fn window(&self, period_ms: i64) -> (i64, i64) {
        (period_ms + self.start_offset_ms, period_ms + self.end_offset_ms)
    }
}

/// Values the cascade reads from the last bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendInputs {
    pub close: f64,
    pub short_ma: f64,
    pub long_ma: f64,
    /// Sample std of % price changes; `None` with fewer than two changes.
    pub change_std: Option<f64>,
    /// First open to last close, in percent.
    pub window_change_pct: f64,
}

impl TrendInputs {
    /// Extract cascade inputs; `None` when either moving average is undefined.
    pub fn from_series(series: &Series, profile: &TrendProfile) -> Option<Self> {
        let rows = series.with_valid_close();
        let closes: Vec<f64> = rows.iter().map(|c| c.close).collect();

        let close = *closes.last()?;
        let short_ma = sma_last(&closes, profile.short_window)?;
        let long_ma = sma_last(&closes, profile.long_window)?;
        let change_std = sample_std(&pct_changes(&closes)).ok();
        let first_open = rows.first()?.open;
        let window_change_pct = (close - first_open) / first_open * 100.0;

        Some(Self {
            close,
            short_ma,
            long_ma,
            change_std,
            window_change_pct,
        })
    }

    fn ma_gap(&self) -> f64 {
        (self.short_ma - self.long_ma).abs() / self.long_ma
    }

    fn is_volatile(&self, threshold: f64) -> bool {
        self.change_std.is_some_and(|s| s > threshold)
    }
}

/// Classify a fetched series under `profile`.
pub fn classify_series(series: &Series, profile: &TrendProfile) -> IndicatorResult<Trend> {
    match TrendInputs::from_series(series, profile) {
        Some(inputs) => {
            let trend = classify(&inputs, profile);
            debug!(
                symbol = %series.symbol,
                profile = profile.name,
                close = inputs.close,
                short_ma = inputs.short_ma,
                long_ma = inputs.long_ma,
                trend = %trend,
                "trend classified"
            );
            IndicatorResult::ready(trend)
        }
        None => {
            debug!(
                symbol = %series.symbol,
                profile = profile.name,
                candles = series.len(),
                "moving averages undefined, trend is neutral"
            );
            IndicatorResult::insufficient(Trend::Neutral)
        }
    }
}

/// Run the profile's cascade over already-extracted inputs.
pub fn classify(inputs: &TrendInputs, profile: &TrendProfile) -> Trend {
    match profile.cascade {
        Cascade::MovingAverage => classify_moving_average(inputs, profile),
        Cascade::Momentum {
            strong_move_pct,
            flat_band_pct,
        } => classify_momentum(inputs, profile, strong_move_pct, flat_band_pct),
    }
}

fn classify_moving_average(inputs: &TrendInputs, profile: &TrendProfile) -> Trend {
    let price_vs_short = inputs.close.partial_cmp(&inputs.short_ma);
    let short_vs_long = inputs.short_ma.partial_cmp(&inputs.long_ma);

    let mut trend = match (price_vs_short, short_vs_long) {
        (Some(Ordering::Less), Some(Ordering::Less)) => Trend::StronglyBearish,
        (Some(Ordering::Greater), Some(Ordering::Greater)) => Trend::StronglyBullish,
        (Some(Ordering::Less), _) => Trend::Bearish,
        (Some(Ordering::Greater), _) => Trend::Bullish,
        _ => Trend::Neutral,
    };

    if inputs.ma_gap() < profile.sideways_threshold {
        trend = Trend::Sideways;
    }

    if inputs.is_volatile(profile.volatility_threshold) {
        trend = match trend {
            t if t.is_bearish() => Trend::VolatileBearish,
            t if t.is_bullish() => Trend::VolatileBullish,
            _ => Trend::Volatile,
        };
    }

    trend
}

fn classify_momentum(
    inputs: &TrendInputs,
    profile: &TrendProfile,
    strong_move_pct: f64,
    flat_band_pct: f64,
) -> Trend {
    let change = inputs.window_change_pct;
    let rising = inputs.close > inputs.short_ma && inputs.short_ma > inputs.long_ma;
    let falling = inputs.close < inputs.short_ma && inputs.short_ma < inputs.long_ma;

    let trend = match (rising, falling) {
        (true, _) if change > strong_move_pct => Trend::StronglyBullish,
        (true, _) => Trend::Bullish,
        (_, true) if change < -strong_move_pct => Trend::StronglyBearish,
        (_, true) => Trend::Bearish,
        _ if change.abs() < flat_band_pct => Trend::Neutral,
        _ if inputs.ma_gap() < profile.sideways_threshold => Trend::Sideways,
        _ if change > 0.0 => Trend::Corrective,
        _ => Trend::Volatile,
    };

    if inputs.is_volatile(profile.volatility_threshold) {
        Trend::Volatile
    } else {
        trend
    }
}
