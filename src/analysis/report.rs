// =============================================================================
// Analysis Report — sanitised terminal assessment
// =============================================================================
//
// Any numeric field that is not finite is reported as `null` (unavailable).
// The period is rendered as RFC 3339 in UTC with second precision.
// =============================================================================

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::warn;

use crate::types::{Sentiment, Trend};

/// Terminal assessment handed to the HTTP layer.
///
/// Numeric fields are `None` ("unavailable") whenever the computed value was
/// not finite; a raw `NaN`/`inf` never leaves the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Anchor period as RFC 3339 in UTC.
    pub period: String,
    pub variation_8h: Option<f64>,
    pub variation_10m: Option<f64>,
    pub daily_trend: Option<Trend>,
    pub weekly_trend: Option<Trend>,
    pub volatility_index: Option<f64>,
    pub average_volume: Option<f64>,
    pub sentiment: Sentiment,
}

/// Raw values gathered by the orchestrator before sanitisation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDraft {
    pub period_ms: i64,
    pub variation_8h: f64,
    pub variation_10m: f64,
    pub daily_trend: Trend,
    pub weekly_trend: Trend,
    pub volatility_index: Option<f64>,
    pub average_volume: f64,
    pub sentiment: Sentiment,
}

impl ReportDraft {
    /// Sanitise numeric fields and render the period.
    pub fn finish(self) -> Report {
        Report {
            period: format_period(self.period_ms),
            variation_8h: finite_or_none("variation_8h", self.variation_8h),
            variation_10m: finite_or_none("variation_10m", self.variation_10m),
            daily_trend: Some(self.daily_trend),
            weekly_trend: Some(self.weekly_trend),
            volatility_index: self
                .volatility_index
                .and_then(|v| finite_or_none("volatility_index", v)),
            average_volume: finite_or_none("average_volume", self.average_volume),
            sentiment: self.sentiment,
        }
    }
}

fn finite_or_none(field: &'static str, value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        warn!(field, value = %value, "non-finite value replaced with null");
        None
    }
}

/// `2024-09-29T00:00:00Z`; out-of-range timestamps fall back to the raw number.
pub fn format_period(period_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(period_ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| period_ms.to_string())
}
