// =============================================================================
// Shared types used across the Fundy analysis engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// A single OHLCV bar as returned by the upstream candles endpoint.
///
/// Prices that upstream sent as non-numeric strings are carried as `NaN` and
/// filtered out by each indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp_ms: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Traded amount in the base currency.
    pub volume: f64,
    /// Traded value in the quote currency.
    pub notional: f64,
}

impl Candle {
    pub fn new(
        timestamp_ms: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        notional: f64,
    ) -> Self {
        Self {
            timestamp_ms,
            open,
            high,
            low,
            close,
            volume,
            notional,
        }
    }
}

/// One historical funding settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingEvent {
    pub symbol: String,
    /// Funding rate as a percentage (e.g. 0.01 = 0.01%).
    pub rate_pct: f64,
    /// Settlement time, UTC epoch milliseconds.
    pub funding_time: i64,
}

/// Trend label produced by the daily and weekly classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trend {
    #[serde(rename = "strongly bullish")]
    StronglyBullish,
    #[serde(rename = "bullish")]
    Bullish,
    #[serde(rename = "neutral")]
    Neutral,
    #[serde(rename = "sideways")]
    Sideways,
    #[serde(rename = "bearish")]
    Bearish,
    #[serde(rename = "strongly bearish")]
    StronglyBearish,
    #[serde(rename = "volatile bullish")]
    VolatileBullish,
    #[serde(rename = "volatile bearish")]
    VolatileBearish,
    #[serde(rename = "volatile")]
    Volatile,
    /// Weekly only: price rose over the week while the averages diverge.
    #[serde(rename = "corrective")]
    Corrective,
}

impl Trend {
    pub fn is_bullish(self) -> bool {
        matches!(
            self,
            Self::StronglyBullish | Self::Bullish | Self::VolatileBullish
        )
    }

    pub fn is_bearish(self) -> bool {
        matches!(
            self,
            Self::StronglyBearish | Self::Bearish | Self::VolatileBearish
        )
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::StronglyBullish => "strongly bullish",
            Self::Bullish => "bullish",
            Self::Neutral => "neutral",
            Self::Sideways => "sideways",
            Self::Bearish => "bearish",
            Self::StronglyBearish => "strongly bearish",
            Self::VolatileBullish => "volatile bullish",
            Self::VolatileBearish => "volatile bearish",
            Self::Volatile => "volatile",
            Self::Corrective => "corrective",
        };
        f.write_str(label)
    }
}

/// Fused market-sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    #[serde(rename = "highly positive")]
    HighlyPositive,
    #[serde(rename = "positive")]
    Positive,
    #[serde(rename = "mixed")]
    Mixed,
    #[serde(rename = "negative")]
    Negative,
    #[serde(rename = "highly negative")]
    HighlyNegative,
    #[serde(rename = "uncertain")]
    Uncertain,
    #[serde(rename = "bullish")]
    Bullish,
    #[serde(rename = "bearish")]
    Bearish,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::HighlyPositive => "highly positive",
            Self::Positive => "positive",
            Self::Mixed => "mixed",
            Self::Negative => "negative",
            Self::HighlyNegative => "highly negative",
            Self::Uncertain => "uncertain",
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_serialises_as_label() {
        let json = serde_json::to_string(&Trend::VolatileBearish).unwrap();
        assert_eq!(json, "\"volatile bearish\"");
        assert_eq!(Trend::StronglyBullish.to_string(), "strongly bullish");
    }

    #[test]
    fn trend_direction_helpers() {
        assert!(Trend::VolatileBullish.is_bullish());
        assert!(Trend::Bearish.is_bearish());
        assert!(!Trend::Sideways.is_bullish());
        assert!(!Trend::Corrective.is_bearish());
    }

    #[test]
    fn sentiment_roundtrip_label() {
        let s: Sentiment = serde_json::from_str("\"highly negative\"").unwrap();
        assert_eq!(s, Sentiment::HighlyNegative);
        assert_eq!(s.to_string(), "highly negative");
    }
}
