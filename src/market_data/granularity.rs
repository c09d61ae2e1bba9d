// =============================================================================
// Bar durations accepted by the upstream candles endpoint
// =============================================================================

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Trading days per year used when annualising per-bar statistics.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Fixed time slice of a candlestick series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Granularity {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    H12,
    D1,
    W1,
    Mo1,
}

impl Granularity {
    /// All granularities, finest first.
    pub const ALL: [Granularity; 10] = [
        Self::M1,
        Self::M5,
        Self::M15,
        Self::M30,
        Self::H1,
        Self::H4,
        Self::H12,
        Self::D1,
        Self::W1,
        Self::Mo1,
    ];

    /// Identifier as sent to the upstream API.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1H",
            Self::H4 => "4H",
            Self::H12 => "12H",
            Self::D1 => "1D",
            Self::W1 => "1W",
            Self::Mo1 => "1MO",
        }
    }

    /// Bar length in milliseconds. A month is fixed at 30 days.
    pub fn as_millis(self) -> i64 {
        match self {
            Self::M1 => MINUTE_MS,
            Self::M5 => 5 * MINUTE_MS,
            Self::M15 => 15 * MINUTE_MS,
            Self::M30 => 30 * MINUTE_MS,
            Self::H1 => HOUR_MS,
            Self::H4 => 4 * HOUR_MS,
            Self::H12 => 12 * HOUR_MS,
            Self::D1 => DAY_MS,
            Self::W1 => 7 * DAY_MS,
            Self::Mo1 => 30 * DAY_MS,
        }
    }

    /// Number of bars in a trading year (252 days) at this duration.
    pub fn bars_per_year(self) -> f64 {
        TRADING_DAYS_PER_YEAR * DAY_MS as f64 / self.as_millis() as f64
    }

    /// Next coarser granularity, if any.
    pub fn coarser(self) -> Option<Self> {
        let idx = Self::ALL.iter().position(|g| *g == self)?;
        Self::ALL.get(idx + 1).copied()
    }
}

impl FromStr for Granularity {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| AnalysisError::UnsupportedGranularity(s.to_string()))
    }
}

impl TryFrom<String> for Granularity {
    type Error = AnalysisError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Granularity> for String {
    fn from(g: Granularity) -> Self {
        g.as_str().to_string()
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_identifier() {
        for g in Granularity::ALL {
            assert_eq!(g.as_str().parse::<Granularity>().unwrap(), g);
        }
    }

    #[test]
    fn unknown_identifier_is_rejected() {
        let err = "2h".parse::<Granularity>().unwrap_err();
        assert_eq!(err, AnalysisError::UnsupportedGranularity("2h".into()));
        // Identifiers are case-sensitive: upstream uses "1H", not "1h".
        assert!("1h".parse::<Granularity>().is_err());
    }

    #[test]
    fn durations() {
        assert_eq!(Granularity::M1.as_millis(), 60_000);
        assert_eq!(Granularity::H4.as_millis(), 14_400_000);
        assert_eq!(Granularity::Mo1.as_millis(), 30 * 86_400_000);
    }

    #[test]
    fn minute_bars_per_year() {
        assert!((Granularity::M1.bars_per_year() - 252.0 * 1440.0).abs() < 1e-9);
    }

    #[test]
    fn coarser_steps_up() {
        assert_eq!(Granularity::H1.coarser(), Some(Granularity::H4));
        assert_eq!(Granularity::Mo1.coarser(), None);
    }
}
