// =============================================================================
// Sentiment Fusion — four categorical votes into one label
// =============================================================================
//
// Votes:
//   funding     rate > +0.1%  => bearish,  rate < -0.1% => bullish
//   price       daily trend strongly bullish / bullish => bullish (mirrored)
//   volatility  index > 50 => uncertain, < 10 => stable, else moderate
//   volume      change > +20% => bullish, < -20% => bearish
//
// Resolution:
//   majority of bullish vs bearish; 3+ => highly, otherwise plain; tie => mixed.
//   An uncertain volatility vote overrides everything.
//   positive + bullish price vote => bullish; negative + bearish => bearish.
// =============================================================================

use std::cmp::Ordering;

use serde::Serialize;

use crate::types::{Sentiment, Trend};

const FUNDING_THRESHOLD_PCT: f64 = 0.1;
const VOLATILITY_UNCERTAIN: f64 = 50.0;
const VOLATILITY_STABLE: f64 = 10.0;
const VOLUME_CHANGE_THRESHOLD_PCT: f64 = 20.0;

/// Directional vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

/// Volatility-level vote; never directional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityLevel {
    Stable,
    Moderate,
    Uncertain,
}

/// The four votes feeding the fusion step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Votes {
    pub funding: Direction,
    pub price: Direction,
    pub volatility: VolatilityLevel,
    pub volume: Direction,
}

impl Votes {
    pub fn new(
        funding_rate_pct: Option<f64>,
        daily_trend: Trend,
        volatility_index: Option<f64>,
        volume_change_pct: f64,
    ) -> Self {
        Self {
            funding: funding_vote(funding_rate_pct),
            price: price_vote(daily_trend),
            volatility: volatility_vote(volatility_index),
            volume: volume_vote(volume_change_pct),
        }
    }

    fn directions(&self) -> [Direction; 3] {
        [self.funding, self.price, self.volume]
    }

    fn count(&self, direction: Direction) -> usize {
        self.directions().iter().filter(|d| **d == direction).count()
    }
}

/// Contrarian funding vote: crowded longs pay, so high funding is bearish.
pub fn funding_vote(rate_pct: Option<f64>) -> Direction {
    match rate_pct {
        Some(r) if r > FUNDING_THRESHOLD_PCT => Direction::Bearish,
        Some(r) if r < -FUNDING_THRESHOLD_PCT => Direction::Bullish,
        _ => Direction::Neutral,
    }
}

/// Only plain and strong trends vote; volatile or flat trends are neutral.
pub fn price_vote(trend: Trend) -> Direction {
    match trend {
        Trend::StronglyBullish | Trend::Bullish => Direction::Bullish,
        Trend::StronglyBearish | Trend::Bearish => Direction::Bearish,
        _ => Direction::Neutral,
    }
}

/// An unavailable index counts as zero.
pub fn volatility_vote(index: Option<f64>) -> VolatilityLevel {
    match index.unwrap_or(0.0) {
        v if v > VOLATILITY_UNCERTAIN => VolatilityLevel::Uncertain,
        v if v < VOLATILITY_STABLE => VolatilityLevel::Stable,
        _ => VolatilityLevel::Moderate,
    }
}

/// A non-finite change (zero baseline) never crosses either threshold.
pub fn volume_vote(change_pct: f64) -> Direction {
    match change_pct {
        c if c > VOLUME_CHANGE_THRESHOLD_PCT => Direction::Bullish,
        c if c < -VOLUME_CHANGE_THRESHOLD_PCT => Direction::Bearish,
        _ => Direction::Neutral,
    }
}

/// Resolve the votes into a sentiment label.
pub fn fuse(votes: &Votes) -> Sentiment {
    let bullish = votes.count(Direction::Bullish);
    let bearish = votes.count(Direction::Bearish);

    let majority = match bullish.cmp(&bearish) {
        Ordering::Greater if bullish >= 3 => Sentiment::HighlyPositive,
        Ordering::Greater => Sentiment::Positive,
        Ordering::Less if bearish >= 3 => Sentiment::HighlyNegative,
        Ordering::Less => Sentiment::Negative,
        Ordering::Equal => Sentiment::Mixed,
    };

    match (votes.volatility, majority, votes.price) {
        (VolatilityLevel::Uncertain, _, _) => Sentiment::Uncertain,
        (_, Sentiment::Positive, Direction::Bullish) => Sentiment::Bullish,
        (_, Sentiment::Negative, Direction::Bearish) => Sentiment::Bearish,
        (_, sentiment, _) => sentiment,
    }
}
