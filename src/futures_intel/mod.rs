// =============================================================================
// Futures Intelligence Module
// =============================================================================
//
// Perpetual-futures specific data sources. Funding settlements anchor the
// analysis windows and contribute the funding vote to sentiment fusion.
// =============================================================================

pub mod funding_rate;

pub use funding_rate::{FundingRateService, DEFAULT_SPIKE_THRESHOLD_PCT};
