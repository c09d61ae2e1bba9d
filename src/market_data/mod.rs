// =============================================================================
// Market Data — granularities, range chunking and candle fetching
// =============================================================================
//
// Everything upstream-facing that the indicators read from goes through
// `CandleFetcher`, which walks the chunk plan against a `MarketDataProvider`.
// =============================================================================

pub mod chunker;
pub mod fetcher;
pub mod granularity;
pub mod provider;
pub mod series;

// Re-exports for convenient access (e.g. `use crate::market_data::Series`).
pub use chunker::chunk;
pub use fetcher::{CandleFetcher, FallbackPlan};
pub use granularity::Granularity;
pub use provider::MarketDataProvider;
pub use series::Series;
