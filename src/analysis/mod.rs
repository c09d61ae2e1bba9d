// =============================================================================
// Analysis Engine
// =============================================================================
//
// The orchestrator drives one assessment: concurrent window fetches, the
// dependent volatility step, sentiment fusion and report sanitisation.
// =============================================================================

pub mod orchestrator;
pub mod report;
pub mod sentiment;

pub use orchestrator::MarketAnalyzer;
pub use report::Report;
