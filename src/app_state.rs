// =============================================================================
// Central Application State — Fundy analysis service
// =============================================================================
//
// Shared by every HTTP handler through `Arc<AppState>`. The analyzer and the
// funding service are cheap to clone and hold the provider behind an `Arc`;
// the only mutable state is the capped error log and a request counter.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::analysis::MarketAnalyzer;
use crate::futures_intel::FundingRateService;
use crate::market_data::{CandleFetcher, MarketDataProvider};
use crate::runtime_config::RuntimeConfig;

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

/// A failed request, kept for `GET /api/v1/errors`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// Symbol the failing request was about, if any.
    pub symbol: Option<String>,
    /// RFC 3339 timestamp.
    pub at: String,
}

pub struct AppState {
    /// Effective config after env overrides; reported by `/health`.
    pub runtime_config: RuntimeConfig,
    pub analyzer: MarketAnalyzer,

    /// Completed assessments since start.
    pub analyses_served: AtomicU64,

    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    pub start_time: std::time::Instant,
}

impl AppState {
    /// Wire the analyzer and funding service onto `provider`.
    pub fn new(config: RuntimeConfig, provider: Arc<dyn MarketDataProvider>) -> Self {
        let fetcher = CandleFetcher::new(provider.clone(), config.max_bars_per_call);
        let funding = FundingRateService::new(
            provider,
            config.funding_page_size,
            config.funding_max_pages,
        );

        Self {
            runtime_config: config,
            analyzer: MarketAnalyzer::new(fetcher, funding),
            analyses_served: AtomicU64::new(0),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn funding(&self) -> &FundingRateService {
        self.analyzer.funding()
    }

    pub fn candles(&self) -> &CandleFetcher {
        self.analyzer.fetcher()
    }

    pub fn record_analysis(&self) -> u64 {
        self.analyses_served.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record an error; oldest entries are evicted past [`MAX_RECENT_ERRORS`].
    pub fn push_error(&self, msg: String, symbol: Option<&str>) {
        let record = ErrorRecord {
            message: msg,
            symbol: symbol.map(str::to_string),
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::provider::fixture::FixtureProvider;

    fn state() -> AppState {
        AppState::new(RuntimeConfig::default(), Arc::new(FixtureProvider::new()))
    }

    #[test]
    fn error_log_is_capped() {
        let s = state();
        for i in 0..(MAX_RECENT_ERRORS + 5) {
            s.push_error(format!("error {i}"), Some("BTCUSDT"));
        }
        let errors = s.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].message, "error 5");
        assert_eq!(errors[0].symbol.as_deref(), Some("BTCUSDT"));
    }

    #[test]
    fn analysis_counter() {
        let s = state();
        assert_eq!(s.record_analysis(), 1);
        assert_eq!(s.record_analysis(), 2);
        assert_eq!(s.analyses_served.load(Ordering::Relaxed), 2);
    }
}
