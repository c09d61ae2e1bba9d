// =============================================================================
// Runtime Configuration — engine settings with atomic save
// =============================================================================
//
// Upstream endpoint, paging limits and the HTTP bind address. Every field
// carries `#[serde(default = "...")]` so a partial or older config file still
// loads. Environment variables override the file after loading:
//
//   BITGET_BASE_URL   upstream REST base URL
//   FUNDY_BIND_ADDR   HTTP listen address
//
// Persistence uses an atomic tmp + rename pattern.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const CONFIG_FILE: &str = "fundy_config.json";

// =============================================================================
// Default-value helpers
// =============================================================================

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_base_url() -> String {
    "https://api.bitget.com".to_string()
}

fn default_product_type() -> String {
    "USDT-FUTURES".to_string()
}

fn default_max_bars_per_call() -> u32 {
    1000
}

fn default_funding_page_size() -> u32 {
    100
}

fn default_funding_max_pages() -> u32 {
    5
}

fn default_request_timeout_secs() -> u64 {
    10
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Address the HTTP API listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    // --- Upstream -----------------------------------------------------------

    /// Bitget REST base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Contract family queried on every market endpoint.
    #[serde(default = "default_product_type")]
    pub product_type: String,

    /// Page size of one candle request; also the chunk size of the range
    /// chunker.
    #[serde(default = "default_max_bars_per_call")]
    pub max_bars_per_call: u32,

    #[serde(default = "default_funding_page_size")]
    pub funding_page_size: u32,

    /// Upper bound on funding-history pages walked per request.
    #[serde(default = "default_funding_max_pages")]
    pub funding_max_pages: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            base_url: default_base_url(),
            product_type: default_product_type(),
            max_bars_per_call: default_max_bars_per_call(),
            funding_page_size: default_funding_page_size(),
            funding_max_pages: default_funding_max_pages(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing or malformed file is an error so the caller can fall back to
    /// defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            base_url = %config.base_url,
            bind_addr = %config.bind_addr,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Apply `BITGET_BASE_URL` / `FUNDY_BIND_ADDR` from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = non_empty("BITGET_BASE_URL") {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(addr) = non_empty("FUNDY_BIND_ADDR") {
            self.bind_addr = addr;
        }
    }

    /// Persist the configuration to `path` (write `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.base_url, "https://api.bitget.com");
        assert_eq!(cfg.product_type, "USDT-FUTURES");
        assert_eq!(cfg.max_bars_per_call, 1000);
        assert_eq!(cfg.funding_page_size, 100);
        assert_eq!(cfg.funding_max_pages, 5);
        assert_eq!(cfg.request_timeout_secs, 10);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, RuntimeConfig::default());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "max_bars_per_call": 200, "bind_addr": "127.0.0.1:9000" }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.max_bars_per_call, 200);
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.funding_max_pages, 5);
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut cfg = RuntimeConfig::default();
        cfg.apply_overrides(|key| match key {
            "BITGET_BASE_URL" => Some("http://localhost:3000/".into()),
            "FUNDY_BIND_ADDR" => Some("  ".into()),
            _ => None,
        });
        assert_eq!(cfg.base_url, "http://localhost:3000");
        // Blank values are ignored.
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join(format!("fundy_config_{}.json", std::process::id()));
        let mut cfg = RuntimeConfig::default();
        cfg.funding_page_size = 50;
        cfg.save(&path).unwrap();

        let loaded = RuntimeConfig::load(&path).unwrap();
        assert_eq!(loaded, cfg);
        assert!(!path.with_extension("json.tmp").exists());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_error() {
        assert!(RuntimeConfig::load("/nonexistent/fundy_config.json").is_err());
    }
}
