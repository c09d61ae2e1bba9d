// =============================================================================
// Bitget REST API Client — public USDT-M futures market data
// =============================================================================
//
// Only public market endpoints are used, so requests carry no signature.
// Query parameters are always form-encoded by reqwest, never spliced into the
// URL by hand: a symbol taken from a request path cannot add parameters.
// Every response is wrapped as `{"code":"00000","msg":"success","data":...}`;
// a non-2xx status or a code other than "00000" is an error carrying the
// status and body.
//
// Numbers arrive string-encoded. A price that does not parse becomes `NaN`
// and is filtered downstream; a row without a parseable timestamp is dropped.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::market_data::{Granularity, MarketDataProvider};
use crate::runtime_config::RuntimeConfig;
use crate::types::{Candle, FundingEvent};

const SUCCESS_CODE: &str = "00000";

/// Columns of one candle row: ts, open, high, low, close, base vol, quote vol.
const CANDLE_FIELDS: usize = 7;

/// Bitget REST client bound to one product type.
#[derive(Clone)]
pub struct BitgetClient {
    base_url: String,
    product_type: String,
    client: reqwest::Client,
}

impl BitgetClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    pub fn new(
        base_url: impl Into<String>,
        product_type: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = %base_url, "BitgetClient initialised");

        Ok(Self {
            base_url,
            product_type: product_type.into(),
            client,
        })
    }

    pub fn from_config(config: &RuntimeConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            &config.product_type,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------

    /// Build a GET for `path`; `productType` is appended to `params`.
    fn build_get(&self, path: &str, params: &[(&str, String)]) -> Result<reqwest::Request> {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .query(params)
            .query(&[("productType", self.product_type.as_str())])
            .build()
            .with_context(|| format!("failed to build GET {path}"))
    }

    /// GET `path` with `params` and return the `data` member of the envelope.
    async fn get_data(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let request = self.build_get(path, params)?;
        let resp = self
            .client
            .execute(request)
            .await
            .with_context(|| format!("GET {path} request failed"))?;

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse {path} response"))?;

        if !status.is_success() {
            anyhow::bail!("Bitget GET {} returned {}: {}", path, status, body);
        }

        match body["code"].as_str() {
            Some(SUCCESS_CODE) | None => Ok(body["data"].clone()),
            Some(code) => anyhow::bail!("Bitget GET {} returned code {}: {}", path, code, body),
        }
    }

    // -------------------------------------------------------------------------
    // Market data
    // -------------------------------------------------------------------------

    /// GET /api/v2/mix/market/candles.
    #[instrument(skip(self), name = "bitget::get_candles")]
    pub async fn get_candles(
        &self,
        symbol: &str,
        granularity: Granularity,
        start_ms: i64,
        end_ms: i64,
        limit: u32,
    ) -> Result<Vec<Candle>> {
        let params = [
            ("symbol", symbol.to_string()),
            ("granularity", granularity.to_string()),
            ("limit", limit.to_string()),
            ("startTime", start_ms.to_string()),
            ("endTime", end_ms.to_string()),
        ];
        let data = self.get_data("/api/v2/mix/market/candles", &params).await?;
        let candles = parse_candles(&data)?;

        debug!(symbol, granularity = %granularity, count = candles.len(), "candles fetched");
        Ok(candles)
    }

    /// GET /api/v2/mix/market/history-fund-rate (one page).
    #[instrument(skip(self), name = "bitget::get_funding_history")]
    pub async fn get_funding_history(
        &self,
        symbol: &str,
        page_no: u32,
        page_size: u32,
    ) -> Result<Vec<FundingEvent>> {
        let params = [
            ("symbol", symbol.to_string()),
            ("pageSize", page_size.to_string()),
            ("pageNo", page_no.to_string()),
        ];
        let data = self
            .get_data("/api/v2/mix/market/history-fund-rate", &params)
            .await?;
        let events = parse_funding_events(&data)?;

        debug!(symbol, page_no, count = events.len(), "funding history page fetched");
        Ok(events)
    }

    /// GET /api/v2/mix/market/current-fund-rate, as a percentage.
    #[instrument(skip(self), name = "bitget::get_current_funding_rate")]
    pub async fn get_current_funding_rate(&self, symbol: &str) -> Result<f64> {
        let data = self
            .get_data("/api/v2/mix/market/current-fund-rate", &[("symbol", symbol.to_string())])
            .await?;
        let entry = data
            .as_array()
            .and_then(|arr| arr.first())
            .context("current-fund-rate response has no entries")?;
        let rate = parse_str_f64(&entry["fundingRate"])?;
        Ok(rate * 100.0)
    }
}

#[async_trait]
impl MarketDataProvider for BitgetClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        granularity: Granularity,
        start_ms: i64,
        end_ms: i64,
        limit: u32,
    ) -> Result<Vec<Candle>> {
        self.get_candles(symbol, granularity, start_ms, end_ms, limit)
            .await
    }

    async fn fetch_funding_rate_history(
        &self,
        symbol: &str,
        page_no: u32,
        page_size: u32,
    ) -> Result<Vec<FundingEvent>> {
        self.get_funding_history(symbol, page_no, page_size).await
    }

    async fn fetch_current_funding_rate(&self, symbol: &str) -> Result<f64> {
        self.get_current_funding_rate(symbol).await
    }
}

impl std::fmt::Debug for BitgetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitgetClient")
            .field("base_url", &self.base_url)
            .field("product_type", &self.product_type)
            .finish()
    }
}

// =============================================================================
// Response parsing
// =============================================================================

/// Parse the candles `data` array, oldest first.
fn parse_candles(data: &Value) -> Result<Vec<Candle>> {
    let raw = data.as_array().context("candles response is not an array")?;

    let mut candles = Vec::with_capacity(raw.len());
    for entry in raw {
        let arr = match entry.as_array() {
            Some(arr) if arr.len() >= CANDLE_FIELDS => arr,
            _ => {
                warn!(entry = %entry, "skipping malformed candle row");
                continue;
            }
        };

        let Ok(timestamp_ms) = parse_str_i64(&arr[0]) else {
            warn!(entry = %entry, "skipping candle row without timestamp");
            continue;
        };

        let num = |i: usize| parse_str_f64(&arr[i]).unwrap_or(f64::NAN);
        candles.push(Candle::new(
            timestamp_ms,
            num(1),
            num(2),
            num(3),
            num(4),
            num(5),
            num(6),
        ));
    }

    candles.sort_by_key(|c| c.timestamp_ms);
    Ok(candles)
}

/// Parse the funding-history `data` array; rates become percentages.
fn parse_funding_events(data: &Value) -> Result<Vec<FundingEvent>> {
    let raw = data
        .as_array()
        .context("funding history response is not an array")?;

    raw.iter()
        .map(|fr| {
            Ok(FundingEvent {
                symbol: fr["symbol"].as_str().unwrap_or_default().to_string(),
                rate_pct: parse_str_f64(&fr["fundingRate"])? * 100.0,
                funding_time: parse_str_i64(&fr["fundingTime"])?,
            })
        })
        .collect()
}

/// Parse a JSON value that may be either a string or a number into `f64`.
fn parse_str_f64(val: &Value) -> Result<f64> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .with_context(|| format!("failed to parse '{s}' as f64"))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        anyhow::bail!("expected string or number, got: {val}")
    }
}

fn parse_str_i64(val: &Value) -> Result<i64> {
    if let Some(s) = val.as_str() {
        s.parse::<i64>()
            .with_context(|| format!("failed to parse '{s}' as i64"))
    } else if let Some(n) = val.as_i64() {
        Ok(n)
    } else {
        anyhow::bail!("expected string or integer, got: {val}")
    }
}
