use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use tokio::time::sleep;

use super::MarketDataProvider;
use crate::config::{ExchangeConfig, MAX_FETCH_RETRIES};
use crate::error::TradingError;
use crate::models::RawCandle;
use crate::Result;

const INITIAL_BACKOFF_MS: u64 = 500;
const MAX_KLINE_LIMIT: usize = 1000;

// Type alias for the rate limiter to simplify signatures
type BybitRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Public market-data client for the Bybit v5 API
///
/// Cloneable; clones share the HTTP pool and the rate limiter.
#[derive(Clone)]
pub struct BybitClient {
    client: Client,
    base_url: String,
    category: String,
    max_retries: u32,
    rate_limiter: Arc<BybitRateLimiter>,
}

/// Envelope shared by all v5 responses
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse<T> {
    ret_code: i64,
    ret_msg: String,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct KlineResult {
    #[serde(default)]
    list: Vec<RawCandle>,
}

impl BybitClient {
    pub fn new(config: &ExchangeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TradingError::Configuration(format!("HTTP client: {}", e)))?;

        let rpm = NonZeroU32::new(config.requests_per_minute.max(1))
            .unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rpm)));

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            category: config.category.clone(),
            max_retries: config.max_retries.clamp(1, MAX_FETCH_RETRIES),
            rate_limiter,
        })
    }

    /// Latest close for a symbol (the `/price` query)
    pub async fn latest_price(&self, symbol: &str, interval: &str) -> Result<f64> {
        let rows = self.fetch_candles(symbol, interval, 1).await?;
        let row = rows
            .first()
            .ok_or_else(|| TradingError::Feed(format!("no klines returned for {}", symbol)))?;

        row.get(4)
            .and_then(|close| close.parse::<f64>().ok())
            .ok_or_else(|| TradingError::missing("close"))
    }

    /// Fetch once, without retry
    async fn fetch_klines_once(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> std::result::Result<Vec<RawCandle>, FetchFailure> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/v5/market/kline", self.base_url);
        let limit = limit.clamp(1, MAX_KLINE_LIMIT).to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("category", self.category.as_str()),
                ("symbol", symbol),
                ("interval", interval),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FetchFailure::Transient(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            let err = TradingError::Feed(format!("HTTP {} from kline endpoint", status));
            // Rate limits and server errors may clear up, other 4xx will not
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                FetchFailure::Transient(err)
            } else {
                FetchFailure::Permanent(err)
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchFailure::Transient(e.into()))?;

        let parsed: ApiResponse<KlineResult> = serde_json::from_str(&body).map_err(|e| {
            FetchFailure::Permanent(TradingError::Feed(format!("malformed kline payload: {}", e)))
        })?;

        if parsed.ret_code != 0 {
            return Err(FetchFailure::Permanent(TradingError::Feed(format!(
                "venue error {}: {}",
                parsed.ret_code, parsed.ret_msg
            ))));
        }

        let result = parsed.result.ok_or_else(|| {
            FetchFailure::Permanent(TradingError::Feed("kline response without result".to_string()))
        })?;

        Ok(result.list)
    }
}

/// Whether a failed fetch is worth another attempt
enum FetchFailure {
    /// Transport error, timeout, 429 or 5xx
    Transient(TradingError),
    /// Venue rejection, other 4xx or an unreadable payload
    Permanent(TradingError),
}

#[async_trait]
impl MarketDataProvider for BybitClient {
    /// Retries transient failures with exponential backoff
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<RawCandle>> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.fetch_klines_once(symbol, interval, limit).await {
                Ok(rows) => {
                    if attempt > 1 {
                        tracing::info!(
                            "✓ Fetched {} klines for {} after {} attempts",
                            rows.len(),
                            symbol,
                            attempt
                        );
                    }
                    return Ok(rows);
                }
                Err(FetchFailure::Permanent(e)) => return Err(e),
                Err(FetchFailure::Transient(e)) => {
                    if attempt < self.max_retries {
                        let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt - 1);
                        tracing::warn!(
                            "Attempt {}/{} failed for {}: {}. Retrying in {}ms...",
                            attempt,
                            self.max_retries,
                            symbol,
                            e,
                            backoff_ms
                        );
                        sleep(Duration::from_millis(backoff_ms)).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| TradingError::Feed("all retry attempts failed".to_string())))
    }
}
