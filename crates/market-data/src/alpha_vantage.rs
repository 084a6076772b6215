use analysis_core::{Bar, History, MarketDataSource, Quote, QuoteSnapshot};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::MarketDataError;

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Largest window served by `outputsize=compact`.
const COMPACT_OUTPUT_BARS: usize = 100;

const QUOTE_KEY: &str = "Global Quote";
const DAILY_SERIES_KEY: &str = "Time Series (Daily)";

#[derive(Debug, Clone)]
pub struct AlphaVantageConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    /// Extra attempts after a transport failure, HTTP 429 or 5xx.
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl AlphaVantageConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(5),
            max_retries: 1,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Clone)]
pub struct AlphaVantageClient {
    config: AlphaVantageConfig,
    client: Client,
}

impl AlphaVantageClient {
    pub fn new(api_key: String) -> Self {
        Self::with_config(AlphaVantageConfig::new(api_key))
    }

    pub fn with_config(config: AlphaVantageConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { config, client }
    }

    /// Issue a query and return the decoded JSON body, retrying transient failures.
    async fn query(&self, params: &[(&str, &str)]) -> Result<Value, MarketDataError> {
        let mut attempt = 0u32;
        loop {
            let result = self
                .client
                .get(&self.config.base_url)
                .query(params)
                .query(&[("apikey", self.config.api_key.as_str())])
                .send()
                .await;

            let retryable = match result {
                Ok(response) if response.status().is_success() => {
                    let json: Value = response.json().await?;
                    check_provider_messages(&json)?;
                    return Ok(json);
                }
                Ok(response) => {
                    let status = response.status();
                    let err = MarketDataError::Status {
                        status: status.as_u16(),
                        body: response.text().await.unwrap_or_default(),
                    };
                    if status.as_u16() != 429 && !status.is_server_error() {
                        return Err(err);
                    }
                    err
                }
                Err(e) => MarketDataError::Request(e),
            };

            if attempt >= self.config.max_retries {
                return Err(retryable);
            }
            attempt += 1;
            let wait = self.config.retry_backoff * attempt;
            tracing::warn!(
                "Alpha Vantage request failed ({}), retry {}/{} in {}ms",
                retryable,
                attempt,
                self.config.max_retries,
                wait.as_millis()
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Fetch the current quote. `Ok(None)` means the provider knows nothing about the symbol.
    pub async fn fetch_quote(&self, symbol: &str) -> Result<Option<Quote>, MarketDataError> {
        let json = self
            .query(&[("function", "GLOBAL_QUOTE"), ("symbol", symbol)])
            .await?;
        Ok(parse_global_quote(&json, symbol))
    }

    async fn daily_series(
        &self,
        symbol: &str,
        output_size: &str,
    ) -> Result<Value, MarketDataError> {
        self.query(&[
            ("function", "TIME_SERIES_DAILY"),
            ("symbol", symbol),
            ("outputsize", output_size),
        ])
        .await
    }

    /// Fetch up to `lookback_days` daily bars, oldest first.
    ///
    /// A `full` request refused with an `Information` notice (premium-only output on
    /// free keys) is retried once as `compact`, serving the most recent 100 bars.
    pub async fn fetch_daily_bars(
        &self,
        symbol: &str,
        lookback_days: usize,
    ) -> Result<Vec<Bar>, MarketDataError> {
        let output_size = if lookback_days <= COMPACT_OUTPUT_BARS {
            "compact"
        } else {
            "full"
        };
        let json = match self.daily_series(symbol, output_size).await {
            Err(MarketDataError::Information(notice)) if output_size == "full" => {
                tracing::warn!(symbol, notice = %notice, "Full history refused, using compact");
                self.daily_series(symbol, "compact").await?
            }
            other => other?,
        };

        let bars = parse_daily_series(&json).unwrap_or_default();
        Ok(tail(bars, lookback_days))
    }
}

#[async_trait]
impl MarketDataSource for AlphaVantageClient {
    async fn get_quote(&self, symbol: &str) -> QuoteSnapshot {
        match self.fetch_quote(symbol).await {
            Ok(Some(quote)) => QuoteSnapshot::Quote(quote),
            Ok(None) => {
                tracing::debug!(symbol, "No quote data returned");
                QuoteSnapshot::EmptyQuote {
                    symbol: symbol.to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Quote fetch failed");
                QuoteSnapshot::EmptyQuote {
                    symbol: symbol.to_string(),
                }
            }
        }
    }

    async fn get_history(&self, symbol: &str, lookback_days: usize) -> History {
        match self.fetch_daily_bars(symbol, lookback_days).await {
            Ok(bars) => {
                if bars.is_empty() {
                    tracing::debug!(symbol, "No daily series returned");
                }
                History::from_bars(bars)
            }
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Daily history fetch failed");
                History::EmptyHistory
            }
        }
    }
}

/// Alpha Vantage reports errors and throttling inside a 200 response.
fn check_provider_messages(json: &Value) -> Result<(), MarketDataError> {
    if let Some(error) = json.get("Error Message") {
        return Err(MarketDataError::Provider(value_text(error)));
    }
    if let Some(note) = json.get("Note") {
        return Err(MarketDataError::RateLimited(value_text(note)));
    }
    if let Some(info) = json.get("Information") {
        return Err(MarketDataError::Information(value_text(info)));
    }
    Ok(())
}

fn value_text(value: &Value) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

/// Read a numeric field that the provider may encode as a string.
fn field_f64(obj: &Value, key: &str) -> Option<f64> {
    match obj.get(key)? {
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Map a `GLOBAL_QUOTE` payload. Missing numeric fields default to zero; a missing or
/// empty `Global Quote` object means no data.
pub fn parse_global_quote(json: &Value, symbol: &str) -> Option<Quote> {
    let quote = json.get(QUOTE_KEY)?;
    if quote.as_object().map_or(true, |o| o.is_empty()) {
        return None;
    }

    Some(Quote {
        symbol: quote
            .get("01. symbol")
            .and_then(|v| v.as_str())
            .unwrap_or(symbol)
            .to_string(),
        price: field_f64(quote, "05. price").unwrap_or(0.0),
        change: field_f64(quote, "09. change").unwrap_or(0.0),
        change_percent: field_f64(quote, "10. change percent").unwrap_or(0.0),
    })
}

/// Map a `TIME_SERIES_DAILY` payload into bars sorted by date, one per date.
/// Rows with an unparseable date or price are skipped.
pub fn parse_daily_series(json: &Value) -> Option<Vec<Bar>> {
    let series = json.get(DAILY_SERIES_KEY)?.as_object()?;

    let mut by_date: BTreeMap<NaiveDate, Bar> = BTreeMap::new();
    for (date_str, values) in series {
        let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
            continue;
        };
        let fields = (
            field_f64(values, "1. open"),
            field_f64(values, "2. high"),
            field_f64(values, "3. low"),
            field_f64(values, "4. close"),
            field_f64(values, "5. volume"),
        );
        if let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = fields {
            by_date.insert(
                date,
                Bar {
                    date,
                    open,
                    high,
                    low,
                    close,
                    volume,
                },
            );
        }
    }

    Some(by_date.into_values().collect())
}

fn tail(mut bars: Vec<Bar>, n: usize) -> Vec<Bar> {
    if bars.len() > n {
        bars.drain(..bars.len() - n);
    }
    bars
}
