use analysis_core::{Bar, History, MarketDataSource, Quote, QuoteSnapshot};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        Utc::now() - self.cached_at < ttl
    }
}

/// Short-TTL cache in front of another source. Only non-empty responses are cached,
/// so a provider outage is retried on the next call.
pub struct CachedMarketData {
    inner: Arc<dyn MarketDataSource>,
    ttl: Duration,
    /// Quotes per symbol
    quotes: DashMap<String, CacheEntry<Quote>>,
    /// Bars per (symbol, lookback)
    histories: DashMap<(String, usize), CacheEntry<Vec<Bar>>>,
}

impl CachedMarketData {
    pub fn new(inner: Arc<dyn MarketDataSource>, ttl: std::time::Duration) -> Self {
        Self {
            inner,
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::zero()),
            quotes: DashMap::new(),
            histories: DashMap::new(),
        }
    }

    pub fn clear(&self) {
        self.quotes.clear();
        self.histories.clear();
    }

    fn key(symbol: &str) -> String {
        symbol.trim().to_ascii_uppercase()
    }

    /// Drop every expired entry; runs on each insert.
    fn purge_expired(&self) {
        self.quotes.retain(|_, entry| entry.is_fresh(self.ttl));
        self.histories.retain(|_, entry| entry.is_fresh(self.ttl));
    }
}

#[async_trait]
impl MarketDataSource for CachedMarketData {
    async fn get_quote(&self, symbol: &str) -> QuoteSnapshot {
        let key = Self::key(symbol);
        if let Some(entry) = self.quotes.get(&key) {
            if entry.is_fresh(self.ttl) {
                tracing::debug!(symbol, "Quote cache hit");
                return QuoteSnapshot::Quote(entry.data.clone());
            }
        }

        let snapshot = self.inner.get_quote(symbol).await;
        if let QuoteSnapshot::Quote(quote) = &snapshot {
            self.purge_expired();
            self.quotes.insert(key, CacheEntry::new(quote.clone()));
        }
        snapshot
    }

    async fn get_history(&self, symbol: &str, lookback_days: usize) -> History {
        let key = (Self::key(symbol), lookback_days);
        if let Some(entry) = self.histories.get(&key) {
            if entry.is_fresh(self.ttl) {
                tracing::debug!(symbol, lookback_days, "History cache hit");
                return History::from_bars(entry.data.clone());
            }
        }

        let history = self.inner.get_history(symbol, lookback_days).await;
        if let History::Series(bars) = &history {
            self.purge_expired();
            self.histories.insert(key, CacheEntry::new(bars.clone()));
        }
        history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{bars_from_closes, StaticMarketData};
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls that reach the wrapped source.
    struct CountingSource {
        inner: StaticMarketData,
        quote_calls: AtomicUsize,
        history_calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketDataSource for CountingSource {
        async fn get_quote(&self, symbol: &str) -> QuoteSnapshot {
            self.quote_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_quote(symbol).await
        }

        async fn get_history(&self, symbol: &str, lookback_days: usize) -> History {
            self.history_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_history(symbol, lookback_days).await
        }
    }

    fn counting_source() -> Arc<CountingSource> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = bars_from_closes(start, &[10.0, 11.0, 12.0, 13.0]);
        Arc::new(CountingSource {
            inner: StaticMarketData::new().with_history("AAPL", bars),
            quote_calls: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_repeat_calls_served_from_cache() {
        let source = counting_source();
        let cache = CachedMarketData::new(source.clone(), std::time::Duration::from_secs(60));

        let first = cache.get_history("AAPL", 3).await;
        let second = cache.get_history("aapl", 3).await;
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(source.history_calls.load(Ordering::SeqCst), 1);

        cache.get_quote("AAPL").await;
        cache.get_quote("AAPL").await;
        assert_eq!(source.quote_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lookback_is_part_of_key() {
        let source = counting_source();
        let cache = CachedMarketData::new(source.clone(), std::time::Duration::from_secs(60));

        assert_eq!(cache.get_history("AAPL", 2).await.len(), 2);
        assert_eq!(cache.get_history("AAPL", 4).await.len(), 4);
        assert_eq!(source.history_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_results_not_cached() {
        let source = counting_source();
        let cache = CachedMarketData::new(source.clone(), std::time::Duration::from_secs(60));

        assert!(cache.get_history("MSFT", 10).await.is_empty());
        assert!(cache.get_history("MSFT", 10).await.is_empty());
        assert_eq!(source.history_calls.load(Ordering::SeqCst), 2);

        assert!(cache.get_quote("MSFT").await.is_empty());
        assert!(cache.get_quote("MSFT").await.is_empty());
        assert_eq!(source.quote_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let source = counting_source();
        let cache = CachedMarketData::new(source.clone(), std::time::Duration::ZERO);

        cache.get_history("AAPL", 3).await;
        cache.get_history("AAPL", 3).await;
        assert_eq!(source.history_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_entries_are_evicted_on_insert() {
        let source = counting_source();
        let cache = CachedMarketData::new(source, std::time::Duration::from_millis(1));

        for lookback in 1..=50 {
            cache.get_history("AAPL", lookback).await;
        }
        cache.get_quote("AAPL").await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        cache.get_history("AAPL", 2).await;
        assert_eq!(cache.histories.len(), 1);
        assert!(cache.histories.contains_key(&("AAPL".to_string(), 2)));
        assert!(cache.quotes.is_empty());

        cache.get_quote("AAPL").await;
        assert_eq!(cache.quotes.len(), 1);
    }
}
