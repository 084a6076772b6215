use analysis_core::{Bar, History, MarketDataSource, Quote, QuoteSnapshot};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::MarketDataError;

/// In-memory source backed by pre-loaded bars. Used for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    histories: HashMap<String, Vec<Bar>>,
    quotes: HashMap<String, Quote>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a fixture file shaped as `{ "SYMBOL": [bar, ...], ... }`.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, MarketDataError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let fixtures: HashMap<String, Vec<Bar>> = serde_json::from_str(&content)?;

        let mut source = Self::new();
        for (symbol, bars) in fixtures {
            source.insert_history(&symbol, bars);
        }
        Ok(source)
    }

    pub fn with_history(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.insert_history(symbol, bars);
        self
    }

    pub fn with_quote(mut self, quote: Quote) -> Self {
        self.quotes.insert(Self::key(&quote.symbol), quote);
        self
    }

    /// Store bars for `symbol`, sorted by date with later duplicates winning.
    pub fn insert_history(&mut self, symbol: &str, bars: Vec<Bar>) {
        let by_date: BTreeMap<NaiveDate, Bar> = bars.into_iter().map(|b| (b.date, b)).collect();
        self.histories
            .insert(Self::key(symbol), by_date.into_values().collect());
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.histories.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    fn key(symbol: &str) -> String {
        symbol.trim().to_ascii_uppercase()
    }

    /// Quote implied by the last two bars.
    fn derived_quote(symbol: &str, bars: &[Bar]) -> Option<Quote> {
        let last = bars.last()?;
        let previous = if bars.len() >= 2 {
            bars[bars.len() - 2].close
        } else {
            last.close
        };
        let change = last.close - previous;
        let change_percent = if previous != 0.0 {
            change / previous * 100.0
        } else {
            0.0
        };
        Some(Quote {
            symbol: symbol.to_string(),
            price: last.close,
            change,
            change_percent,
        })
    }
}

#[async_trait]
impl MarketDataSource for StaticMarketData {
    async fn get_quote(&self, symbol: &str) -> QuoteSnapshot {
        let key = Self::key(symbol);
        let quote = self.quotes.get(&key).cloned().or_else(|| {
            self.histories
                .get(&key)
                .and_then(|bars| Self::derived_quote(&key, bars))
        });

        match quote {
            Some(quote) => QuoteSnapshot::Quote(quote),
            None => QuoteSnapshot::EmptyQuote {
                symbol: symbol.to_string(),
            },
        }
    }

    async fn get_history(&self, symbol: &str, lookback_days: usize) -> History {
        let bars = match self.histories.get(&Self::key(symbol)) {
            Some(bars) => bars,
            None => return History::EmptyHistory,
        };
        let start = bars.len().saturating_sub(lookback_days);
        History::from_bars(bars[start..].to_vec())
    }
}

/// Build one bar per calendar day from a close series. Each bar opens at the
/// previous close and spans 1% around its body; volume varies on a weekly cycle.
pub fn bars_from_closes(start: NaiveDate, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: start + Duration::days(i as i64),
                open,
                high: open.max(close) * 1.01,
                low: open.min(close) * 0.99,
                close,
                volume: 1_000_000.0 + (i % 7) as f64 * 50_000.0,
            }
        })
        .collect()
}
