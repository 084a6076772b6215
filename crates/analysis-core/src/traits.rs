use async_trait::async_trait;
use std::sync::Arc;

use crate::{Bar, Quote};

/// Outcome of a quote lookup at the provider boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteSnapshot {
    Quote(Quote),
    EmptyQuote { symbol: String },
}

impl QuoteSnapshot {
    pub fn is_empty(&self) -> bool {
        matches!(self, QuoteSnapshot::EmptyQuote { .. })
    }

    /// Collapse into a quote; an empty snapshot becomes the zero-valued quote.
    pub fn into_quote(self) -> Quote {
        match self {
            QuoteSnapshot::Quote(quote) => quote,
            QuoteSnapshot::EmptyQuote { symbol } => Quote::zero(&symbol),
        }
    }
}

/// Outcome of a daily-history lookup. A `Series` is never empty and is ordered by
/// date ascending with no duplicate dates.
#[derive(Debug, Clone, PartialEq)]
pub enum History {
    Series(Vec<Bar>),
    EmptyHistory,
}

impl History {
    pub fn from_bars(bars: Vec<Bar>) -> Self {
        if bars.is_empty() {
            History::EmptyHistory
        } else {
            History::Series(bars)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, History::EmptyHistory)
    }

    pub fn len(&self) -> usize {
        self.bars().len()
    }

    pub fn bars(&self) -> &[Bar] {
        match self {
            History::Series(bars) => bars,
            History::EmptyHistory => &[],
        }
    }

    pub fn into_bars(self) -> Vec<Bar> {
        match self {
            History::Series(bars) => bars,
            History::EmptyHistory => Vec::new(),
        }
    }

    /// Closing prices in date order.
    pub fn closes(&self) -> Vec<f64> {
        self.bars().iter().map(|b| b.close).collect()
    }
}

/// Source of quotes and daily bars.
///
/// Implementations must not fail: provider or network problems surface as
/// `QuoteSnapshot::EmptyQuote` and `History::EmptyHistory`.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn get_quote(&self, symbol: &str) -> QuoteSnapshot;

    /// Most recent `lookback_days` daily bars (most recent last).
    async fn get_history(&self, symbol: &str, lookback_days: usize) -> History;
}

#[async_trait]
impl<T: MarketDataSource + ?Sized> MarketDataSource for Arc<T> {
    async fn get_quote(&self, symbol: &str) -> QuoteSnapshot {
        (**self).get_quote(symbol).await
    }

    async fn get_history(&self, symbol: &str, lookback_days: usize) -> History {
        (**self).get_history(symbol, lookback_days).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000.0,
        }
    }

    #[test]
    fn test_empty_quote_collapses_to_zero() {
        let snapshot = QuoteSnapshot::EmptyQuote {
            symbol: "XYZ".to_string(),
        };
        assert!(snapshot.is_empty());
        let quote = snapshot.into_quote();
        assert_eq!(quote.symbol, "XYZ");
        assert_eq!(quote.price, 0.0);
    }

    #[test]
    fn test_history_from_empty_bars() {
        let history = History::from_bars(Vec::new());
        assert!(history.is_empty());
        assert_eq!(history.len(), 0);
        assert!(history.into_bars().is_empty());
    }

    #[test]
    fn test_history_closes() {
        let history = History::from_bars(vec![bar(2, 10.0), bar(3, 11.0)]);
        assert!(!history.is_empty());
        assert_eq!(history.closes(), vec![10.0, 11.0]);
    }
}
