use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Trading days used to annualize daily statistics.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Daily OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Current quote for a ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
}

impl Quote {
    /// Zero-valued quote returned when the provider has nothing for `symbol`.
    pub fn zero(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            price: 0.0,
            change: 0.0,
            change_percent: 0.0,
        }
    }
}

/// Read-only projection of a portfolio position handed to the analytics engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub shares: f64,
    pub market_value: f64,
    pub gain_loss: f64,
}

impl Holding {
    pub fn new(symbol: impl Into<String>, shares: f64, market_value: f64, gain_loss: f64) -> Self {
        Self {
            symbol: symbol.into(),
            shares,
            market_value,
            gain_loss,
        }
    }
}

/// Total market value of a holdings snapshot.
pub fn total_market_value(holdings: &[Holding]) -> f64 {
    holdings.iter().map(|h| h.market_value).sum()
}

/// Weight of each holding as a fraction of total market value.
/// All weights are 0 when the total is not positive.
pub fn holding_weights(holdings: &[Holding]) -> Vec<f64> {
    let total = total_market_value(holdings);
    holdings
        .iter()
        .map(|h| if total > 0.0 { h.market_value / total } else { 0.0 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holding_weights() {
        let holdings = vec![
            Holding::new("AAPL", 10.0, 750.0, 20.0),
            Holding::new("MSFT", 5.0, 250.0, -5.0),
        ];
        let weights = holding_weights(&holdings);
        assert!((weights[0] - 0.75).abs() < 1e-12);
        assert!((weights[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_holding_weights_zero_total() {
        let holdings = vec![Holding::new("AAPL", 0.0, 0.0, 0.0)];
        assert_eq!(holding_weights(&holdings), vec![0.0]);
    }

    #[test]
    fn test_zero_quote() {
        let quote = Quote::zero("IBM");
        assert_eq!(quote.symbol, "IBM");
        assert_eq!(quote.price, 0.0);
        assert_eq!(quote.change_percent, 0.0);
    }
}
