//! Position valuation and transaction bookkeeping for the record-management layer.

use analysis_core::{AnalysisError, Holding};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub shares: f64,
    pub average_price: f64,
}

/// A position marked to a current price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuedHolding {
    pub symbol: String,
    pub shares: f64,
    pub average_price: f64,
    pub current_price: f64,
    pub market_value: f64,
    pub gain_loss: f64,
    pub gain_loss_percent: f64,
}

impl ValuedHolding {
    /// Snapshot handed to the analytics engines.
    pub fn as_holding(&self) -> Holding {
        Holding::new(self.symbol.clone(), self.shares, self.market_value, self.gain_loss)
    }
}

pub fn value_position(position: &Position, current_price: f64) -> ValuedHolding {
    let gain_loss_percent = if position.average_price > 0.0 {
        (current_price - position.average_price) / position.average_price * 100.0
    } else {
        0.0
    };

    ValuedHolding {
        symbol: position.symbol.clone(),
        shares: position.shares,
        average_price: position.average_price,
        current_price,
        market_value: position.shares * current_price,
        gain_loss: (current_price - position.average_price) * position.shares,
        gain_loss_percent,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub symbol: String,
    pub transaction_type: TransactionType,
    pub shares: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionOutcome {
    /// `None` once a sell closes the position.
    pub position: Option<Position>,
    pub total_amount: f64,
}

/// Apply a buy or sell to the existing position in the same symbol.
///
/// Buys re-average the cost basis (or open a position); sells reduce shares
/// and close the position at zero or below.
pub fn apply_transaction(
    existing: Option<&Position>,
    transaction: &Transaction,
) -> Result<TransactionOutcome, AnalysisError> {
    if transaction.shares <= 0.0 || !transaction.shares.is_finite() {
        return Err(AnalysisError::InvalidData(format!(
            "shares must be positive, got {}",
            transaction.shares
        )));
    }
    if transaction.price < 0.0 || !transaction.price.is_finite() {
        return Err(AnalysisError::InvalidData(format!(
            "price must be non-negative, got {}",
            transaction.price
        )));
    }
    if let Some(position) = existing {
        if !position.symbol.eq_ignore_ascii_case(&transaction.symbol) {
            return Err(AnalysisError::InvalidData(format!(
                "transaction for {} applied to position in {}",
                transaction.symbol, position.symbol
            )));
        }
        if position.shares <= 0.0 || !position.shares.is_finite() {
            return Err(AnalysisError::InvalidData(format!(
                "existing position in {} has invalid shares {}",
                position.symbol, position.shares
            )));
        }
    }

    let total_amount = transaction.shares * transaction.price;

    let position = match (existing, transaction.transaction_type) {
        (Some(position), TransactionType::Buy) => {
            let total_cost = position.shares * position.average_price + total_amount;
            let shares = position.shares + transaction.shares;
            Some(Position {
                symbol: position.symbol.clone(),
                shares,
                average_price: total_cost / shares,
            })
        }
        (None, TransactionType::Buy) => Some(Position {
            symbol: transaction.symbol.clone(),
            shares: transaction.shares,
            average_price: transaction.price,
        }),
        (Some(position), TransactionType::Sell) => {
            let shares = position.shares - transaction.shares;
            (shares > 0.0).then(|| Position {
                symbol: position.symbol.clone(),
                shares,
                average_price: position.average_price,
            })
        }
        (None, TransactionType::Sell) => {
            return Err(AnalysisError::InvalidData(format!(
                "no position in {} to sell",
                transaction.symbol
            )))
        }
    };

    Ok(TransactionOutcome {
        position,
        total_amount,
    })
}
