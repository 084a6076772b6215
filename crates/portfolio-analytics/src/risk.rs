use analysis_core::stats::round_to;
use analysis_core::{holding_weights, AnalysisError, Holding, MarketDataSource};
use futures_util::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{RiskAssessment, RiskTier, SymbolRisk};
use crate::shared_math::{
    annualized_volatility, beta, common_dates, daily_returns, dated_returns, value_at_risk,
};

/// Bars fetched per holding for the volatility tier.
pub const VOLATILITY_LOOKBACK_DAYS: usize = 30;
/// Bars fetched for single-symbol risk.
pub const SYMBOL_RISK_LOOKBACK_DAYS: usize = 252;
pub const DEFAULT_BENCHMARK: &str = "SPY";

pub struct RiskAssessor {
    source: Arc<dyn MarketDataSource>,
    volatility_lookback: usize,
    symbol_lookback: usize,
}

impl RiskAssessor {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self {
            source,
            volatility_lookback: VOLATILITY_LOOKBACK_DAYS,
            symbol_lookback: SYMBOL_RISK_LOOKBACK_DAYS,
        }
    }

    /// Concentration, diversification and volatility tiers for a snapshot.
    pub async fn assess(&self, holdings: &[Holding]) -> RiskAssessment {
        if holdings.is_empty() {
            return RiskAssessment::default();
        }

        let max_weight = holding_weights(holdings)
            .into_iter()
            .fold(0.0_f64, f64::max);
        let diversification = (holdings.len() as f64 / 10.0 * 100.0).min(100.0);

        let volatilities = self.fetch_volatilities(holdings).await;
        // Averaged per holding, so a repeated symbol counts once per entry.
        let per_holding: Vec<f64> = holdings
            .iter()
            .filter_map(|h| volatilities.get(&h.symbol.to_ascii_uppercase()).copied())
            .collect();

        let volatility_level = if per_holding.is_empty() {
            debug!(holdings = holdings.len(), "No holding has usable history");
            None
        } else {
            let average = per_holding.iter().sum::<f64>() / per_holding.len() as f64;
            Some(RiskTier::classify(average, 30.0, 20.0))
        };

        RiskAssessment {
            concentration_risk: Some(RiskTier::classify(max_weight, 0.3, 0.2)),
            diversification_score: Some(diversification),
            volatility_level,
        }
    }

    /// Annualised volatility (percent) for each distinct symbol with ≥2 returns.
    async fn fetch_volatilities(&self, holdings: &[Holding]) -> BTreeMap<String, f64> {
        let symbols: BTreeSet<String> = holdings
            .iter()
            .map(|h| h.symbol.to_ascii_uppercase())
            .collect();

        let fetches = symbols.into_iter().map(|symbol| async move {
            let history = self.source.get_history(&symbol, self.volatility_lookback).await;
            let returns = daily_returns(&history.closes());
            (symbol, returns)
        });

        join_all(fetches)
            .await
            .into_iter()
            .filter(|(_, returns)| returns.len() >= 2)
            .map(|(symbol, returns)| (symbol, annualized_volatility(&returns) * 100.0))
            .collect()
    }

    /// VaR, beta and volatility of `symbol` against `benchmark` over about a year.
    pub async fn symbol_risk(
        &self,
        symbol: &str,
        benchmark: &str,
    ) -> Result<SymbolRisk, AnalysisError> {
        let (stock, market) = futures_util::join!(
            self.source.get_history(symbol, self.symbol_lookback),
            self.source.get_history(benchmark, self.symbol_lookback)
        );

        let stock_returns = dated_returns(stock.bars());
        let market_returns = dated_returns(market.bars());
        if stock_returns.len() < 2 {
            return Err(AnalysisError::InsufficientData(format!(
                "not enough history for {symbol}"
            )));
        }

        let dates = common_dates([&stock_returns, &market_returns]);
        let paired_stock: Vec<f64> = dates.iter().map(|d| stock_returns[d]).collect();
        let paired_market: Vec<f64> = dates.iter().map(|d| market_returns[d]).collect();

        let all_stock: Vec<f64> = stock_returns.values().copied().collect();
        let var = value_at_risk(&all_stock, 0.05).ok_or_else(|| {
            AnalysisError::CalculationError(format!("empty return sample for {symbol}"))
        })?;

        info!(symbol, benchmark, observations = dates.len(), "Computed symbol risk");

        Ok(SymbolRisk {
            symbol: symbol.to_ascii_uppercase(),
            benchmark: benchmark.to_ascii_uppercase(),
            value_at_risk_95: round_to(var, 4),
            beta: round_to(beta(&paired_stock, &paired_market), 2),
            annual_volatility: round_to(annualized_volatility(&all_stock) * 100.0, 2),
            observations: dates.len(),
        })
    }
}
