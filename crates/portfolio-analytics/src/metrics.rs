use analysis_core::stats::round_to;
use analysis_core::{holding_weights, AnalysisError, Holding, MarketDataSource};
use chrono::NaiveDate;
use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{MetricsResult, PortfolioMetrics};
use crate::shared_math::{
    annualized_return, annualized_volatility, common_dates, dated_returns, max_drawdown,
    sharpe_ratio,
};

/// Roughly one trading year.
pub const METRICS_LOOKBACK_DAYS: usize = 252;

pub struct PortfolioMetricsEngine {
    source: Arc<dyn MarketDataSource>,
    lookback_days: usize,
}

impl PortfolioMetricsEngine {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self {
            source,
            lookback_days: METRICS_LOOKBACK_DAYS,
        }
    }

    pub fn with_lookback(mut self, lookback_days: usize) -> Self {
        self.lookback_days = lookback_days;
        self
    }

    /// Risk/return metrics of the weighted holdings, or `Empty` without data.
    pub async fn compute(&self, holdings: &[Holding]) -> MetricsResult {
        match self.try_compute(holdings).await {
            Ok(metrics) => MetricsResult::Computed(metrics),
            Err(e) => {
                debug!(error = %e, "Portfolio metrics unavailable");
                MetricsResult::Empty {}
            }
        }
    }

    pub async fn try_compute(
        &self,
        holdings: &[Holding],
    ) -> Result<PortfolioMetrics, AnalysisError> {
        if holdings.is_empty() {
            return Err(AnalysisError::InsufficientData("no holdings".to_string()));
        }
        if holdings.iter().map(|h| h.market_value).sum::<f64>() <= 0.0 {
            return Err(AnalysisError::InvalidData(
                "total market value is not positive".to_string(),
            ));
        }

        // Weights are over the full snapshot; a repeated symbol accumulates.
        let mut weights: BTreeMap<String, f64> = BTreeMap::new();
        for (holding, weight) in holdings.iter().zip(holding_weights(holdings)) {
            *weights.entry(holding.symbol.to_ascii_uppercase()).or_insert(0.0) += weight;
        }

        let returns = self.fetch_returns(weights.keys()).await;
        if returns.is_empty() {
            return Err(AnalysisError::InsufficientData(
                "no holding has price history".to_string(),
            ));
        }

        let dates = common_dates(returns.values());
        if dates.is_empty() {
            return Err(AnalysisError::InsufficientData(
                "no common dates across holdings".to_string(),
            ));
        }

        let portfolio: Vec<f64> = dates
            .iter()
            .map(|d| {
                returns
                    .iter()
                    .map(|(symbol, series)| weights[symbol] * series[d])
                    .sum()
            })
            .collect();

        let annual_return = annualized_return(&portfolio);
        let annual_volatility = annualized_volatility(&portfolio);
        let sharpe = sharpe_ratio(annual_return, annual_volatility);

        info!(
            symbols = returns.len(),
            observations = portfolio.len(),
            "Computed portfolio metrics"
        );

        Ok(PortfolioMetrics {
            annual_return: round_to(annual_return * 100.0, 2),
            annual_volatility: round_to(annual_volatility * 100.0, 2),
            sharpe_ratio: round_to(sharpe, 2),
            max_drawdown: round_to(max_drawdown(&portfolio) * 100.0, 2),
            total_return: round_to(portfolio.iter().sum::<f64>() * 100.0, 2),
        })
    }

    /// Dated returns for each symbol that has any.
    async fn fetch_returns<'a, I>(&self, symbols: I) -> BTreeMap<String, BTreeMap<NaiveDate, f64>>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let fetches = symbols.into_iter().map(|symbol| async move {
            let history = self.source.get_history(symbol, self.lookback_days).await;
            (symbol.clone(), dated_returns(history.bars()))
        });

        join_all(fetches)
            .await
            .into_iter()
            .filter(|(_, series)| !series.is_empty())
            .collect()
    }
}
