use analysis_core::{total_market_value, AnalysisError, Holding, MarketDataSource};
use std::sync::Arc;

use crate::metrics::PortfolioMetricsEngine;
use crate::models::{PortfolioReport, SymbolRisk};
use crate::recommendations::RecommendationEngine;
use crate::risk::RiskAssessor;

/// Runs metrics, recommendations and risk over one holdings snapshot.
pub struct PortfolioAnalyzer {
    metrics: PortfolioMetricsEngine,
    recommendations: RecommendationEngine,
    risk: RiskAssessor,
}

impl PortfolioAnalyzer {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self {
            metrics: PortfolioMetricsEngine::new(source.clone()),
            recommendations: RecommendationEngine::new(),
            risk: RiskAssessor::new(source),
        }
    }

    pub async fn analyze(&self, holdings: &[Holding]) -> PortfolioReport {
        let (metrics, risk_assessment) =
            tokio::join!(self.metrics.compute(holdings), self.risk.assess(holdings));

        PortfolioReport {
            metrics,
            recommendations: self.recommendations.generate(holdings),
            risk_assessment,
            total_value: total_market_value(holdings),
            total_gain_loss: holdings.iter().map(|h| h.gain_loss).sum(),
        }
    }

    pub async fn symbol_risk(
        &self,
        symbol: &str,
        benchmark: &str,
    ) -> Result<SymbolRisk, AnalysisError> {
        self.risk.symbol_risk(symbol, benchmark).await
    }
}
