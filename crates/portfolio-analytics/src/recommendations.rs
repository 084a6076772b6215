use analysis_core::{total_market_value, Holding};

const MIN_HOLDINGS: usize = 5;
const CONCENTRATION_LIMIT: f64 = 0.3;
const UNDERPERFORMING_SHARE: f64 = 0.6;

/// Rule-based suggestions from the holdings snapshot alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Diversification, then concentration in holdings order, then performance.
    pub fn generate(&self, holdings: &[Holding]) -> Vec<String> {
        if holdings.is_empty() {
            return vec!["Start by adding some stocks to your portfolio".to_string()];
        }

        let mut recommendations = Vec::new();

        if holdings.len() < MIN_HOLDINGS {
            recommendations.push(
                "Consider diversifying with more holdings (5-10 stocks recommended)".to_string(),
            );
        }

        let total = total_market_value(holdings);
        if total > 0.0 {
            for holding in holdings {
                let weight = holding.market_value / total;
                if weight > CONCENTRATION_LIMIT {
                    recommendations.push(format!(
                        "Consider reducing exposure to {} (currently {:.1}% of portfolio)",
                        holding.symbol,
                        weight * 100.0
                    ));
                }
            }
        }

        let losing = holdings.iter().filter(|h| h.gain_loss < 0.0).count();
        if losing as f64 > holdings.len() as f64 * UNDERPERFORMING_SHARE {
            recommendations.push(
                "Consider reviewing your stock selection - majority of holdings are underperforming"
                    .to_string(),
            );
        }

        recommendations
    }
}
