use serde::{Deserialize, Serialize};

/// Annualised portfolio statistics. Percent fields are ×100 and rounded to 2 places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub total_return: f64,
}

/// Metrics, or an empty object when no aligned history exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricsResult {
    Computed(PortfolioMetrics),
    Empty {},
}

impl MetricsResult {
    pub fn metrics(&self) -> Option<&PortfolioMetrics> {
        match self {
            MetricsResult::Computed(m) => Some(m),
            MetricsResult::Empty {} => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, MetricsResult::Empty {})
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// High above `high`, Medium above `medium`, otherwise Low.
    pub fn classify(value: f64, high: f64, medium: f64) -> Self {
        if value > high {
            RiskTier::High
        } else if value > medium {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
        }
    }
}

/// Portfolio risk summary. Absent fields are omitted from JSON; an empty
/// portfolio serialises as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concentration_risk: Option<RiskTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diversification_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility_level: Option<RiskTier>,
}

impl RiskAssessment {
    pub fn is_empty(&self) -> bool {
        self.concentration_risk.is_none()
            && self.diversification_score.is_none()
            && self.volatility_level.is_none()
    }
}

/// Single-symbol risk against a benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRisk {
    pub symbol: String,
    pub benchmark: String,
    /// 5th percentile daily return (fraction, negative for a loss).
    pub value_at_risk_95: f64,
    pub beta: f64,
    /// Annualised volatility in percent.
    pub annual_volatility: f64,
    /// Date-aligned return pairs used.
    pub observations: usize,
}

/// Combined output of [`crate::PortfolioAnalyzer::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub metrics: MetricsResult,
    pub recommendations: Vec<String>,
    pub risk_assessment: RiskAssessment,
    pub total_value: f64,
    pub total_gain_loss: f64,
}
