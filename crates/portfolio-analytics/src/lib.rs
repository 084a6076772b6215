pub mod analyzer;
pub mod holdings;
pub mod metrics;
pub mod models;
pub mod recommendations;
pub mod risk;
pub mod shared_math;


pub use analyzer::PortfolioAnalyzer;
pub use holdings::{
    apply_transaction, value_position, Position, Transaction, TransactionOutcome, TransactionType,
    ValuedHolding,
};
pub use metrics::PortfolioMetricsEngine;
pub use models::*;
pub use recommendations::RecommendationEngine;
pub use risk::RiskAssessor;
