//! Call-scoped price forecasting: a standard scaler and a bagged forest of CART
//! regression trees fitted on technical features, rebuilt on every request.

pub mod metrics;
pub mod price_predictor;
pub mod random_forest;
pub mod regression_tree;
pub mod scaler;


pub use price_predictor::{
    evaluate_bars, forecast, Evaluation, Forecast, Prediction, PredictorConfig, PricePredictor,
};
pub use random_forest::{ForestConfig, RandomForest};
pub use regression_tree::{RegressionTree, TreeParams};
pub use scaler::StandardScaler;
