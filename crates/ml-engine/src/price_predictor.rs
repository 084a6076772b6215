use analysis_core::stats::round_to;
use analysis_core::{AnalysisError, Bar, MarketDataSource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use technical_analysis::{FeatureBuilder, FeatureRow};
use tracing::{debug, info, warn};

use crate::metrics::{mean_squared_error, r2_score};
use crate::random_forest::{ForestConfig, RandomForest};
use crate::scaler::StandardScaler;

#[derive(Debug, Clone, PartialEq)]
pub struct PredictorConfig {
    /// Bars fetched for `predict`.
    pub history_bars: usize,
    /// Bars fetched for `evaluate`.
    pub evaluation_bars: usize,
    pub min_evaluation_bars: usize,
    pub min_training_rows: usize,
    pub test_fraction: f64,
    pub forest: ForestConfig,
    /// Placeholder reported with every forecast. Not derived from the model.
    pub confidence_label: String,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            history_bars: 100,
            evaluation_bars: 500,
            min_evaluation_bars: 50,
            min_training_rows: 20,
            test_fraction: 0.2,
            forest: ForestConfig::default(),
            confidence_label: "Medium".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub current_price: f64,
    pub predicted_price: f64,
    pub change_percent: f64,
    pub horizon: u32,
    pub confidence_label: String,
}

/// Outcome of [`PricePredictor::predict`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prediction {
    Forecast(Forecast),
    InsufficientData { error: String },
}

impl Prediction {
    pub fn forecast(&self) -> Option<&Forecast> {
        match self {
            Prediction::Forecast(f) => Some(f),
            Prediction::InsufficientData { .. } => None,
        }
    }

    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Prediction::InsufficientData { .. })
    }
}

/// Held-out fit quality from [`PricePredictor::evaluate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub mse: f64,
    pub r2: f64,
    pub accuracy: f64,
}

/// Next-bar close forecaster. Every call fetches fresh bars and fits a new model.
pub struct PricePredictor {
    source: Arc<dyn MarketDataSource>,
    config: PredictorConfig,
}

impl PricePredictor {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self::with_config(source, PredictorConfig::default())
    }

    pub fn with_config(source: Arc<dyn MarketDataSource>, config: PredictorConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub async fn predict(&self, symbol: &str, horizon: u32) -> Prediction {
        let history = self.source.get_history(symbol, self.config.history_bars).await;
        if history.is_empty() {
            warn!(symbol, "No history available for prediction");
            return Prediction::InsufficientData {
                error: "No data available".to_string(),
            };
        }

        let config = self.config.clone();
        let bars = history.into_bars();
        let fitted = tokio::task::spawn_blocking(move || forecast(&bars, horizon, &config)).await;

        match fitted {
            Ok(Ok(forecast)) => {
                info!(
                    symbol,
                    current = forecast.current_price,
                    predicted = forecast.predicted_price,
                    "Price forecast ready"
                );
                Prediction::Forecast(forecast)
            }
            Ok(Err(e)) => {
                debug!(symbol, error = %e, "Prediction skipped");
                Prediction::InsufficientData {
                    error: reason(e),
                }
            }
            Err(e) => {
                warn!(symbol, error = %e, "Prediction task failed");
                Prediction::InsufficientData {
                    error: format!("Prediction failed: {e}"),
                }
            }
        }
    }

    pub async fn evaluate(&self, symbol: &str) -> Result<Evaluation, AnalysisError> {
        let history = self
            .source
            .get_history(symbol, self.config.evaluation_bars)
            .await;

        let config = self.config.clone();
        let bars = history.into_bars();
        let evaluation = tokio::task::spawn_blocking(move || evaluate_bars(&bars, &config))
            .await
            .map_err(|e| AnalysisError::CalculationError(e.to_string()))??;

        info!(symbol, r2 = evaluation.r2, mse = evaluation.mse, "Model evaluation complete");
        Ok(evaluation)
    }
}

/// Message carried by an insufficient-data error, or the full display for others.
fn reason(error: AnalysisError) -> String {
    match error {
        AnalysisError::InsufficientData(msg) => msg,
        other => other.to_string(),
    }
}

/// Feature rows paired with the close of the following dense row.
fn labelled(rows: &[FeatureRow]) -> (Vec<Vec<f64>>, Vec<f64>) {
    rows.windows(2)
        .map(|pair| (pair[0].model_inputs().to_vec(), pair[1].close))
        .unzip()
}

/// Fit on `bars` and forecast the close after the last dense row.
///
/// The last bar must itself be dense so the forecast and `current_price` describe the
/// same session.
pub fn forecast(
    bars: &[Bar],
    horizon: u32,
    config: &PredictorConfig,
) -> Result<Forecast, AnalysisError> {
    let frame = FeatureBuilder::new().dense_rows(bars);
    let latest = match frame.last() {
        Some(row) => row.clone(),
        None => {
            return Err(AnalysisError::InsufficientData(
                "Insufficient data for prediction".to_string(),
            ))
        }
    };
    if latest.index + 1 != bars.len() {
        return Err(AnalysisError::InsufficientData(
            "Latest bar has incomplete features".to_string(),
        ));
    }

    let (x, y) = labelled(frame.rows());
    if y.len() < config.min_training_rows {
        return Err(AnalysisError::InsufficientData(
            "Insufficient training data".to_string(),
        ));
    }

    let scaler = StandardScaler::fit(&x)?;
    let forest = RandomForest::fit(&scaler.transform(&x), &y, &config.forest)?;
    let predicted = forest.predict_row(&scaler.transform_row(&latest.model_inputs()));

    let current_price = latest.close;
    let change_percent = if current_price != 0.0 {
        (predicted - current_price) / current_price * 100.0
    } else {
        0.0
    };

    Ok(Forecast {
        current_price,
        predicted_price: round_to(predicted, 2),
        change_percent: round_to(change_percent, 2),
        horizon,
        confidence_label: config.confidence_label.clone(),
    })
}

/// Chronological train/test fit on `bars`, reporting held-out error.
pub fn evaluate_bars(bars: &[Bar], config: &PredictorConfig) -> Result<Evaluation, AnalysisError> {
    if bars.len() < config.min_evaluation_bars {
        return Err(AnalysisError::InsufficientData(
            "Insufficient data for training".to_string(),
        ));
    }

    let frame = FeatureBuilder::new().build(bars).map_err(|_| {
        AnalysisError::InsufficientData("Insufficient data after feature preparation".to_string())
    })?;

    let (x, y) = labelled(frame.rows());
    let n_test = ((y.len() as f64) * config.test_fraction).ceil() as usize;
    let n_train = y.len().saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(AnalysisError::InsufficientData(
            "Insufficient data for train/test split".to_string(),
        ));
    }

    let (x_train, x_test) = x.split_at(n_train);
    let (y_train, y_test) = y.split_at(n_train);

    let scaler = StandardScaler::fit(x_train)?;
    let forest = RandomForest::fit(&scaler.transform(x_train), y_train, &config.forest)?;
    let predictions = forest.predict(&scaler.transform(x_test));

    let mse = mean_squared_error(y_test, &predictions);
    let r2 = r2_score(y_test, &predictions);

    Ok(Evaluation {
        mse: round_to(mse, 4),
        r2: round_to(r2, 4),
        accuracy: round_to(r2 * 100.0, 2),
    })
}
