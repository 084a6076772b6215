use analysis_core::{Bar, History, Quote};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use ml_engine::{Evaluation, Prediction};
use portfolio_analytics::risk::DEFAULT_BENCHMARK;
use portfolio_analytics::SymbolRisk;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{AppError, AppState};

/// Longest window the historical endpoint will serve.
const MAX_HISTORY_DAYS: usize = 5000;
const MAX_HORIZON: u32 = 365;

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_days")]
    pub days: usize,
}

fn default_days() -> usize {
    30
}

#[derive(Deserialize)]
pub struct PredictionQuery {
    #[serde(default = "default_horizon")]
    pub horizon: u32,
}

fn default_horizon() -> u32 {
    1
}

#[derive(Deserialize)]
pub struct RiskQuery {
    pub benchmark: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoricalResponse {
    Series { symbol: String, data: Vec<Bar> },
    NoData { error: String },
}

pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stock/:symbol/price", get(get_price))
        .route("/api/stock/:symbol/historical", get(get_historical))
        .route("/api/stock/:symbol/prediction", get(get_prediction))
        .route("/api/stock/:symbol/evaluation", get(get_evaluation))
        .route("/api/stock/:symbol/risk", get(get_symbol_risk))
}

fn normalize_symbol(symbol: &str) -> Result<String, AppError> {
    let symbol = symbol.trim().to_ascii_uppercase();
    if symbol.is_empty() || symbol.len() > 12 {
        return Err(AppError::BadRequest(format!("invalid symbol '{symbol}'")));
    }
    Ok(symbol)
}

async fn get_price(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Quote>, AppError> {
    let symbol = normalize_symbol(&symbol)?;
    let snapshot = state.market.get_quote(&symbol).await;
    if snapshot.is_empty() {
        debug!(symbol = %symbol, "No quote for symbol, serving zero quote");
    }
    Ok(Json(snapshot.into_quote()))
}

async fn get_historical(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoricalResponse>, AppError> {
    let symbol = normalize_symbol(&symbol)?;
    if query.days == 0 || query.days > MAX_HISTORY_DAYS {
        return Err(AppError::BadRequest(format!(
            "days must be between 1 and {MAX_HISTORY_DAYS}"
        )));
    }

    let response = match state.market.get_history(&symbol, query.days).await {
        History::Series(data) => HistoricalResponse::Series { symbol, data },
        History::EmptyHistory => {
            debug!(symbol = %symbol, "No history for symbol");
            HistoricalResponse::NoData {
                error: "No data available".to_string(),
            }
        }
    };
    Ok(Json(response))
}

async fn get_prediction(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<PredictionQuery>,
) -> Result<Json<Prediction>, AppError> {
    let symbol = normalize_symbol(&symbol)?;
    if query.horizon == 0 || query.horizon > MAX_HORIZON {
        return Err(AppError::BadRequest(format!(
            "horizon must be between 1 and {MAX_HORIZON}"
        )));
    }

    Ok(Json(state.predictor.predict(&symbol, query.horizon).await))
}

async fn get_evaluation(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Evaluation>, AppError> {
    let symbol = normalize_symbol(&symbol)?;
    let evaluation = state.predictor.evaluate(&symbol).await?;
    Ok(Json(evaluation))
}

async fn get_symbol_risk(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<RiskQuery>,
) -> Result<Json<SymbolRisk>, AppError> {
    let symbol = normalize_symbol(&symbol)?;
    let benchmark = normalize_symbol(query.benchmark.as_deref().unwrap_or(DEFAULT_BENCHMARK))?;
    let risk = state.analyzer.symbol_risk(&symbol, &benchmark).await?;
    Ok(Json(risk))
}
