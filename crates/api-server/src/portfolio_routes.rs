use analysis_core::Holding;
use axum::{extract::State, routing::post, Json, Router};
use futures_util::future::join_all;
use portfolio_analytics::{
    apply_transaction, value_position, PortfolioReport, Position, Transaction, TransactionOutcome,
    ValuedHolding,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{AppError, AppState};

#[derive(Deserialize)]
pub struct AnalyticsRequest {
    pub holdings: Vec<Holding>,
}

#[derive(Deserialize)]
pub struct ValuationRequest {
    pub positions: Vec<Position>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValuationResponse {
    pub holdings: Vec<ValuedHolding>,
    pub total_value: f64,
    pub total_gain_loss: f64,
    /// Symbols the provider had no quote for; valued at zero.
    pub unpriced: Vec<String>,
}

#[derive(Deserialize)]
pub struct TransactionRequest {
    pub position: Option<Position>,
    pub transaction: Transaction,
}

pub fn portfolio_routes() -> Router<AppState> {
    Router::new()
        .route("/api/portfolio/analytics", post(analyze_portfolio))
        .route("/api/portfolio/valuation", post(value_portfolio))
        .route("/api/portfolio/transactions", post(record_transaction))
}

async fn analyze_portfolio(
    State(state): State<AppState>,
    Json(request): Json<AnalyticsRequest>,
) -> Result<Json<PortfolioReport>, AppError> {
    if let Some(bad) = request
        .holdings
        .iter()
        .find(|h| h.symbol.trim().is_empty() || !h.market_value.is_finite())
    {
        return Err(AppError::BadRequest(format!(
            "invalid holding '{}'",
            bad.symbol
        )));
    }

    let report = state.analyzer.analyze(&request.holdings).await;
    info!(
        holdings = request.holdings.len(),
        total_value = report.total_value,
        "Portfolio analytics computed"
    );
    Ok(Json(report))
}

async fn value_portfolio(
    State(state): State<AppState>,
    Json(request): Json<ValuationRequest>,
) -> Result<Json<ValuationResponse>, AppError> {
    let quotes = join_all(
        request
            .positions
            .iter()
            .map(|p| state.market.get_quote(&p.symbol)),
    )
    .await;

    let mut unpriced = Vec::new();
    let holdings: Vec<ValuedHolding> = request
        .positions
        .iter()
        .zip(quotes)
        .map(|(position, snapshot)| {
            if snapshot.is_empty() {
                warn!(symbol = %position.symbol, "No quote for position");
                unpriced.push(position.symbol.clone());
            }
            value_position(position, snapshot.into_quote().price)
        })
        .collect();

    Ok(Json(ValuationResponse {
        total_value: holdings.iter().map(|h| h.market_value).sum(),
        total_gain_loss: holdings.iter().map(|h| h.gain_loss).sum(),
        holdings,
        unpriced,
    }))
}

async fn record_transaction(
    Json(request): Json<TransactionRequest>,
) -> Result<Json<TransactionOutcome>, AppError> {
    let outcome = apply_transaction(request.position.as_ref(), &request.transaction)?;
    info!(
        symbol = %request.transaction.symbol,
        side = ?request.transaction.transaction_type,
        total_amount = outcome.total_amount,
        "Transaction applied"
    );
    Ok(Json(outcome))
}
