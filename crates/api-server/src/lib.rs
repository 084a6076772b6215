pub mod config;
pub mod error;
pub mod portfolio_routes;
pub mod stock_routes;


use analysis_core::MarketDataSource;
use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use axum::{routing::get, Json, Router};
use market_data::{AlphaVantageClient, CachedMarketData, StaticMarketData};
use ml_engine::PricePredictor;
use portfolio_analytics::PortfolioAnalyzer;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub use config::{ProviderKind, ServerConfig};
pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub market: Arc<dyn MarketDataSource>,
    pub predictor: Arc<PricePredictor>,
    pub analyzer: Arc<PortfolioAnalyzer>,
}

impl AppState {
    pub fn new(market: Arc<dyn MarketDataSource>, config: &ServerConfig) -> Self {
        Self {
            predictor: Arc::new(PricePredictor::with_config(
                market.clone(),
                config.predictor_config(),
            )),
            analyzer: Arc::new(PortfolioAnalyzer::new(market.clone())),
            market,
        }
    }
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(stock_routes::stock_routes())
        .merge(portfolio_routes::portfolio_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Smart Investment Analytics Platform API" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json_logs = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Provider selected by configuration, wrapped in the TTL cache when enabled.
pub fn build_market_source(config: &ServerConfig) -> Result<Arc<dyn MarketDataSource>> {
    let source: Arc<dyn MarketDataSource> = match config.provider {
        ProviderKind::AlphaVantage => {
            let av_config = config
                .alpha_vantage_config()
                .context("ALPHA_VANTAGE_API_KEY is required for the alpha_vantage provider")?;
            info!(base_url = %av_config.base_url, "Using Alpha Vantage market data");
            Arc::new(AlphaVantageClient::with_config(av_config))
        }
        ProviderKind::Offline => match &config.fixture_path {
            Some(path) => {
                let data = StaticMarketData::from_json_file(path)
                    .with_context(|| format!("failed to load fixture {}", path.display()))?;
                info!(
                    fixture = %path.display(),
                    symbols = data.symbols().len(),
                    "Using offline market data"
                );
                Arc::new(data)
            }
            None => {
                warn!("Offline provider without MARKET_DATA_FIXTURE; every lookup will be empty");
                Arc::new(StaticMarketData::new())
            }
        },
    };

    if config.cache_ttl.is_zero() {
        Ok(source)
    } else {
        Ok(Arc::new(CachedMarketData::new(source, config.cache_ttl)))
    }
}

pub async fn run_server() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env().context("invalid server configuration")?;
    let market = build_market_source(&config)?;
    let state = AppState::new(market, &config);
    let app = router(state, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "Analytics API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
