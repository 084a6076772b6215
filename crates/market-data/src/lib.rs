pub mod alpha_vantage;
pub mod cache;
pub mod error;
pub mod memory;

pub use alpha_vantage::{AlphaVantageClient, AlphaVantageConfig};
pub use cache::CachedMarketData;
pub use error::MarketDataError;
pub use memory::{bars_from_closes, StaticMarketData};
