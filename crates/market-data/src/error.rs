use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Provider notice: {0}")]
    Information(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for MarketDataError {
    fn from(e: serde_json::Error) -> Self {
        MarketDataError::Malformed(e.to_string())
    }
}
