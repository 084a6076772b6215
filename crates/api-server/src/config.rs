use anyhow::{bail, Context, Result};
use market_data::alpha_vantage::DEFAULT_BASE_URL;
use market_data::AlphaVantageConfig;
use ml_engine::PredictorConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    AlphaVantage,
    /// Serve bars from a local fixture file (or nothing).
    Offline,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alpha_vantage" | "alphavantage" => Ok(ProviderKind::AlphaVantage),
            "offline" => Ok(ProviderKind::Offline),
            other => bail!("unknown MARKET_DATA_PROVIDER '{other}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,
    pub provider: ProviderKind,
    pub alpha_vantage_api_key: Option<String>,
    pub alpha_vantage_base_url: String,
    pub fixture_path: Option<PathBuf>,
    pub request_timeout: Duration,
    pub max_retries: u32,
    /// Zero disables the quote/history cache.
    pub cache_ttl: Duration,
    pub confidence_label: String,
    pub prediction_trees: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset and blank values take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let provider = match get("MARKET_DATA_PROVIDER") {
            Some(value) => value.parse::<ProviderKind>()?,
            None => ProviderKind::AlphaVantage,
        };
        let alpha_vantage_api_key = get("ALPHA_VANTAGE_API_KEY");
        if provider == ProviderKind::AlphaVantage && alpha_vantage_api_key.is_none() {
            bail!("ALPHA_VANTAGE_API_KEY must be set (or use MARKET_DATA_PROVIDER=offline)");
        }

        let bind_addr: SocketAddr = get("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8000".to_string())
            .parse()
            .context("BIND_ADDR must be a socket address such as 0.0.0.0:8000")?;

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let prediction_trees: usize = parse_or(&get, "PREDICTION_TREES", 100)?;
        if prediction_trees == 0 {
            bail!("PREDICTION_TREES must be at least 1");
        }

        Ok(Self {
            bind_addr,
            cors_origins,
            provider,
            alpha_vantage_api_key,
            alpha_vantage_base_url: get("ALPHA_VANTAGE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            fixture_path: get("MARKET_DATA_FIXTURE").map(PathBuf::from),
            request_timeout: Duration::from_secs(parse_or(&get, "MARKET_DATA_TIMEOUT_SECS", 5)?),
            max_retries: parse_or(&get, "MARKET_DATA_MAX_RETRIES", 1)?,
            cache_ttl: Duration::from_secs(parse_or(&get, "MARKET_DATA_CACHE_TTL_SECS", 300)?),
            confidence_label: get("PREDICTION_CONFIDENCE_LABEL")
                .unwrap_or_else(|| "Medium".to_string()),
            prediction_trees,
        })
    }

    pub fn alpha_vantage_config(&self) -> Option<AlphaVantageConfig> {
        let api_key = self.alpha_vantage_api_key.clone()?;
        let mut config = AlphaVantageConfig::new(api_key);
        config.base_url = self.alpha_vantage_base_url.clone();
        config.timeout = self.request_timeout;
        config.max_retries = self.max_retries;
        Some(config)
    }

    pub fn predictor_config(&self) -> PredictorConfig {
        let mut config = PredictorConfig {
            confidence_label: self.confidence_label.clone(),
            ..PredictorConfig::default()
        };
        config.forest.n_estimators = self.prediction_trees;
        config
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} has invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            ServerConfig::from_lookup(lookup(&[("ALPHA_VANTAGE_API_KEY", "demo")])).unwrap();
        assert_eq!(config.provider, ProviderKind::AlphaVantage);
        assert_eq!(config.bind_addr, "0.0.0.0:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.alpha_vantage_base_url, DEFAULT_BASE_URL);

        let predictor = config.predictor_config();
        assert_eq!(predictor.confidence_label, "Medium");
        assert_eq!(predictor.forest.n_estimators, 100);

        let av = config.alpha_vantage_config().unwrap();
        assert_eq!(av.api_key, "demo");
        assert_eq!(av.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_api_key_required_for_alpha_vantage() {
        let err = ServerConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("ALPHA_VANTAGE_API_KEY"));

        let blank = ServerConfig::from_lookup(lookup(&[("ALPHA_VANTAGE_API_KEY", "  ")]));
        assert!(blank.is_err());
    }

    #[test]
    fn test_offline_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("MARKET_DATA_PROVIDER", "offline"),
            ("MARKET_DATA_FIXTURE", "fixtures/bars.json"),
            ("MARKET_DATA_CACHE_TTL_SECS", "0"),
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("CORS_ORIGINS", "http://a.test, http://b.test"),
            ("PREDICTION_CONFIDENCE_LABEL", "Low"),
            ("PREDICTION_TREES", "25"),
        ]))
        .unwrap();

        assert_eq!(config.provider, ProviderKind::Offline);
        assert!(config.alpha_vantage_config().is_none());
        assert_eq!(config.fixture_path, Some(PathBuf::from("fixtures/bars.json")));
        assert_eq!(config.cache_ttl, Duration::ZERO);
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.predictor_config().confidence_label, "Low");
        assert_eq!(config.predictor_config().forest.n_estimators, 25);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = [("MARKET_DATA_PROVIDER", "offline")];
        for (key, value) in [
            ("MARKET_DATA_TIMEOUT_SECS", "soon"),
            ("MARKET_DATA_MAX_RETRIES", "-1"),
            ("PREDICTION_TREES", "0"),
            ("BIND_ADDR", "localhost"),
            ("MARKET_DATA_PROVIDER", "yahoo"),
        ] {
            let mut pairs = base.to_vec();
            pairs.push((key, value));
            assert!(ServerConfig::from_lookup(lookup(&pairs)).is_err(), "{key}={value}");
        }
    }
}
