//! Pure return-series math for the metrics and risk engines.
//! Stateless functions: no I/O, no async.

use analysis_core::stats::percentile;
use analysis_core::{Bar, TRADING_DAYS_PER_YEAR};
use chrono::NaiveDate;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Below this, a volatility is treated as zero.
const VOLATILITY_EPSILON: f64 = 1e-12;

/// Compute daily returns from a value series.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    if values.len() < 2 {
        return Vec::new();
    }
    values
        .windows(2)
        .filter_map(|w| {
            if w[0] != 0.0 {
                Some((w[1] - w[0]) / w[0])
            } else {
                None
            }
        })
        .collect()
}

/// Close-to-close returns keyed by the date of the later bar.
pub fn dated_returns(bars: &[Bar]) -> BTreeMap<NaiveDate, f64> {
    bars.windows(2)
        .filter(|w| w[0].close != 0.0)
        .map(|w| (w[1].date, (w[1].close - w[0].close) / w[0].close))
        .collect()
}

/// Dates present in every series, ascending. Empty when there are no series.
pub fn common_dates<'a, I>(series: I) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = &'a BTreeMap<NaiveDate, f64>>,
{
    let mut iter = series.into_iter();
    let first = match iter.next() {
        Some(first) => first,
        None => return Vec::new(),
    };
    let mut dates: Vec<NaiveDate> = first.keys().copied().collect();
    for other in iter {
        dates.retain(|d| other.contains_key(d));
    }
    dates
}

/// Mean daily return × 252.
pub fn annualized_return(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    returns.mean() * TRADING_DAYS_PER_YEAR
}

/// Sample standard deviation × sqrt(252); 0 with fewer than two observations.
pub fn annualized_volatility(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let vol = returns.std_dev() * TRADING_DAYS_PER_YEAR.sqrt();
    if vol.is_finite() && vol >= VOLATILITY_EPSILON {
        vol
    } else {
        0.0
    }
}

/// Return over volatility, 0 when volatility is 0.
pub fn sharpe_ratio(annual_return: f64, annual_volatility: f64) -> f64 {
    if annual_volatility < VOLATILITY_EPSILON {
        return 0.0;
    }
    annual_return / annual_volatility
}

/// Deepest fall of the compounded return curve below its running peak.
/// Returned as a fraction ≤ 0 (e.g. -0.15 for a 15% drawdown).
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut cumulative = 1.0;
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for r in returns {
        cumulative *= 1.0 + r;
        peak = peak.max(cumulative);
        if peak > 0.0 {
            worst = worst.min((cumulative - peak) / peak);
        }
    }
    worst
}

/// Historical VaR: the `confidence_level` quantile of the sample (0.05 → 5th
/// percentile), linearly interpolated. Losses are negative.
pub fn value_at_risk(returns: &[f64], confidence_level: f64) -> Option<f64> {
    percentile(returns, confidence_level * 100.0)
}

/// Sample covariance with the market over sample market variance.
/// 1.0 when fewer than two paired observations exist or the market is flat.
pub fn beta(stock_returns: &[f64], market_returns: &[f64]) -> f64 {
    let n = stock_returns.len().min(market_returns.len());
    if n < 2 {
        return 1.0;
    }
    let stock = &stock_returns[..n];
    let market = &market_returns[..n];

    let market_variance = market.variance();
    if !market_variance.is_finite() || market_variance.abs() < VOLATILITY_EPSILON {
        return 1.0;
    }
    stock.covariance(market) / market_variance
}
