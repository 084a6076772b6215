//! Rolling indicators aligned to their input: element `i` describes the window
//! ending at bar `i`, and is `None` until that window is full.

/// Simple Moving Average (one value per full window).
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    for i in period - 1..data.len() {
        let sum: f64 = data[i + 1 - period..=i].iter().sum();
        result.push(sum / period as f64);
    }
    result
}

/// Pad a compact windowed series back to `len` with leading `None`s.
fn align(values: Vec<f64>, len: usize) -> Vec<Option<f64>> {
    let mut aligned = vec![None; len.saturating_sub(values.len())];
    aligned.extend(values.into_iter().map(Some));
    aligned
}

/// Trailing mean over `window` values.
pub fn rolling_mean(data: &[f64], window: usize) -> Vec<Option<f64>> {
    align(sma(data, window), data.len())
}

/// Trailing sample standard deviation over `window` values.
pub fn rolling_std(data: &[f64], window: usize) -> Vec<Option<f64>> {
    if window < 2 || data.len() < window {
        return vec![None; data.len()];
    }

    let mut result = Vec::with_capacity(data.len() - window + 1);
    for i in window - 1..data.len() {
        let slice = &data[i + 1 - window..=i];
        let mean = slice.iter().sum::<f64>() / window as f64;
        let variance = slice.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
        result.push(variance.sqrt());
    }
    align(result, data.len())
}

/// Relative Strength Index from trailing means of gains and losses.
///
/// The value at bar `i` uses the `period` close-to-close deltas ending at `i`, so
/// the first defined value is at index `period`. A window without losses saturates
/// at 100; a completely flat window has no defined value.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if period == 0 || closes.len() < period + 1 {
        return result;
    }

    let mut gains = vec![0.0; closes.len()];
    let mut losses = vec![0.0; closes.len()];
    for i in 1..closes.len() {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            gains[i] = change;
        } else {
            losses[i] = -change;
        }
    }

    for i in period..closes.len() {
        let avg_gain = gains[i + 1 - period..=i].iter().sum::<f64>() / period as f64;
        let avg_loss = losses[i + 1 - period..=i].iter().sum::<f64>() / period as f64;

        result[i] = if avg_loss == 0.0 {
            if avg_gain > 0.0 {
                Some(100.0)
            } else {
                None
            }
        } else {
            let rs = avg_gain / avg_loss;
            Some(100.0 - (100.0 / (1.0 + rs)))
        };
    }

    result
}

/// Bollinger Bands
pub struct BollingerBands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
    pub width: Vec<Option<f64>>,
}

/// Bands at `middle ± num_std * sample_std` over a trailing `period`.
pub fn bollinger_bands(data: &[f64], period: usize, num_std: f64) -> BollingerBands {
    let middle = rolling_mean(data, period);
    let std = rolling_std(data, period);

    let mut upper = Vec::with_capacity(data.len());
    let mut lower = Vec::with_capacity(data.len());
    let mut width = Vec::with_capacity(data.len());
    for (m, s) in middle.iter().zip(std.iter()) {
        match (m, s) {
            (Some(m), Some(s)) => {
                let up = m + num_std * s;
                let lo = m - num_std * s;
                upper.push(Some(up));
                lower.push(Some(lo));
                width.push(Some(up - lo));
            }
            _ => {
                upper.push(None);
                lower.push(None);
                width.push(None);
            }
        }
    }

    BollingerBands {
        upper,
        middle,
        lower,
        width,
    }
}

/// Volume over its trailing mean; undefined when the mean is zero.
pub fn volume_ratio(volumes: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling_mean(volumes, window)
        .into_iter()
        .zip(volumes.iter())
        .map(|(avg, &v)| avg.and_then(|avg| finite_ratio(v, avg)))
        .collect()
}

/// `numerator / denominator`, or `None` when the result is not finite.
pub fn finite_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    let value = numerator / denominator;
    value.is_finite().then_some(value)
}
