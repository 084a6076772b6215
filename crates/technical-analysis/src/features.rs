use analysis_core::{AnalysisError, Bar};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::indicators::{bollinger_bands, finite_ratio, rolling_mean, rsi, volume_ratio};

/// Model input columns, in the order returned by [`FeatureRow::model_inputs`].
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "ma_5",
    "ma_10",
    "ma_20",
    "rsi",
    "bb_width",
    "volume_ratio",
    "high_low_ratio",
    "close_open_ratio",
];
pub const FEATURE_COUNT: usize = 8;

/// Dense rows required by [`FeatureBuilder::build`] unless overridden.
pub const DEFAULT_MIN_ROWS: usize = 30;

pub const RSI_PERIOD: usize = 14;
pub const BOLLINGER_PERIOD: usize = 20;
pub const VOLUME_WINDOW: usize = 10;

/// Indicator values for one bar. Only bars where every column is defined become rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Position of the source bar in the input series.
    pub index: usize,
    pub date: NaiveDate,
    pub close: f64,
    pub ma_5: f64,
    pub ma_10: f64,
    pub ma_20: f64,
    pub rsi: f64,
    pub bb_upper: f64,
    pub bb_lower: f64,
    pub bb_width: f64,
    pub volume_ratio: f64,
    pub high_low_ratio: f64,
    pub close_open_ratio: f64,
}

impl FeatureRow {
    pub fn model_inputs(&self) -> [f64; FEATURE_COUNT] {
        [
            self.ma_5,
            self.ma_10,
            self.ma_20,
            self.rsi,
            self.bb_width,
            self.volume_ratio,
            self.high_low_ratio,
            self.close_open_ratio,
        ]
    }
}

/// Dense feature rows in bar order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFrame {
    rows: Vec<FeatureRow>,
}

impl FeatureFrame {
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }

    pub fn into_rows(self) -> Vec<FeatureRow> {
        self.rows
    }

    pub fn matrix(&self) -> Vec<[f64; FEATURE_COUNT]> {
        self.rows.iter().map(FeatureRow::model_inputs).collect()
    }
}

#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    min_rows: usize,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureBuilder {
    pub fn new() -> Self {
        Self {
            min_rows: DEFAULT_MIN_ROWS,
        }
    }

    pub fn with_min_rows(mut self, min_rows: usize) -> Self {
        self.min_rows = min_rows;
        self
    }

    pub fn min_rows(&self) -> usize {
        self.min_rows
    }

    /// Every fully-defined row, with no minimum applied.
    pub fn dense_rows(&self, bars: &[Bar]) -> FeatureFrame {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();

        let ma_5 = rolling_mean(&closes, 5);
        let ma_10 = rolling_mean(&closes, 10);
        let bands = bollinger_bands(&closes, BOLLINGER_PERIOD, 2.0);
        let rsi = rsi(&closes, RSI_PERIOD);
        let vol_ratio = volume_ratio(&volumes, VOLUME_WINDOW);

        let rows = bars
            .iter()
            .enumerate()
            .filter_map(|(i, bar)| {
                Some(FeatureRow {
                    index: i,
                    date: bar.date,
                    close: bar.close,
                    ma_5: ma_5[i]?,
                    ma_10: ma_10[i]?,
                    ma_20: bands.middle[i]?,
                    rsi: rsi[i]?,
                    bb_upper: bands.upper[i]?,
                    bb_lower: bands.lower[i]?,
                    bb_width: bands.width[i]?,
                    volume_ratio: vol_ratio[i]?,
                    high_low_ratio: finite_ratio(bar.high, bar.low)?,
                    close_open_ratio: finite_ratio(bar.close, bar.open)?,
                })
            })
            .filter(|row| row.model_inputs().iter().all(|v| v.is_finite()))
            .collect();

        FeatureFrame { rows }
    }

    /// Dense rows, or `InsufficientData` when fewer than the configured minimum remain.
    pub fn build(&self, bars: &[Bar]) -> Result<FeatureFrame, AnalysisError> {
        let frame = self.dense_rows(bars);
        if frame.len() < self.min_rows {
            return Err(AnalysisError::InsufficientData(format!(
                "{} dense feature rows from {} bars, need {}",
                frame.len(),
                bars.len(),
                self.min_rows
            )));
        }
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    /// Uptrend with a dip every third bar so each RSI window has gains and losses.
    fn sawtooth_bars(n: usize) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64 * 0.5 + if i % 3 == 0 { 1.0 } else { 0.0 };
                Bar {
                    date: start + Duration::days(i as i64),
                    open: close - 0.25,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000.0 + (i % 4) as f64 * 100.0,
                }
            })
            .collect()
    }

    #[test]
    fn test_dense_rows_for_25_bars() {
        let bars = sawtooth_bars(25);
        let frame = FeatureBuilder::new().dense_rows(&bars);

        // The 20-bar window is the longest in use: 25 - 20 + 1 rows survive.
        assert_eq!(frame.len(), 6);
        assert_eq!(frame.rows()[0].index, 19);
        assert_eq!(frame.last().unwrap().index, 24);
        assert_eq!(frame.last().unwrap().date, bars[24].date);
    }

    #[test]
    fn test_short_series_has_no_rows() {
        let bars = sawtooth_bars(19);
        assert!(FeatureBuilder::new().dense_rows(&bars).is_empty());
        assert!(FeatureBuilder::new().dense_rows(&[]).is_empty());
    }

    #[test]
    fn test_build_requires_minimum_rows() {
        let builder = FeatureBuilder::new();

        let err = builder.build(&sawtooth_bars(48)).unwrap_err();
        assert!(err.is_insufficient_data());

        let frame = builder.build(&sawtooth_bars(49)).unwrap();
        assert_eq!(frame.len(), 30);
    }

    #[test]
    fn test_row_values_match_formulas() {
        let bars = sawtooth_bars(25);
        let frame = FeatureBuilder::new().dense_rows(&bars);
        let row = frame.last().unwrap();

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let ma_5 = closes[20..25].iter().sum::<f64>() / 5.0;
        let ma_20 = closes[5..25].iter().sum::<f64>() / 20.0;
        let var_20 = closes[5..25].iter().map(|c| (c - ma_20).powi(2)).sum::<f64>() / 19.0;

        assert!((row.ma_5 - ma_5).abs() < 1e-9);
        assert!((row.ma_20 - ma_20).abs() < 1e-9);
        assert!((row.bb_width - 4.0 * var_20.sqrt()).abs() < 1e-9);
        assert!((row.bb_upper - (ma_20 + 2.0 * var_20.sqrt())).abs() < 1e-9);
        assert!((row.high_low_ratio - bars[24].high / bars[24].low).abs() < 1e-12);
        assert!((row.close_open_ratio - bars[24].close / bars[24].open).abs() < 1e-12);

        let vol_mean = bars[15..25].iter().map(|b| b.volume).sum::<f64>() / 10.0;
        assert!((row.volume_ratio - bars[24].volume / vol_mean).abs() < 1e-12);
        assert!(row.rsi > 0.0 && row.rsi < 100.0);
    }

    #[test]
    fn test_zero_low_drops_row() {
        let mut bars = sawtooth_bars(25);
        bars[24].low = 0.0;
        let frame = FeatureBuilder::new().dense_rows(&bars);
        assert_eq!(frame.len(), 5);
        assert_eq!(frame.last().unwrap().index, 23);
    }

    #[test]
    fn test_flat_series_is_insufficient() {
        let mut bars = sawtooth_bars(60);
        for bar in &mut bars {
            bar.close = 50.0;
            bar.open = 50.0;
        }
        let frame = FeatureBuilder::new().dense_rows(&bars);
        assert!(frame.is_empty());
        assert!(FeatureBuilder::new().build(&bars).is_err());
    }

    #[test]
    fn test_matrix_column_order() {
        let frame = FeatureBuilder::new().dense_rows(&sawtooth_bars(25));
        let row = &frame.rows()[0];
        let inputs = frame.matrix()[0];
        assert_eq!(inputs[FEATURE_NAMES.iter().position(|n| *n == "rsi").unwrap()], row.rsi);
        assert_eq!(inputs[4], row.bb_width);
        assert_eq!(inputs[7], row.close_open_ratio);
    }
}
