use analysis_core::stats::{mean, population_std_dev};
use analysis_core::AnalysisError;

/// Per-column standardisation to zero mean and unit variance.
///
/// Columns with zero variance keep a scale of 1 so they pass through centred.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, AnalysisError> {
        let width = match rows.first() {
            Some(first) => first.len(),
            None => {
                return Err(AnalysisError::InsufficientData(
                    "cannot fit scaler on zero rows".to_string(),
                ))
            }
        };
        if rows.iter().any(|r| r.len() != width) {
            return Err(AnalysisError::InvalidData(
                "rows have differing feature counts".to_string(),
            ));
        }

        let mut means = Vec::with_capacity(width);
        let mut scales = Vec::with_capacity(width);
        for col in 0..width {
            let column: Vec<f64> = rows.iter().map(|r| r[col]).collect();
            let std = population_std_dev(&column);
            means.push(mean(&column));
            scales.push(if std > 0.0 { std } else { 1.0 });
        }

        Ok(Self { means, scales })
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(self.scales.iter()))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_standardised() {
        let rows = vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();
        let scaled = scaler.transform(&rows);

        for col in 0..2 {
            let column: Vec<f64> = scaled.iter().map(|r| r[col]).collect();
            assert!(mean(&column).abs() < 1e-12);
            assert!((population_std_dev(&column) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_column_is_centred() {
        let rows = vec![vec![5.0, 1.0], vec![5.0, 2.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();
        assert_eq!(scaler.transform_row(&[5.0, 1.5]), vec![0.0, 0.0]);
        assert_eq!(scaler.transform_row(&[7.0, 1.5])[0], 2.0);
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        assert!(StandardScaler::fit(&[]).unwrap_err().is_insufficient_data());
        assert!(matches!(
            StandardScaler::fit(&[vec![1.0], vec![1.0, 2.0]]),
            Err(AnalysisError::InvalidData(_))
        ));
    }
}
