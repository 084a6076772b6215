#[cfg(test)]
mod tests {
    use super::super::indicators::*;

    // Helper function to create sample price data
    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    fn defined(values: &[Option<f64>]) -> Vec<f64> {
        values.iter().flatten().copied().collect()
    }

    #[test]
    fn test_sma_basic() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 2.0).abs() < 0.001); // (1+2+3)/3 = 2
        assert!((result[1] - 3.0).abs() < 0.001); // (2+3+4)/3 = 3
        assert!((result[2] - 4.0).abs() < 0.001); // (3+4+5)/3 = 4
    }

    #[test]
    fn test_sma_insufficient_data() {
        let data = vec![1.0, 2.0];
        let result = sma(&data, 5);

        assert_eq!(result.len(), 0);
    }

    #[test]
    fn test_rolling_mean_alignment() {
        let prices = sample_prices();
        let result = rolling_mean(&prices, 5);

        assert_eq!(result.len(), prices.len());
        assert!(result[..4].iter().all(Option::is_none));
        let expected_first = (44.34 + 44.09 + 44.15 + 43.61 + 44.33) / 5.0;
        assert!((result[4].unwrap() - expected_first).abs() < 1e-9);
    }

    #[test]
    fn test_defined_count_is_len_minus_window_plus_one() {
        let prices = sample_prices();
        for window in [1, 5, 10, 20, 25] {
            let expected = (prices.len() + 1).saturating_sub(window);
            assert_eq!(defined(&rolling_mean(&prices, window)).len(), expected);
        }
        assert_eq!(defined(&rolling_std(&prices, 20)).len(), 1);
        assert_eq!(defined(&rolling_std(&prices, 21)).len(), 0);
    }

    #[test]
    fn test_rolling_std_is_sample_std() {
        let data = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let result = rolling_std(&data, 8);
        // Population std is 2.0; sample std is sqrt(32 / 7)
        assert!((result[7].unwrap() - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_rsi_basic() {
        let prices = sample_prices();
        let result = rsi(&prices, 14);

        assert_eq!(result.len(), prices.len());
        assert!(result[..14].iter().all(Option::is_none));
        let values = defined(&result);
        assert_eq!(values.len(), 6);
        // RSI should be between 0 and 100
        for &value in &values {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let data = vec![1.0, 2.0, 3.0];
        let result = rsi(&data, 14);

        assert!(defined(&result).is_empty());
    }

    #[test]
    fn test_rsi_saturates_without_losses() {
        let uptrend: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let result = rsi(&uptrend, 14);

        assert_eq!(defined(&result), vec![100.0; 6]);
    }

    #[test]
    fn test_rsi_zero_without_gains() {
        let downtrend: Vec<f64> = (0..16).map(|i| 100.0 - i as f64).collect();
        let result = rsi(&downtrend, 14);

        assert_eq!(defined(&result), vec![0.0; 2]);
    }

    #[test]
    fn test_rsi_flat_window_undefined() {
        let flat = vec![50.0; 30];
        assert!(defined(&rsi(&flat, 14)).is_empty());
    }

    #[test]
    fn test_rsi_known_value() {
        // 14 deltas: seven +1 and seven -1 give RS = 1
        let mut prices = vec![10.0];
        for i in 0..14 {
            let last = *prices.last().unwrap();
            prices.push(if i % 2 == 0 { last + 1.0 } else { last - 1.0 });
        }
        let result = rsi(&prices, 14);
        assert!((result[14].unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_bollinger_bands_ordering() {
        let prices = sample_prices();
        let result = bollinger_bands(&prices, 10, 2.0);

        assert_eq!(result.upper.len(), prices.len());
        for i in 9..prices.len() {
            let (up, mid, lo) = (
                result.upper[i].unwrap(),
                result.middle[i].unwrap(),
                result.lower[i].unwrap(),
            );
            assert!(up > mid && mid > lo);
            assert!((result.width[i].unwrap() - (up - lo)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_bollinger_bands_width() {
        let prices = vec![100.0; 20]; // Constant prices
        let result = bollinger_bands(&prices, 10, 2.0);

        for width in defined(&result.width) {
            assert_eq!(width, 0.0);
        }
    }

    #[test]
    fn test_volume_ratio() {
        let volumes = vec![100.0, 100.0, 100.0, 400.0];
        let result = volume_ratio(&volumes, 4);
        assert!(result[2].is_none());
        assert!((result[3].unwrap() - 400.0 / 175.0).abs() < 1e-12);

        let zeros = vec![0.0; 5];
        assert!(defined(&volume_ratio(&zeros, 3)).is_empty());
    }

    #[test]
    fn test_finite_ratio() {
        assert_eq!(finite_ratio(6.0, 3.0), Some(2.0));
        assert_eq!(finite_ratio(1.0, 0.0), None);
        assert_eq!(finite_ratio(0.0, 0.0), None);
    }
}
