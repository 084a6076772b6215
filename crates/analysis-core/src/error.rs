use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

impl AnalysisError {
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, AnalysisError::InsufficientData(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_and_classification() {
        let short = AnalysisError::InsufficientData("need 30 rows".to_string());
        assert!(short.is_insufficient_data());
        assert_eq!(short.to_string(), "Insufficient data: need 30 rows");

        let bad = AnalysisError::InvalidData("negative price".to_string());
        assert!(!bad.is_insufficient_data());
        assert_eq!(bad.to_string(), "Invalid data: negative price");
        assert_eq!(
            AnalysisError::CalculationError("join failed".to_string()).to_string(),
            "Calculation error: join failed"
        );
    }
}
