//! Error types for the snn-ml crate.

use thiserror::Error;

/// Top-level error type for tuning, training and evaluation.
#[derive(Debug, Error)]
pub enum MlError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Shape mismatch: {what} has {got} rows, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Empty parameter grid: {0}")]
    EmptyGrid(String),

    #[error("Cross-validation error: {0}")]
    CrossValidation(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Estimator is not fitted: {0}")]
    NotFitted(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl MlError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn cross_validation(msg: impl Into<String>) -> Self {
        Self::CrossValidation(msg.into())
    }

    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn not_fitted(msg: impl Into<String>) -> Self {
        Self::NotFitted(msg.into())
    }
}

impl From<figment::Error> for MlError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MlError::ShapeMismatch {
            what: "labels",
            got: 3,
            expected: 4,
        };
        assert_eq!(err.to_string(), "Shape mismatch: labels has 3 rows, expected 4");

        let err = MlError::invalid_parameter("epochs must be an integer");
        assert!(err.to_string().contains("epochs must be an integer"));

        let err = MlError::not_fitted("refit disabled");
        assert!(err.to_string().starts_with("Estimator is not fitted"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::other("disk full");
        let err: MlError = io.into();
        assert!(matches!(err, MlError::Io(_)));
    }
}
