//! Error taxonomy for prediction and persistence

use thiserror::Error;

/// Errors raised while fitting or querying a classifier
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("training set has {features} feature rows but {labels} labels")]
    LabelMismatch { features: usize, labels: usize },

    #[error("label {0} is outside the binary outcome range")]
    InvalidLabel(u8),

    #[error("expected {expected} features, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("predict_proba is not available for {0}")]
    ProbabilityUnavailable(String),

    #[error("model runtime error: {0}")]
    Runtime(String),
}

/// Errors surfaced by the predictor facade
#[derive(Debug, Error)]
pub enum PredictError {
    /// The record could not be turned into a feature vector
    #[error("invalid value for field '{field}': {reason}")]
    Data { field: String, reason: String },

    /// The model failed while producing a label
    #[error("inference failed: {0}")]
    Inference(#[from] ModelError),
}

impl PredictError {
    pub fn data(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PredictError::Data {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by the object store, the record table or CSV decoding
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object store error: {0}")]
    ObjectStore(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("csv error: {0}")]
    Csv(String),
}

impl From<s3::error::S3Error> for StorageError {
    fn from(e: s3::error::S3Error) -> Self {
        StorageError::ObjectStore(e.to_string())
    }
}

impl From<tokio_postgres::Error> for StorageError {
    fn from(e: tokio_postgres::Error) -> Self {
        StorageError::Database(e.to_string())
    }
}

impl From<csv::Error> for StorageError {
    fn from(e: csv::Error) -> Self {
        StorageError::Csv(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_error_message_names_field() {
        let err = PredictError::data("age", "not a number: \"abc\"");
        assert_eq!(
            err.to_string(),
            "invalid value for field 'age': not a number: \"abc\""
        );
    }

    #[test]
    fn test_model_error_converts_to_inference() {
        let err: PredictError = ModelError::FeatureMismatch {
            expected: 12,
            actual: 3,
        }
        .into();
        assert!(matches!(err, PredictError::Inference(_)));
        assert!(err.to_string().contains("expected 12 features"));
    }
}
