//! API error types and Axum response conversion.

use crate::error::{PredictError, StorageError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

/// Request failures with their HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Record fields could not be interpreted
    Data(String),
    /// No model is loaded
    ModelUnavailable,
    /// The model failed on a well-formed record
    Inference(String),
    /// Malformed upload or request body
    BadRequest(String),
    /// Object store or database rejected a write
    Storage(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Data(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::ModelUnavailable => "model not loaded".to_string(),
            ApiError::Data(m)
            | ApiError::Inference(m)
            | ApiError::BadRequest(m)
            | ApiError::Storage(m) => m.clone(),
        }
    }

    fn body(&self) -> Value {
        json!({"status": "error", "message": self.message()})
    }
}

impl From<PredictError> for ApiError {
    fn from(e: PredictError) -> Self {
        match e {
            PredictError::Data { .. } => ApiError::Data(e.to_string()),
            PredictError::Inference(_) => ApiError::Inference(e.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Csv(_) => ApiError::BadRequest(e.to_string()),
            StorageError::ObjectStore(_) | StorageError::Database(_) => {
                ApiError::Storage(e.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// Error on the telemetry path; the body also carries a null label.
#[derive(Debug)]
pub struct RecordError(pub ApiError);

impl From<ApiError> for RecordError {
    fn from(e: ApiError) -> Self {
        RecordError(e)
    }
}

impl From<PredictError> for RecordError {
    fn from(e: PredictError) -> Self {
        RecordError(e.into())
    }
}

impl IntoResponse for RecordError {
    fn into_response(self) -> Response {
        let mut body = self.0.body();
        body["DEATH_EVENT"] = Value::Null;
        (self.0.status(), Json(body)).into_response()
    }
}
