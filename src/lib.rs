//! Heart Failure Ingestion Service Library
//!
//! Ingests historical heart-failure data from CSV uploads and scores live
//! telemetry records with an in-process classifier ensemble, persisting both
//! to object storage and a relational table.

pub mod app;
pub mod config;
pub mod data_preparer;
pub mod error;
pub mod http;
pub mod metrics;
pub mod models;
pub mod predictor;
pub mod storage;
pub mod types;

pub use config::AppConfig;
pub use data_preparer::DataPreparer;
pub use error::{ModelError, PredictError, StorageError};
pub use predictor::HeartFailurePredictor;
pub use types::{HeartData, PredictionResult};
