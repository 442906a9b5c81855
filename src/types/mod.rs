//! Type definitions for the ingestion service

pub mod prediction;
pub mod record;

pub use prediction::{BatchEntry, FailedPrediction, PredictionResult, RiskCategory};
pub use record::{HeartData, RawRecord, FEATURE_COUNT, FEATURE_NAMES, LABEL_FIELD};
