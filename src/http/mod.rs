//! HTTP surface: ingestion endpoints, prediction helpers and probes

pub mod error;
pub mod handlers;


use crate::metrics::ServiceMetrics;
use crate::predictor::HeartFailurePredictor;
use crate::storage::{ObjectStore, RecordTable};
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{Request, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::{ApiError, RecordError};

/// Largest accepted request body (CSV uploads)
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Shared, read-only handler state
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<HeartFailurePredictor>,
    pub objects: Arc<dyn ObjectStore>,
    pub records: Arc<dyn RecordTable>,
    /// Record table name
    pub table: Arc<str>,
    pub metrics: Arc<ServiceMetrics>,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(
                latency_ms = latency.as_millis() as u64,
                status = res.status().as_u16(),
                "finished processing request"
            );
        });

    Router::new()
        .route("/", get(handlers::health))
        .route("/health", get(handlers::health))
        .route("/ingest/csv", post(handlers::upload_csv))
        .route("/enviarDados", post(handlers::upload_csv))
        .route("/ingest/telemetry", post(handlers::ingest_telemetry))
        .route("/enviarDadosThingsBoard", post(handlers::ingest_telemetry))
        .route("/predict/batch", post(handlers::predict_batch))
        .route("/model", get(handlers::model_info))
        .route("/model/feature-importance", get(handlers::feature_importance))
        .route("/metrics", get(handlers::metrics))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
