//! Request handlers

use crate::http::error::{ApiError, RecordError};
use crate::http::AppState;
use crate::metrics::MetricsSnapshot;
use crate::predictor::ModelInfo;
use crate::storage::{parse_csv, Table};
use crate::types::prediction::BatchEntry;
use crate::types::record::{HeartData, RawRecord};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info};

const CSV_FIELD: &str = "file";

/// Liveness probe
pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

#[derive(Debug, Serialize)]
pub struct CsvUploadResponse {
    pub status: &'static str,
    pub storage_key: String,
    pub row_count: usize,
    pub column_names: Vec<String>,
}

/// Store an uploaded CSV verbatim and replace the record table with it
pub async fn upload_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CsvUploadResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(CSV_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .and_then(|name| Path::new(name).file_name())
            .and_then(|name| name.to_str())
            .unwrap_or("upload.csv")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        upload = Some((filename, bytes));
        break;
    }

    let (key, bytes) = upload
        .ok_or_else(|| ApiError::BadRequest(format!("missing multipart field '{}'", CSV_FIELD)))?;

    if let Err(e) = state.objects.put(&key, &bytes, "text/csv").await {
        error!(key = %key, error = %e, "CSV upload to object store failed");
        state.metrics.record_object_store_failure();
        return Err(e.into());
    }

    let table = parse_csv(&bytes)?;

    if let Err(e) = state.records.replace(&state.table, &table).await {
        error!(table = %state.table, error = %e, "Table replace failed");
        state.metrics.record_database_failure();
        return Err(e.into());
    }

    state.metrics.record_csv_upload(table.row_count());
    info!(
        key = %key,
        rows = table.row_count(),
        table = %state.table,
        "CSV ingested"
    );

    Ok(Json(CsvUploadResponse {
        status: "ok",
        storage_key: key,
        row_count: table.row_count(),
        column_names: table.column_names(),
    }))
}

/// Score a telemetry record, persist it with the predicted label and echo it
pub async fn ingest_telemetry(
    State(state): State<AppState>,
    payload: Result<Json<HeartData>, JsonRejection>,
) -> Result<Json<RawRecord>, RecordError> {
    let Json(data) = payload.map_err(|e| ApiError::Data(e.body_text()))?;

    if !state.predictor.is_loaded() {
        error!("Telemetry rejected: model not loaded");
        return Err(ApiError::ModelUnavailable.into());
    }

    let started = Instant::now();
    let result = state.predictor.predict(&data.features()).map_err(|e| {
        state.metrics.record_prediction_failure();
        RecordError::from(e)
    })?;
    state.metrics.record_prediction(started.elapsed(), &result);

    let record = data
        .with_label(Some(i64::from(result.death_event)))
        .to_record();

    let key = format!("record_{}.json", Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f"));
    persist_record(&state, &key, &record).await;
    state.metrics.record_telemetry();

    info!(
        key = %key,
        label = result.death_event,
        risk = ?result.risk,
        "Telemetry record ingested"
    );

    Ok(Json(record))
}

/// Write the object and the table row; failures are logged and counted only
async fn persist_record(state: &AppState, key: &str, record: &RawRecord) {
    match serde_json::to_vec(record) {
        Ok(body) => {
            if let Err(e) = state.objects.put(key, &body, "application/json").await {
                error!(key = %key, error = %e, "Failed to store telemetry record");
                state.metrics.record_object_store_failure();
            }
        }
        Err(e) => {
            error!(key = %key, error = %e, "Failed to encode telemetry record");
            state.metrics.record_object_store_failure();
        }
    }

    if let Err(e) = state
        .records
        .append(&state.table, &Table::from_record(record))
        .await
    {
        error!(table = %state.table, error = %e, "Failed to append telemetry record");
        state.metrics.record_database_failure();
    }
}

/// Score several records; failing records become error entries
pub async fn predict_batch(
    State(state): State<AppState>,
    payload: Result<Json<Vec<RawRecord>>, JsonRejection>,
) -> Result<Json<Vec<BatchEntry>>, ApiError> {
    let Json(records) = payload.map_err(|e| ApiError::Data(e.body_text()))?;

    let started = Instant::now();
    let entries = state.predictor.predict_batch(&records);
    let per_record = started.elapsed() / entries.len().max(1) as u32;

    for entry in &entries {
        match entry {
            BatchEntry::Scored(result) => state.metrics.record_prediction(per_record, result),
            BatchEntry::Failed(_) => state.metrics.record_prediction_failure(),
        }
    }

    Ok(Json(entries))
}

pub async fn feature_importance(State(state): State<AppState>) -> Json<BTreeMap<String, f64>> {
    Json(state.predictor.feature_importance())
}

pub async fn model_info(State(state): State<AppState>) -> Json<ModelInfo> {
    Json(state.predictor.info())
}

pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
