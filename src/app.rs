//! Startup sequence: storage provisioning, connectivity checks, model load.

use crate::config::AppConfig;
use crate::http::AppState;
use crate::metrics::ServiceMetrics;
use crate::models::loader::ModelLoader;
use crate::predictor::HeartFailurePredictor;
use crate::storage;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Build the shared handler state.
///
/// Only an unusable storage configuration is fatal. An unreachable bucket or
/// database and a failed model load are logged and the service starts
/// degraded.
pub async fn build_state(config: &AppConfig) -> Result<AppState> {
    let objects =
        storage::object_store(&config.storage).context("Failed to configure object store")?;
    match objects.ensure_bucket().await {
        Ok(()) => info!(
            backend = objects.backend(),
            bucket = %objects.bucket(),
            "Object store ready"
        ),
        Err(e) => warn!(
            bucket = %objects.bucket(),
            error = %e,
            "Object store unavailable, continuing"
        ),
    }

    let records = storage::record_table(&config.database);
    match records.ping().await {
        Ok(()) => info!(
            backend = records.backend(),
            table = %config.database.table,
            "Database ready"
        ),
        Err(e) => warn!(error = %e, "Database unavailable, continuing"),
    }

    let started = Instant::now();
    let predictor = match ModelLoader::new(&config.model).load() {
        Ok(model) => {
            info!(
                model = %model.name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Model ready"
            );
            HeartFailurePredictor::new(model)
        }
        Err(e) => {
            error!(error = %e, "Model load failed, predictions will be UNKNOWN");
            HeartFailurePredictor::unloaded()
        }
    };

    Ok(AppState {
        predictor: Arc::new(predictor),
        objects,
        records,
        table: Arc::from(config.database.table.as_str()),
        metrics: Arc::new(ServiceMetrics::new()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseBackend, StorageBackend};

    fn memory_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config.database.backend = DatabaseBackend::Memory;
        config.model.n_estimators = 10;
        config
    }

    #[tokio::test]
    async fn test_build_state_with_memory_backends() {
        let state = build_state(&memory_config()).await.unwrap();
        assert!(state.predictor.is_loaded());
        assert_eq!(state.objects.backend(), "memory");
        assert_eq!(&*state.table, "dados_analise");
    }

    #[tokio::test]
    async fn test_failed_model_load_is_not_fatal() {
        let mut config = memory_config();
        config.model.onnx_path = Some("missing/model.onnx".into());

        let state = build_state(&config).await.unwrap();
        assert!(!state.predictor.is_loaded());
    }

    #[tokio::test]
    async fn test_unreachable_database_is_not_fatal() {
        let mut config = memory_config();
        config.database.backend = DatabaseBackend::Postgres;
        config.database.host = "127.0.0.1".into();
        config.database.port = 1;

        let state = build_state(&config).await.unwrap();
        assert_eq!(state.records.backend(), "postgres");
    }
}
