//! Configuration management for the ingestion service

use crate::data_preparer::ScalingMode;
use crate::models::voting::Voting;
use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File};
use serde::Deserialize;
use std::env;
use std::path::Path;

/// Environment variable pointing at an alternative configuration file
pub const CONFIG_PATH_VAR: &str = "APP_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variables and the configuration keys they override
const ENV_OVERRIDES: [(&str, &str); 14] = [
    ("SERVER_ADDR", "server.addr"),
    ("S3_ENDPOINT_URL", "storage.endpoint_url"),
    ("AWS_ACCESS_KEY_ID", "storage.access_key"),
    ("AWS_SECRET_ACCESS_KEY", "storage.secret_key"),
    ("AWS_REGION", "storage.region"),
    ("S3_BUCKET", "storage.bucket"),
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("DB_NAME", "database.name"),
    ("LOG_LEVEL", "logging.level"),
    ("LOG_FORMAT", "logging.format"),
    ("MODEL_PATH", "model.onnx_path"),
];

/// Object storage backend
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// S3-compatible service (MinIO, AWS)
    #[default]
    S3,
    /// Process-local store, for development and tests
    Memory,
}

/// Relational table backend
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    Postgres,
    /// Process-local table, for development and tests
    Memory,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub addr: String,
    /// Seconds between metrics summaries in the log (0 disables)
    #[serde(default)]
    pub metrics_interval_secs: u64,
}

/// Object storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Endpoint of the S3-compatible service
    pub endpoint_url: Option<String>,
    pub region: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Bucket receiving raw uploads and telemetry records
    pub bucket: String,
}

/// Relational database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: DatabaseBackend,
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub name: String,
    /// Table holding every ingested record
    pub table: String,
}

impl DatabaseConfig {
    /// Connection string in the key/value form accepted by tokio-postgres
    pub fn connection_string(&self) -> String {
        let mut conn = format!(
            "host={} port={} user={} dbname={}",
            self.host, self.port, self.user, self.name
        );
        if !self.password.is_empty() {
            conn.push_str(&format!(" password='{}'", self.password.replace('\'', "\\'")));
        }
        conn
    }
}

/// Classifier configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Vote combination rule for the bootstrap ensemble
    #[serde(default)]
    pub voting: Voting,
    /// Rescaling applied to incoming records
    #[serde(default)]
    pub scaling: ScalingMode,
    /// Neighbours consulted by the k-NN member
    pub n_neighbors: usize,
    /// Depth limit of the tree and forest members
    pub max_depth: usize,
    /// Trees in the forest member
    pub n_estimators: usize,
    /// Seed for synthetic data and model randomness
    pub random_state: u64,
    /// Externally trained classifier exported to ONNX
    pub onnx_path: Option<String>,
    /// JSON scaler parameters matching the external classifier
    pub scaler_path: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default file (if present) and environment
    pub fn load() -> Result<Self> {
        let path = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path, then apply environment overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut builder = Self::defaults()?
            .add_source(File::from(path.as_ref()).required(false));

        for (var, key) in ENV_OVERRIDES {
            builder = builder
                .set_override_option(key, env::var(var).ok().filter(|v| !v.is_empty()))
                .with_context(|| format!("Invalid override for {}", key))?;
        }

        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let builder = Config::builder()
            .set_default("server.addr", "0.0.0.0:8000")?
            .set_default("server.metrics_interval_secs", 0_i64)?
            .set_default("storage.backend", "s3")?
            .set_default("storage.region", "us-east-1")?
            .set_default("storage.bucket", "dados-analise")?
            .set_default("database.backend", "postgres")?
            .set_default("database.host", "localhost")?
            .set_default("database.port", 5432_i64)?
            .set_default("database.user", "postgres")?
            .set_default("database.password", "")?
            .set_default("database.name", "postgres")?
            .set_default("database.table", "dados_analise")?
            .set_default("model.voting", "hard")?
            .set_default("model.scaling", "fitted")?
            .set_default("model.n_neighbors", 3_i64)?
            .set_default("model.max_depth", 3_i64)?
            .set_default("model.n_estimators", 100_i64)?
            .set_default("model.random_state", 42_i64)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?;
        Ok(builder)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                addr: "0.0.0.0:8000".to_string(),
                metrics_interval_secs: 0,
            },
            storage: StorageConfig {
                backend: StorageBackend::S3,
                endpoint_url: None,
                region: "us-east-1".to_string(),
                access_key: None,
                secret_key: None,
                bucket: "dados-analise".to_string(),
            },
            database: DatabaseConfig {
                backend: DatabaseBackend::Postgres,
                host: "localhost".to_string(),
                port: 5432,
                user: "postgres".to_string(),
                password: String::new(),
                name: "postgres".to_string(),
                table: "dados_analise".to_string(),
            },
            model: ModelConfig {
                voting: Voting::Hard,
                scaling: ScalingMode::Fitted,
                n_neighbors: 3,
                max_depth: 3,
                n_estimators: 100,
                random_state: 42,
                onnx_path: None,
                scaler_path: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.storage.bucket, "dados-analise");
        assert_eq!(config.database.table, "dados_analise");
        assert_eq!(config.model.n_neighbors, 3);
        assert_eq!(config.model.voting, Voting::Hard);
        assert_eq!(config.model.scaling, ScalingMode::Fitted);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("hf-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[storage]\nbackend = \"memory\"\n\n[model]\nvoting = \"soft\"\nscaling = \"per_record\"\nn_estimators = 10"
        )
        .unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.model.voting, Voting::Soft);
        assert_eq!(config.model.scaling, ScalingMode::PerRecord);
        assert_eq!(config.model.n_estimators, 10);
        assert_eq!(config.model.max_depth, 3);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_path("does/not/exist.toml").unwrap();
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_connection_string() {
        let mut db = AppConfig::default().database;
        db.password = "s3cret".to_string();
        assert_eq!(
            db.connection_string(),
            "host=localhost port=5432 user=postgres dbname=postgres password='s3cret'"
        );
    }
}
