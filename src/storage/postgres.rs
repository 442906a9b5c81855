//! PostgreSQL record table via tokio-postgres

use crate::config::DatabaseConfig;
use crate::error::StorageError;
use crate::storage::table::{quote_ident, Column, Table};
use crate::storage::RecordTable;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, GenericClient, NoTls};
use tracing::{debug, error, info};

/// Lazily connected shared client; a dropped connection is re-established on
/// the next call. The lock guards only the handle, never a query or a
/// connection attempt.
pub struct PostgresRecordTable {
    connection_string: String,
    client: Mutex<Option<Arc<Client>>>,
}

impl PostgresRecordTable {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            connection_string: config.connection_string(),
            client: Mutex::new(None),
        }
    }

    async fn connect(&self) -> Result<Client, StorageError> {
        let (client, connection) = tokio_postgres::connect(&self.connection_string, NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "Postgres connection closed with error");
            }
        });
        Ok(client)
    }

    fn live(slot: &Option<Arc<Client>>) -> Option<Arc<Client>> {
        slot.as_ref().filter(|c| !c.is_closed()).cloned()
    }

    /// Shared client, connecting first if there is none or it has closed
    async fn shared(&self) -> Result<Arc<Client>, StorageError> {
        if let Some(client) = Self::live(&*self.client.lock().await) {
            return Ok(client);
        }

        let fresh = Arc::new(self.connect().await?);
        let mut slot = self.client.lock().await;
        // another call may have reconnected meanwhile
        if let Some(client) = Self::live(&slot) {
            return Ok(client);
        }
        info!("Connected to Postgres");
        *slot = Some(fresh.clone());
        Ok(fresh)
    }
}

fn create_sql(name: &str, columns: &[Column], if_not_exists: bool) -> String {
    let definitions: Vec<String> = columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.ty.sql()))
        .collect();
    format!(
        "CREATE TABLE {}{} ({})",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        quote_ident(name),
        definitions.join(", ")
    )
}

fn insert_sql(name: &str, columns: &[Column]) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(&c.name)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(name),
        names.join(", "),
        placeholders.join(", ")
    )
}

async fn insert_rows<C: GenericClient>(
    client: &C,
    name: &str,
    data: &Table,
) -> Result<(), StorageError> {
    if data.columns.is_empty() {
        return Ok(());
    }
    let statement = client.prepare(&insert_sql(name, &data.columns)).await?;
    for row in &data.rows {
        let params: Vec<&(dyn ToSql + Sync)> =
            row.iter().map(|cell| cell as &(dyn ToSql + Sync)).collect();
        client.execute(&statement, &params).await?;
    }
    Ok(())
}

#[async_trait]
impl RecordTable for PostgresRecordTable {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.shared().await?.simple_query("SELECT 1").await?;
        Ok(())
    }

    async fn replace(&self, name: &str, data: &Table) -> Result<(), StorageError> {
        // dedicated connection: the transaction must not serialize other calls
        let mut client = self.connect().await?;

        let tx = client.transaction().await?;
        tx.batch_execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))
            .await?;
        tx.batch_execute(&create_sql(name, &data.columns, false))
            .await?;
        insert_rows(&tx, name, data).await?;
        tx.commit().await?;

        debug!(table = %name, rows = data.row_count(), "Table replaced");
        Ok(())
    }

    async fn append(&self, name: &str, data: &Table) -> Result<(), StorageError> {
        let client = self.shared().await?;

        client
            .batch_execute(&create_sql(name, &data.columns, true))
            .await?;
        insert_rows(&*client, name, data).await?;

        debug!(table = %name, rows = data.row_count(), "Rows appended");
        Ok(())
    }
}
